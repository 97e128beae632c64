use nalgebra::Vector3;

use crate::io::{
    read_crysym_binary, read_crysym_yaml, write_crysym_binary, write_crysym_yaml, CrysymFileType,
};
use crate::symmetry::precision_control::Trial;

#[test]
fn test_io_binary_and_yaml() {
    let dir = std::env::temp_dir();
    let name = dir.join(format!("crysym_io_test_{}", std::process::id()));
    let trials = vec![
        Trial {
            epsilon: 1e-6,
            nrotk: 16,
        },
        Trial {
            epsilon: 2e-6,
            nrotk: 48,
        },
    ];

    write_crysym_binary(&name, CrysymFileType::Sym, &trials).unwrap();
    let read: Vec<Trial> = read_crysym_binary(&name, CrysymFileType::Sym).unwrap();
    assert_eq!(read, trials);

    let vectors = vec![Vector3::new(0.5, 0.25, 0.0)];
    write_crysym_yaml(&name, &vectors).unwrap();
    let read: Vec<Vector3<f64>> = read_crysym_yaml(name.with_extension("yml")).unwrap();
    assert_eq!(read, vectors);

    assert!(read_crysym_binary::<Vec<Trial>, _>(dir.join("missing"), CrysymFileType::Sym).is_err());

    let _ = std::fs::remove_file(name.with_extension(CrysymFileType::Sym.ext()));
    let _ = std::fs::remove_file(name.with_extension("yml"));
}

#[test]
fn test_io_errors_name_the_file() {
    let name = std::env::temp_dir().join(format!("crysym_io_corrupt_{}", std::process::id()));
    let path = name.with_extension(CrysymFileType::Sym.ext());
    std::fs::write(&path, [0xffu8; 3]).unwrap();

    let err = read_crysym_binary::<Vec<Trial>, _>(&name, CrysymFileType::Sym).unwrap_err();
    assert!(format!("{err}").contains("crysym.sym"));

    std::fs::write(&path, "- [0.5, 0.25").unwrap();
    let err = read_crysym_yaml::<Vec<Vector3<f64>>, _>(&path).unwrap_err();
    assert!(format!("{err}").contains(&*path.to_string_lossy()));

    let _ = std::fs::remove_file(&path);
}
