use nalgebra::{Matrix3, Vector3};

use crate::auxiliary::geometry::lattice_matrix;
use crate::symmetry::bravais::{canonical_lattice_vectors, BravaisType, CellConstants};
use crate::symmetry::point_group::{pointgroup, setgroup, RotationKind};
use crate::symmetry::tolerance::Tolerance;

fn canonical_cases() -> Vec<(BravaisType, [f64; 6], &'static str)> {
    vec![
        (BravaisType::CubicP, [2.5, 0.0, 0.0, 0.0, 0.0, 0.0], "Oh"),
        (BravaisType::CubicI, [3.1, 0.0, 0.0, 0.0, 0.0, 0.0], "Oh"),
        (BravaisType::CubicF, [3.6, 0.0, 0.0, 0.0, 0.0, 0.0], "Oh"),
        (BravaisType::Hexagonal, [2.0, 0.0, 1.6, 0.0, 0.0, 0.0], "D6h"),
        (BravaisType::TetragonalP, [2.0, 0.0, 1.5, 0.0, 0.0, 0.0], "D4h"),
        (BravaisType::TetragonalI, [2.0, 0.0, 1.5, 0.0, 0.0, 0.0], "D4h"),
        (BravaisType::Rhombohedral, [2.0, 0.0, 0.0, 0.3, 0.0, 0.0], "D3d"),
        (BravaisType::OrthorhombicP, [2.0, 1.3, 1.7, 0.0, 0.0, 0.0], "D2h"),
        (BravaisType::OrthorhombicI, [2.0, 1.3, 1.7, 0.0, 0.0, 0.0], "D2h"),
        (BravaisType::OrthorhombicF, [2.0, 1.3, 1.7, 0.0, 0.0, 0.0], "D2h"),
        (
            BravaisType::OrthorhombicC,
            [2.0, 1.4, 1.2, 0.0, 0.0, (1.0 - 1.96) / (1.0 + 1.96)],
            "D2h",
        ),
        (BravaisType::MonoclinicP, [2.0, 1.3, 1.7, 0.0, -0.3, 0.0], "C2h"),
        (BravaisType::MonoclinicA, [2.0, 1.4, 1.2, 0.0, -0.3, 0.0], "C2h"),
        (BravaisType::Triclinic, [2.0, 1.3, 1.7, 0.2, 0.3, 0.4], "Ci"),
    ]
}

#[test]
fn test_point_group_rotation_kind() {
    let c4z = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
    assert_eq!(
        RotationKind::from_rotation(&Matrix3::identity()).unwrap(),
        RotationKind::Identity
    );
    assert_eq!(
        RotationKind::from_rotation(&c4z).unwrap(),
        RotationKind::Rotation4
    );
    assert_eq!(
        RotationKind::from_rotation(&(-c4z)).unwrap(),
        RotationKind::RotoInversion4
    );
    assert_eq!(
        RotationKind::from_rotation(&(-Matrix3::identity())).unwrap(),
        RotationKind::Inversion
    );
    let mirror_z = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
    assert_eq!(
        RotationKind::from_rotation(&mirror_z).unwrap(),
        RotationKind::Mirror
    );
    // Six-fold rotation in the hexagonal basis.
    let c6 = Matrix3::new(1.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
    assert_eq!(
        RotationKind::from_rotation(&c6).unwrap(),
        RotationKind::Rotation6
    );
    assert!(RotationKind::from_rotation(&(Matrix3::identity() * 2.0)).is_err());
}

#[test]
fn test_point_group_setgroup_holohedries() {
    let tol = Tolerance::new(1e-6);
    for (bravais, constants, expected) in canonical_cases() {
        let vectors = canonical_lattice_vectors(bravais, &CellConstants(constants)).unwrap();
        let lattice = lattice_matrix(&vectors);
        let rotations = setgroup(&lattice, bravais, tol).unwrap();
        assert_eq!(Some(rotations.len()), bravais.holohedry_order(), "{bravais}");
        assert_eq!(rotations[0], Matrix3::identity());

        let metric = lattice.transpose() * lattice;
        for w in rotations.iter() {
            assert!(w.iter().all(|x| *x == x.round()));
            let diff = w.transpose() * metric * w - metric;
            assert!(diff.iter().all(|x| x.abs() < 1e-6), "{bravais}: {w}");
        }

        let group = pointgroup(&rotations).unwrap();
        assert_eq!(group.schoenflies, expected, "{bravais}");
        assert_eq!(group.order, rotations.len());
    }
}

#[test]
fn test_point_group_setgroup_loose_tolerance() {
    // Face diagonals pass as unit vectors, giving more than 48 candidate operations.
    let rotations = setgroup(&Matrix3::identity(), BravaisType::CubicP, Tolerance::new(0.45));
    assert!(rotations.is_err());

    let rotations = setgroup(&Matrix3::identity(), BravaisType::CubicP, Tolerance::new(0.3));
    assert_eq!(rotations.unwrap().len(), 48);
}

#[test]
fn test_point_group_setgroup_skewed_basis() {
    let tol = Tolerance::new(1e-6);
    let lattice = Matrix3::from_columns(&[
        Vector3::new(0.0, 1.8, 1.8),
        Vector3::new(1.8, 1.8, 3.6),
        Vector3::new(1.8, 1.8, 0.0),
    ]);
    let rotations = setgroup(&lattice, BravaisType::CubicF, tol).unwrap();
    assert_eq!(rotations.len(), 48);
    assert_eq!(pointgroup(&rotations).unwrap().schoenflies, "Oh");
}

#[test]
fn test_point_group_identification() {
    let e = Matrix3::identity();
    let c4z = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
    let c2z = c4z * c4z;

    let c4 = pointgroup(&[e, c4z, c2z, c2z * c4z]).unwrap();
    assert_eq!(c4.schoenflies, "C4");
    assert_eq!(c4.hermann_mauguin, "4");
    assert_eq!(c4.number, 9);

    let s4 = pointgroup(&[e, -c4z, c2z, -(c2z * c4z)]).unwrap();
    assert_eq!(s4.schoenflies, "S4");

    let c1 = pointgroup(&[e]).unwrap();
    assert_eq!(c1.number, 1);

    let ci = pointgroup(&[e, -e]).unwrap();
    assert_eq!(ci.hermann_mauguin, "-1");

    // An incomplete group does not match any crystallographic point group.
    assert!(pointgroup(&[e, c4z]).is_none());
    assert!(pointgroup(&[]).is_none());
}
