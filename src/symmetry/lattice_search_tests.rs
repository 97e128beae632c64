use std::collections::HashSet;

use approx::assert_relative_eq;
use nalgebra::{Matrix3, Vector3};

use crate::auxiliary::structure::Structure;
use crate::symmetry::bravais::{canonical_lattice_vectors, BravaisType, CellConstants};
use crate::symmetry::lattice_search::{
    get_shortest_latvec, lattice_type, lattice_type_with_atoms, UnimodularTransforms,
};
use crate::symmetry::tolerance::Tolerance;

fn assert_constants(found: &CellConstants, expected: [f64; 6]) {
    for (x, y) in found.0.iter().zip(expected.iter()) {
        assert_relative_eq!(*x, *y, epsilon = 1e-9);
    }
}

#[test]
fn test_lattice_search_unimodular_transforms() {
    let transforms = UnimodularTransforms::new().collect::<Vec<_>>();
    assert!(transforms.iter().all(|t| {
        let tf = t.map(|x| x as f64);
        (tf.determinant() - 1.0).abs() < 1e-9 && t.iter().all(|x| (-2..=2).contains(x))
    }));
    let unique = transforms
        .iter()
        .map(|t| t.iter().copied().collect::<Vec<i64>>())
        .collect::<HashSet<_>>();
    assert_eq!(unique.len(), transforms.len());

    // Exhaustive count over all 5^9 matrices.
    let brute_force_count = (0..5_usize.pow(9))
        .filter(|code| {
            let mut code = *code;
            let mut entries = [0_i64; 9];
            for entry in entries.iter_mut() {
                *entry = (code % 5) as i64 - 2;
                code /= 5;
            }
            let m = Matrix3::from_row_slice(&entries);
            let det = m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
                - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
                + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)]);
            det == 1
        })
        .count();
    assert_eq!(transforms.len(), brute_force_count);
    assert_eq!(transforms.len(), 67704);
    assert!(transforms.contains(&Matrix3::identity()));
}

#[test]
fn test_lattice_search_shortest_latvec() {
    let tol = Tolerance::new(1e-6);
    let mut vectors = [
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(3.0, 1.0, 0.0),
        Vector3::new(-2.0, 0.0, 1.0),
    ];
    get_shortest_latvec(&mut vectors, tol);
    assert_relative_eq!(vectors[0], Vector3::new(1.0, 0.0, 0.0));
    assert_relative_eq!(vectors[1], Vector3::new(0.0, 1.0, 0.0));
    assert_relative_eq!(vectors[2], Vector3::new(0.0, 0.0, 1.0));
}

#[test]
fn test_lattice_search_skewed_settings() {
    let tol = Tolerance::new(1e-6);

    let sc = [
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(1.0, 1.0, 0.0),
        Vector3::new(1.0, 1.0, 1.0),
    ];
    let res = lattice_type(&sc, tol);
    assert_eq!(res.input_bravais, BravaisType::Undetermined);
    assert_eq!(res.bravais, BravaisType::CubicP);
    assert!(res.changed);
    assert_constants(&res.constants, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    assert_relative_eq!(res.lattice().determinant(), 1.0, epsilon = 1e-9);

    let hex = [
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.5, 0.5 * 3.0_f64.sqrt(), 0.0),
        Vector3::new(0.0, 0.0, 1.6),
    ];
    let res = lattice_type(&hex, tol);
    assert_eq!(res.bravais, BravaisType::Hexagonal);
    assert_constants(&res.constants, [1.0, 0.0, 1.6, 0.0, 0.0, 0.0]);

    let fcc = [
        Vector3::new(0.0, 1.8, 1.8),
        Vector3::new(1.8, 1.8, 3.6),
        Vector3::new(1.8, 1.8, 0.0),
    ];
    let res = lattice_type(&fcc, tol);
    assert_eq!(res.bravais, BravaisType::CubicF);
    assert_constants(&res.constants, [3.6, 0.0, 0.0, 0.0, 0.0, 0.0]);

    let bcc = [
        Vector3::new(-1.55, 1.55, 1.55),
        Vector3::new(1.55, -1.55, 1.55),
        Vector3::new(3.1, 0.0, 0.0),
    ];
    let res = lattice_type(&bcc, tol);
    assert_eq!(res.bravais, BravaisType::CubicI);
    assert_constants(&res.constants, [3.1, 0.0, 0.0, 0.0, 0.0, 0.0]);

    let supercell = [
        Vector3::new(2.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
    ];
    let res = lattice_type(&supercell, tol);
    assert_eq!(res.bravais, BravaisType::TetragonalP);
    assert_constants(&res.constants, [1.0, 0.0, 2.0, 0.0, 0.0, 0.0]);

    let ortho = [
        Vector3::new(3.0, 0.0, 0.0),
        Vector3::new(0.0, 2.0, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
    ];
    let res = lattice_type(&ortho, tol);
    assert_eq!(res.bravais, BravaisType::OrthorhombicP);
    assert_constants(&res.constants, [1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);

    let left_handed = [
        Vector3::new(0.0, 0.0, 3.0),
        Vector3::new(0.0, 2.0, 0.0),
        Vector3::new(2.0, 0.0, 0.0),
    ];
    let res = lattice_type(&left_handed, tol);
    assert_eq!(res.bravais, BravaisType::TetragonalP);
    assert_constants(&res.constants, [2.0, 0.0, 1.5, 0.0, 0.0, 0.0]);
    assert!(res.lattice().determinant() > 0.0);
}

#[test]
fn test_lattice_search_canonical_kept() {
    let tol = Tolerance::new(1e-6);
    let hcp = [
        Vector3::new(2.0, 0.0, 0.0),
        Vector3::new(-1.0, 3.0_f64.sqrt(), 0.0),
        Vector3::new(0.0, 0.0, 3.3),
    ];
    let res = lattice_type(&hcp, tol);
    assert_eq!(res.bravais, BravaisType::Hexagonal);
    assert!(!res.changed);
    assert_eq!(res.vectors, hcp);
}

#[test]
fn test_lattice_search_monoclinic() {
    let tol = Tolerance::new(1e-6);
    let vectors = canonical_lattice_vectors(
        BravaisType::MonoclinicP,
        &CellConstants([2.0, 1.3, 1.7, 0.0, -0.3, 0.0]),
    )
    .unwrap();
    let res = lattice_type(&vectors, tol);
    assert_eq!(res.bravais, BravaisType::MonoclinicP);
    assert!(res.constants.0[4] < 0.0 && res.constants.0[4] >= -0.3 - 1e-9);
    let again = lattice_type(&res.vectors, tol);
    assert!(!again.changed);
    assert_eq!(again.bravais, BravaisType::MonoclinicP);
}

#[test]
fn test_lattice_search_idempotence() {
    let tol = Tolerance::new(1e-6);
    let lattices = vec![
        [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
        ],
        [
            Vector3::new(-1.55, 1.55, 1.55),
            Vector3::new(1.55, -1.55, 1.55),
            Vector3::new(3.1, 0.0, 0.0),
        ],
        canonical_lattice_vectors(
            BravaisType::Triclinic,
            &CellConstants([2.0, 1.3, 1.7, 0.2, 0.3, 0.4]),
        )
        .unwrap(),
    ];
    for vectors in lattices {
        let structure = Structure::from_fractional(
            vectors,
            vec![
                ("A", vec![Vector3::new(0.1, 0.2, 0.3)]),
                ("B", vec![Vector3::new(0.6, -0.1, 0.45)]),
            ],
        )
        .unwrap();
        let (first, first_positions) = lattice_type_with_atoms(&structure, tol).unwrap();
        let restructure = structure.with_lattice_vectors(first.vectors).unwrap();
        let (second, second_positions) = lattice_type_with_atoms(&restructure, tol).unwrap();
        assert!(!second.changed);
        assert_eq!(first.bravais, second.bravais);
        for (a, b) in first.vectors.iter().zip(second.vectors.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
        for (sp_a, sp_b) in first_positions.iter().zip(second_positions.iter()) {
            for (a, b) in sp_a.iter().zip(sp_b.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-9);
                assert!(a.iter().all(|x| (-0.5..0.5).contains(x)));
            }
        }
    }
}
