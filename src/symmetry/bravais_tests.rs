use approx::assert_relative_eq;
use nalgebra::Vector3;

use crate::auxiliary::geometry::triple_product;
use crate::symmetry::bravais::{canonical_lattice_vectors, standard_lat, BravaisType, CellConstants};
use crate::symmetry::tolerance::Tolerance;

fn canonical_cases() -> Vec<(BravaisType, CellConstants)> {
    vec![
        (BravaisType::CubicP, CellConstants([2.5, 0.0, 0.0, 0.0, 0.0, 0.0])),
        (BravaisType::CubicI, CellConstants([3.1, 0.0, 0.0, 0.0, 0.0, 0.0])),
        (BravaisType::CubicF, CellConstants([3.6, 0.0, 0.0, 0.0, 0.0, 0.0])),
        (BravaisType::Hexagonal, CellConstants([2.0, 0.0, 1.6, 0.0, 0.0, 0.0])),
        (BravaisType::TetragonalP, CellConstants([2.0, 0.0, 1.5, 0.0, 0.0, 0.0])),
        (BravaisType::TetragonalI, CellConstants([2.0, 0.0, 1.5, 0.0, 0.0, 0.0])),
        (BravaisType::Rhombohedral, CellConstants([2.0, 0.0, 0.0, 0.3, 0.0, 0.0])),
        (BravaisType::OrthorhombicP, CellConstants([2.0, 1.3, 1.7, 0.0, 0.0, 0.0])),
        (BravaisType::OrthorhombicI, CellConstants([2.0, 1.3, 1.7, 0.0, 0.0, 0.0])),
        (BravaisType::OrthorhombicF, CellConstants([2.0, 1.3, 1.7, 0.0, 0.0, 0.0])),
        (
            BravaisType::OrthorhombicC,
            CellConstants([2.0, 1.4, 1.2, 0.0, 0.0, (1.0 - 1.96) / (1.0 + 1.96)]),
        ),
        (BravaisType::MonoclinicP, CellConstants([2.0, 1.3, 1.7, 0.0, -0.3, 0.0])),
        (BravaisType::MonoclinicA, CellConstants([2.0, 1.4, 1.2, 0.0, -0.3, 0.0])),
        (BravaisType::Triclinic, CellConstants([2.0, 1.3, 1.7, 0.2, 0.3, 0.4])),
    ]
}

#[test]
fn test_bravais_canonical_classification() {
    let tol = Tolerance::new(1e-6);
    for (brav, constants) in canonical_cases() {
        let mut vectors = canonical_lattice_vectors(brav, &constants).unwrap();
        assert!(triple_product(&vectors) > 0.0);
        let (found, found_constants) = standard_lat(&mut vectors, tol);
        assert_eq!(found, brav, "{brav} misclassified as {found}");
        for (x, y) in found_constants.0.iter().zip(constants.0.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_bravais_codes() {
    for (i, brav) in BravaisType::ALL.iter().enumerate() {
        assert_eq!(brav.code(), i + 1);
        assert_eq!(BravaisType::from_code(i + 1).unwrap(), *brav);
        assert!(brav.holohedry_order().is_some());
    }
    assert_eq!(
        BravaisType::from_code(15).unwrap(),
        BravaisType::Undetermined
    );
    assert!(BravaisType::from_code(0).is_err());
    assert!(BravaisType::CubicP < BravaisType::Triclinic);
    assert_eq!(BravaisType::CubicF.to_string(), "03. Cubic F (face-centred)");
}

#[test]
fn test_bravais_monoclinic_relabelling() {
    let tol = Tolerance::new(1e-6);
    let constants = CellConstants([2.0, 1.3, 1.7, 0.0, -0.3, 0.0]);
    let original = canonical_lattice_vectors(BravaisType::MonoclinicP, &constants).unwrap();
    let mut vectors = original;
    standard_lat(&mut vectors, tol);
    assert_relative_eq!(vectors[0], original[1]);
    assert_relative_eq!(vectors[1], original[2]);
    assert_relative_eq!(vectors[2], original[0]);
}

#[test]
fn test_bravais_left_handed_input() {
    let tol = Tolerance::new(1e-6);
    let mut vectors = [
        Vector3::new(0.0, 0.0, 3.0),
        Vector3::new(0.0, 2.0, 0.0),
        Vector3::new(2.0, 0.0, 0.0),
    ];
    assert!(triple_product(&vectors) < 0.0);
    let (brav, _) = standard_lat(&mut vectors, tol);
    // Not in the canonical (|a| = |b|) tetragonal setting.
    assert_eq!(brav, BravaisType::Undetermined);
    assert!(triple_product(&vectors) > 0.0);
}

#[test]
fn test_bravais_reordered_orthorhombic_is_undetermined() {
    let tol = Tolerance::new(1e-6);
    let mut vectors = [
        Vector3::new(3.0, 0.0, 0.0),
        Vector3::new(0.0, 2.0, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
    ];
    assert_eq!(standard_lat(&mut vectors, tol).0, BravaisType::Undetermined);
}

#[test]
fn test_bravais_invalid_constants() {
    assert!(canonical_lattice_vectors(
        BravaisType::OrthorhombicP,
        &CellConstants([2.0, 1.7, 1.3, 0.0, 0.0, 0.0])
    )
    .is_err());
    assert!(canonical_lattice_vectors(
        BravaisType::Undetermined,
        &CellConstants([1.0, 0.0, 0.0, 0.0, 0.0, 0.0])
    )
    .is_err());
}
