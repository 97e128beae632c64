use nalgebra::{Matrix3, Vector3};

use crate::symmetry::atom_map::set_atom_map;
use crate::symmetry::symmetry_operation::SymmetryOperation;
use crate::symmetry::tolerance::Tolerance;

#[test]
fn test_atom_map_permutations() {
    let tol = Tolerance::new(1e-6);
    let positions = vec![
        vec![Vector3::new(0.0, 0.0, 0.1), Vector3::new(0.0, 0.0, -0.1)],
        vec![Vector3::new(0.5, 0.5, 0.5)],
    ];
    let ops = vec![
        SymmetryOperation::identity(),
        SymmetryOperation::from_rotation(-Matrix3::identity()),
        SymmetryOperation::new(Matrix3::identity(), Vector3::new(0.0, 0.0, 0.2)),
    ];
    let map = set_atom_map(&ops, &positions, tol);
    assert_eq!(map.n_operations(), 3);
    assert_eq!(map.0[0], vec![Some(0), Some(1), Some(2)]);
    assert_eq!(map.0[1], vec![Some(1), Some(0), Some(2)]);
    assert_eq!(map.0[2], vec![None, Some(0), None]);
    assert_eq!(map.image(1, 0), Some(1));
    assert_eq!(map.image(5, 0), None);
    assert!(!map.is_complete());
    assert!(set_atom_map(&ops[..2], &positions, tol).is_complete());
}
