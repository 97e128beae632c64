use nalgebra::Matrix3;
use proptest::prelude::*;

use crate::symmetry::hermite::{hermite_normal_form, hermite_normal_form_int};
use crate::symmetry::tolerance::Tolerance;

fn det_i64(m: &Matrix3<i64>) -> i64 {
    m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
}

#[test]
fn test_hermite_diagonal_supercell() {
    let s = Matrix3::new(2.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
    let hnf = hermite_normal_form(&s, Tolerance::new(1e-6)).unwrap();
    assert_eq!(hnf.h, Matrix3::new(2, 0, 0, 0, 1, 0, 0, 0, 1));
    assert_eq!(hnf.diagonal_product(), 2);
}

#[test]
fn test_hermite_known_form() {
    let s = Matrix3::new(-1, 1, 1, 1, -1, 1, 1, 1, -1);
    let hnf = hermite_normal_form_int(&s).unwrap();
    assert_eq!(hnf.diagonal_product(), 4);
    assert_eq!(s * hnf.b, hnf.h);
    assert_eq!(det_i64(&hnf.b).abs(), 1);
    assert_eq!(hnf.h[(0, 1)], 0);
    assert_eq!(hnf.h[(0, 2)], 0);
    assert_eq!(hnf.h[(1, 2)], 0);
}

#[test]
fn test_hermite_rejects_non_integral_and_singular() {
    let tol = Tolerance::new(1e-6);
    let s = Matrix3::new(2.0, 0.0, 0.0, 0.0, 1.0 + 1e-4, 0.0, 0.0, 0.0, 1.0);
    assert!(hermite_normal_form(&s, tol).is_err());

    let s = Matrix3::new(2.0, 0.0, 0.0, 0.0, 1.0 + 1e-6, 0.0, 0.0, 0.0, 1.0);
    assert!(hermite_normal_form(&s, tol).is_ok());

    let singular = Matrix3::new(1, 2, 3, 2, 4, 6, 0, 0, 1);
    assert!(hermite_normal_form_int(&singular).is_err());
}

proptest! {
    #[test]
    fn test_hermite_properties(entries in prop::array::uniform9(-6_i64..=6_i64)) {
        let s = Matrix3::from_row_slice(&entries);
        let det = det_i64(&s);
        prop_assume!(det != 0);

        let hnf = hermite_normal_form_int(&s).unwrap();
        prop_assert_eq!(s * hnf.b, hnf.h);
        prop_assert_eq!(det_i64(&hnf.b).abs(), 1);
        prop_assert_eq!(hnf.diagonal_product(), det.abs());
        for i in 0..3 {
            prop_assert!(hnf.h[(i, i)] > 0);
            for j in (i + 1)..3 {
                prop_assert_eq!(hnf.h[(i, j)], 0);
            }
            for j in 0..i {
                prop_assert!(hnf.h[(i, j)] >= 0 && hnf.h[(i, j)] < hnf.h[(i, i)]);
            }
        }
    }
}
