use approx::assert_relative_eq;
use nalgebra::{Matrix3, Vector3};
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crysym::auxiliary::structure::{Species, Structure};
use crysym::drivers::space_group_detection::{
    SpaceGroupDetectionDriver, SpaceGroupDetectionParams,
};
use crysym::drivers::CrysymDriver;
use crysym::symmetrisation::{rho_symmetry, symmetrize_cartesian_vec3_nat, symmetrize_mat3};
use crysym::symmetry::bravais::BravaisType;
use crysym::symmetry::symmetry_core::{CalculationMode, SymmetryAnalyser};

fn orthorhombic(a: f64, b: f64, c: f64) -> [Vector3<f64>; 3] {
    [
        Vector3::new(a, 0.0, 0.0),
        Vector3::new(0.0, b, 0.0),
        Vector3::new(0.0, 0.0, c),
    ]
}

fn analyser(calculation: CalculationMode) -> SymmetryAnalyser {
    SymmetryAnalyser::builder()
        .symmetry_prec(1e-6)
        .calculation(calculation)
        .build()
        .unwrap()
}

#[test]
fn test_simple_cubic() {
    let structure = Structure::from_fractional(
        orthorhombic(1.0, 1.0, 1.0),
        vec![("Po", vec![Vector3::zeros()])],
    )
    .unwrap();
    let analysis = analyser(CalculationMode::Scf).analyse(&structure).unwrap();
    assert_eq!(analysis.lattice.bravais.code(), 1);
    assert_eq!(analysis.nrotk(), 48);
    assert_eq!(analysis.primitive.ncell, 1);
}

#[test]
fn test_doubled_cubic() {
    let structure = Structure::from_fractional(
        orthorhombic(2.0, 1.0, 1.0),
        vec![("Po", vec![Vector3::zeros(), Vector3::new(0.5, 0.0, 0.0)])],
    )
    .unwrap();
    let analysis = analyser(CalculationMode::Scf).analyse(&structure).unwrap();
    assert_eq!(analysis.primitive.ncell, 2);
    assert_eq!(analysis.primitive.ptrans.len(), 2);
    assert_relative_eq!(
        analysis.primitive.lattice().determinant().abs(),
        1.0,
        epsilon = 1e-10
    );
    assert_eq!(analysis.primitive.bravais(), BravaisType::CubicP);
}

#[test]
fn test_body_centred_cubic_in_conventional_cell() {
    let structure = Structure::from_fractional(
        orthorhombic(1.0, 1.0, 1.0),
        vec![("Fe", vec![Vector3::zeros(), Vector3::new(0.5, 0.5, 0.5)])],
    )
    .unwrap();
    let analysis = analyser(CalculationMode::Scf).analyse(&structure).unwrap();
    assert_eq!(analysis.lattice.bravais, BravaisType::CubicP);
    assert_eq!(analysis.primitive.ncell, 2);
    assert_eq!(analysis.primitive.bravais(), BravaisType::CubicI);
    assert_eq!(analysis.nrot, 48);
    assert_eq!(analysis.nrotk(), 48);
    assert!(analysis.atom_map.is_complete());
}

#[test]
fn test_magnetic_dimer_reduces_group() {
    let fe = Species::builder()
        .label("Fe")
        .positions(vec![Vector3::new(0.0, 0.0, 0.3), Vector3::new(0.0, 0.0, -0.3)])
        .magnetic_moments(vec![Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, -1.0)])
        .build()
        .unwrap();
    let structure = Structure::new(orthorhombic(3.0, 3.0, 3.0), vec![fe]).unwrap();

    let structural = analyser(CalculationMode::Scf).analyse(&structure).unwrap();
    let magnetic = SymmetryAnalyser::builder()
        .symmetry_prec(1e-6)
        .nspin(2)
        .build()
        .unwrap()
        .analyse(&structure)
        .unwrap();
    assert!(magnetic.nrotk() < structural.nrotk());
}

#[test]
fn test_cell_relax_trajectory_recovers_symmetry() {
    let params = SpaceGroupDetectionParams::builder()
        .symmetry_prec(1e-6)
        .calculation(CalculationMode::CellRelax)
        .build()
        .unwrap();
    let structures = [1.0, 1.0 + 1.5e-6, 1.0]
        .iter()
        .map(|c| {
            Structure::from_fractional(
                orthorhombic(1.0, 1.0, *c),
                vec![("Po", vec![Vector3::zeros()])],
            )
            .unwrap()
        })
        .collect::<Vec<_>>();
    let mut driver = SpaceGroupDetectionDriver::builder()
        .parameters(&params)
        .structures(&structures)
        .build()
        .unwrap();
    driver.run().unwrap();
    let result = driver.result().unwrap();

    assert_eq!(result.analyses[0].nrotk(), 48);
    assert_eq!(result.analyses[1].trials.len(), 2);
    assert_eq!(result.analyses[1].nrotk(), 48);
    assert_relative_eq!(result.analyses[1].tolerance.epsilon, 2e-6);
    assert_relative_eq!(result.analyses[2].tolerance.epsilon, 1e-6);
}

#[test]
fn test_symmetrised_quantities_are_invariant() {
    let structure = Structure::from_fractional(
        orthorhombic(1.0, 1.0, 1.5),
        vec![
            ("Ti", vec![Vector3::zeros()]),
            ("O", vec![Vector3::new(0.5, 0.5, 0.0)]),
        ],
    )
    .unwrap();
    let analysis = analyser(CalculationMode::Scf).analyse(&structure).unwrap();
    assert_eq!(analysis.nrotk(), 16);
    let group = analysis.symmetrisation_group();
    let lattice = structure.lattice();

    let mut rng = StdRng::seed_from_u64(7);

    // Density on a grid commensurate with the tetragonal operations.
    let mut rho = Array3::from_shape_fn((4, 4, 6), |_| rng.gen_range(0.0..1.0));
    let total = rho.sum();
    rho_symmetry(&mut rho, &group).unwrap();
    assert_relative_eq!(rho.sum(), total, epsilon = 1e-10);
    let once = rho.clone();
    rho_symmetry(&mut rho, &group).unwrap();
    for (a, b) in rho.iter().zip(once.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12);
    }

    // Random forces on atoms sitting at inversion centres vanish.
    let mut forces = (0..2)
        .map(|_| {
            Vector3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            )
        })
        .collect::<Vec<_>>();
    symmetrize_cartesian_vec3_nat(&mut forces, &lattice, &group, &analysis.atom_map).unwrap();
    for force in forces.iter() {
        assert_relative_eq!(force.norm(), 0.0, epsilon = 1e-12);
    }

    // A random symmetric stress keeps only its tetragonal components.
    let a = Matrix3::from_fn(|_, _| rng.gen_range(-1.0..1.0));
    let sigma = a + a.transpose();
    let sym = symmetrize_mat3(&sigma, &lattice, &group).unwrap();
    assert_relative_eq!(sym[(0, 1)], 0.0, epsilon = 1e-12);
    assert_relative_eq!(sym[(0, 2)], 0.0, epsilon = 1e-12);
    assert_relative_eq!(sym[(1, 2)], 0.0, epsilon = 1e-12);
    assert_relative_eq!(sym[(0, 0)], sym[(1, 1)], epsilon = 1e-12);
    assert_relative_eq!(sym[(2, 2)], sigma[(2, 2)], epsilon = 1e-12);
}
