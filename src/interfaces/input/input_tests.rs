use approx::assert_relative_eq;
use nalgebra::Vector3;

use crate::interfaces::input::{
    write_input_template, CoordinateKind, Input, SpaceGroupDetectionInputKind, StructureInput,
};
use crate::interfaces::InputHandle;
use crate::io::read_crysym_yaml;
use crate::auxiliary::structure::Species;
use crate::interfaces::input::StructureStep;
use crate::symmetry::bravais::BravaisType;
use crate::symmetry::symmetry_core::{CalculationMode, SymmetryAnalyser};

const ROOT: &str = env!("CARGO_MANIFEST_DIR");

#[test]
fn test_interfaces_input_parameters() {
    let name = format!("{ROOT}/tests/input/test_input_doubled_cubic.yml");
    let inp = read_crysym_yaml::<Input, _>(&name).unwrap();

    if let SpaceGroupDetectionInputKind::Parameters(params) = &inp.space_group_detection {
        assert_relative_eq!(params.symmetry_prec, 1e-5);
        assert_eq!(params.nspin, 1);
        assert_eq!(params.calculation, CalculationMode::Scf);
        assert!(params.write_operations);
        assert!(params.result_save_name.is_none());
    } else {
        panic!("Parameters expected.");
    }

    let structure = inp.structure.as_ref().unwrap();
    assert_eq!(structure.coordinates, CoordinateKind::Direct);
    let structures = structure.to_structures().unwrap();
    assert_eq!(structures.len(), 1);
    assert_eq!(structures[0].n_atoms(), 2);
    assert_relative_eq!(
        structures[0].species()[0].positions[1],
        Vector3::new(1.0, 0.0, 0.0)
    );

    assert!(inp.handle().is_ok());
}

#[test]
fn test_interfaces_input_cartesian_steps() {
    let name = format!("{ROOT}/tests/input/test_input_cell_relax.yml");
    let inp = read_crysym_yaml::<Input, _>(&name).unwrap();

    if let SpaceGroupDetectionInputKind::Parameters(params) = &inp.space_group_detection {
        assert_eq!(params.nspin, 2);
        assert_eq!(params.calculation, CalculationMode::CellRelax);
        assert!(!params.write_operations);
    } else {
        panic!("Parameters expected.");
    }

    let structures = inp.structure.as_ref().unwrap().to_structures().unwrap();
    assert_eq!(structures.len(), 2);
    assert_relative_eq!(structures[0].lattice().determinant(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(
        structures[0].species()[0].positions[1],
        Vector3::new(0.5, 0.5, 0.5)
    );
    assert!(!structures[0].is_all_movable());
    assert!(structures[1].is_all_movable());
    assert_eq!(
        structures[0].species()[0].magnetic_moment(1),
        Vector3::new(0.0, 0.0, 1.0)
    );
}

#[test]
fn test_interfaces_input_lattice_constant_invariance() {
    // A cubic cell strained by 3e-7 along c stays cubic within 1e-6 whatever the length unit.
    let structure_input = |lattice_constant: f64| StructureInput {
        lattice_constant,
        coordinates: CoordinateKind::Direct,
        steps: vec![StructureStep {
            lattice_vectors: [
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0 + 3e-7),
            ],
            species: vec![Species::new("Po", vec![Vector3::zeros()])],
        }],
    };
    let mut analyser = SymmetryAnalyser::builder()
        .symmetry_prec(1e-6)
        .build()
        .unwrap();

    let unit = structure_input(1.0).to_structures().unwrap();
    let scaled = structure_input(10.0).to_structures().unwrap();
    assert_relative_eq!(unit[0].lattice(), scaled[0].lattice(), epsilon = 1e-14);

    let unit_analysis = analyser.analyse(&unit[0]).unwrap();
    let scaled_analysis = analyser.analyse(&scaled[0]).unwrap();
    for analysis in [&unit_analysis, &scaled_analysis] {
        assert_eq!(analysis.lattice.bravais, BravaisType::CubicP);
        assert_eq!(analysis.nrotk(), 48);
    }
}

#[test]
fn test_interfaces_input_fromfile() {
    let name = format!("{ROOT}/tests/input/test_input_fromfile.yml");
    let inp = read_crysym_yaml::<Input, _>(&name).unwrap();
    assert!(inp.structure.is_none());
    if let SpaceGroupDetectionInputKind::FromFile(file) = &inp.space_group_detection {
        assert_eq!(file, "test_results");
    } else {
        panic!("FromFile expected.");
    }
    // The results file does not exist.
    assert!(inp.handle().is_err());
}

#[test]
fn test_interfaces_input_invalid_structure() {
    let mut structure = StructureInput::default();
    structure.lattice_constant = -1.0;
    assert!(structure.to_structures().is_err());

    let mut structure = StructureInput::default();
    structure.steps.clear();
    assert!(structure.to_structures().is_err());

    let inp = Input {
        structure: None,
        space_group_detection: SpaceGroupDetectionInputKind::default(),
    };
    assert!(inp.handle().is_err());
}

#[test]
fn test_interfaces_input_template() {
    let name = std::env::temp_dir().join(format!("crysym_template_{}", std::process::id()));
    write_input_template(&name).unwrap();
    let inp = read_crysym_yaml::<Input, _>(name.with_extension("yml")).unwrap();
    let structures = inp.structure.as_ref().unwrap().to_structures().unwrap();
    assert_eq!(structures.len(), 1);
    assert_eq!(structures[0].n_atoms(), 1);
    assert!(matches!(
        inp.space_group_detection,
        SpaceGroupDetectionInputKind::Parameters(_)
    ));
    assert!(inp.handle().is_ok());
    let _ = std::fs::remove_file(name.with_extension("yml"));
}
