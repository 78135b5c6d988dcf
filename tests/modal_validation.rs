//! Analytical validation of modal analysis
//!
//! Natural frequencies are checked against the continuum cantilever
//! solution `f1 = (1.875^2 / 2 pi) * sqrt(EI / (rho A L^4))`, mode shapes
//! against M-orthonormality, and participation factors against the total
//! mass they must account for.

use approx::assert_relative_eq;

use framesolve::assembly::GlobalSystem;
use framesolve::math::sparse::matvec;
use framesolve::prelude::*;
use framesolve::runner;

use nalgebra::DVector;

const E: f64 = 200e9;
const NU: f64 = 0.3;
const RHO: f64 = 7850.0;

fn modal_analysis(id: &str, num_modes: usize) -> AnalysisSpec {
    AnalysisSpec {
        id: id.into(),
        project_id: "P1".into(),
        kind: AnalysisKind::Modal,
        load_case_ids: vec![],
        load_combination_ids: vec![],
        num_modes: Some(num_modes),
        options: Default::default(),
    }
}

/// Cantilever of `segments` equal elements along global x.
fn cantilever(segments: usize, length: f64, section: Section) -> ModelSnapshot {
    let mut nodes = vec![Node::new("N0", 0.0, 0.0, 0.0).fixed()];
    let mut elements = Vec::new();
    for i in 1..=segments {
        let x = length * i as f64 / segments as f64;
        nodes.push(Node::new(&format!("N{i}"), x, 0.0, 0.0));
        elements.push(Element::new(
            &format!("E{i}"),
            &format!("N{}", i - 1),
            &format!("N{i}"),
            &section.id,
            "Steel",
        ));
    }

    ModelSnapshot::new(
        "P1",
        nodes,
        elements,
        vec![section],
        vec![Material::new("Steel", E, NU, RHO)],
        vec![],
        vec![],
        vec![],
    )
    .unwrap()
}

/// First continuum bending frequency of a cantilever about inertia `i`.
fn cantilever_f1(length: f64, area: f64, inertia: f64) -> f64 {
    let beta_l = 1.875_104_068_711_961_f64;
    beta_l.powi(2) / (2.0 * std::f64::consts::PI)
        * (E * inertia / (RHO * area * length.powi(4))).sqrt()
}

#[test]
fn single_element_cantilever_first_frequency() {
    // One element, six free DOFs: exercises the dense eigen path
    let section = Section::rectangular("R1", 0.2, 0.4);
    let area = section.a;
    let weak_inertia = section.iz;
    let snapshot = cantilever(1, 3.0, section);

    let store = MemoryStore::new();
    store.insert_project(snapshot);
    store.insert_analysis(modal_analysis("A1", 6));
    runner::run(&store, "A1").unwrap();

    let modes = store.modal_results("A1");
    assert_eq!(modes.len(), 6);

    // Ascending output, 1-based numbering, period consistency
    for (i, mode) in modes.iter().enumerate() {
        assert_eq!(mode.mode_number, i + 1);
        assert_relative_eq!(mode.period, 1.0 / mode.frequency, max_relative = 1e-12);
        assert_relative_eq!(mode.modal_mass, 1.0, max_relative = 1e-9);
    }
    assert!(modes.windows(2).all(|w| w[0].frequency < w[1].frequency));

    // The fundamental mode is weak-axis bending
    let expected = cantilever_f1(3.0, area, weak_inertia);
    assert_relative_eq!(modes[0].frequency, expected, max_relative = 0.02);
}

#[test]
fn refined_cantilever_matches_continuum() {
    // Twelve elements, 72 free DOFs: exercises the Lanczos path
    let section = Section::rectangular("R1", 0.2, 0.4);
    let area = section.a;
    let weak_inertia = section.iz;
    let strong_inertia = section.iy;
    let snapshot = cantilever(12, 3.0, section);

    let store = MemoryStore::new();
    store.insert_project(snapshot);
    store.insert_analysis(modal_analysis("A1", 4));
    runner::run(&store, "A1").unwrap();

    let modes = store.modal_results("A1");
    assert_eq!(modes.len(), 4);

    // Mode 1: weak-axis fundamental, mode 2: strong-axis fundamental
    let weak = cantilever_f1(3.0, area, weak_inertia);
    let strong = cantilever_f1(3.0, area, strong_inertia);
    assert_relative_eq!(modes[0].frequency, weak, max_relative = 0.01);
    assert_relative_eq!(modes[1].frequency, strong, max_relative = 0.01);

    // Second weak-axis bending mode at (4.694/1.875)^2 times the first
    let second_weak = weak * (4.694_091_f64 / 1.875_104).powi(2);
    assert_relative_eq!(modes[2].frequency, second_weak, max_relative = 0.01);
}

#[test]
fn mode_shapes_are_m_orthonormal() {
    let section = Section::rectangular("R1", 0.2, 0.4);
    let snapshot = cantilever(12, 3.0, section);

    let store = MemoryStore::new();
    store.insert_project(snapshot.clone());
    store.insert_analysis(modal_analysis("A1", 4));
    runner::run(&store, "A1").unwrap();

    let modes = store.modal_results("A1");

    // Rebuild the full mass matrix and check phi_i^T M phi_j = delta_ij
    let system = GlobalSystem::new(&snapshot).unwrap();
    let m = system.mass().to_csr();

    let shapes: Vec<DVector<f64>> = modes
        .iter()
        .map(|mode| {
            DVector::from_iterator(
                snapshot.num_nodes() * 6,
                mode.mode_shape.iter().flat_map(|entry| entry.amplitude),
            )
        })
        .collect();

    for (i, phi_i) in shapes.iter().enumerate() {
        for (j, phi_j) in shapes.iter().enumerate() {
            let product = matvec(&m, phi_i).dot(phi_j);
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_relative_eq!(product, expected, epsilon = 1e-8);
        }
    }
}

#[test]
fn effective_mass_sums_to_free_mass() {
    // With every mode extracted, the effective modal masses in a
    // translation direction must add up to the rigid-body mass of the
    // free DOFs in that direction.
    let section = Section::rectangular("R1", 0.2, 0.4);
    let snapshot = cantilever(3, 3.0, section);

    let store = MemoryStore::new();
    store.insert_project(snapshot.clone());
    store.insert_analysis(modal_analysis("A1", 18));
    runner::run(&store, "A1").unwrap();

    let modes = store.modal_results("A1");
    assert_eq!(modes.len(), 18);

    let system = GlobalSystem::new(&snapshot).unwrap();
    let m_reduced = system.reduce_matrix(&system.mass());

    for direction in 0..3 {
        let mut rigid = DVector::zeros(system.dofs.num_free());
        for (position, &dof) in system.dofs.free().iter().enumerate() {
            if dof % 6 == direction {
                rigid[position] = 1.0;
            }
        }
        let target = matvec(&m_reduced, &rigid).dot(&rigid);

        let total: f64 = modes.iter().map(|mode| mode.effective_mass[direction]).sum();
        assert_relative_eq!(total, target, max_relative = 1e-6);
    }
}

#[test]
fn participation_vanishes_orthogonal_to_bending_plane() {
    // A planar cantilever's weak-axis bending mode moves only in y:
    // participation in x and z stays numerically zero.
    let section = Section::rectangular("R1", 0.2, 0.4);
    let snapshot = cantilever(6, 3.0, section);

    let store = MemoryStore::new();
    store.insert_project(snapshot);
    store.insert_analysis(modal_analysis("A1", 1));
    runner::run(&store, "A1").unwrap();

    let fundamental = &store.modal_results("A1")[0];
    let in_plane = fundamental.participation[1].abs();
    assert!(in_plane > 1.0, "weak-axis mode must carry y participation");
    assert!(fundamental.participation[0].abs() < 1e-6 * in_plane);
    assert!(fundamental.participation[2].abs() < 1e-6 * in_plane);
}

#[test]
fn unrestrained_modal_model_fails() {
    let section = Section::rectangular("R1", 0.2, 0.4);
    let mut snapshot = cantilever(2, 3.0, section);
    // Release the support: six rigid-body modes appear
    snapshot.nodes[0].restraints = [false; 6];
    snapshot.reindex().unwrap();

    let store = MemoryStore::new();
    store.insert_project(snapshot);
    store.insert_analysis(modal_analysis("A1", 3));

    let error = runner::run(&store, "A1").unwrap_err();
    assert!(matches!(error, EngineError::Singular));
    assert!(store.modal_results("A1").is_empty());
    assert_eq!(store.status("A1").unwrap().state, AnalysisState::Failed);
}

#[test]
fn modal_results_rerun_is_idempotent() {
    let section = Section::rectangular("R1", 0.2, 0.4);
    let snapshot = cantilever(2, 3.0, section);

    let store = MemoryStore::new();
    store.insert_project(snapshot);
    store.insert_analysis(modal_analysis("A1", 3));

    runner::run(&store, "A1").unwrap();
    runner::run(&store, "A1").unwrap();
    assert_eq!(store.modal_results("A1").len(), 3);
}
