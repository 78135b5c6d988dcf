//! Analytical validation of linear static analysis
//!
//! Each scenario checks computed displacements, reactions and member
//! forces against closed-form beam theory, plus the global invariants:
//! equilibrium, superposition and singular-model detection.

use approx::assert_relative_eq;

use framesolve::prelude::*;
use framesolve::runner;
use framesolve::solver::Engine;

const E: f64 = 200e9;
const NU: f64 = 0.3;
const RHO: f64 = 7850.0;

fn analysis(id: &str, kind: AnalysisKind, cases: &[&str], combos: &[&str]) -> AnalysisSpec {
    AnalysisSpec {
        id: id.into(),
        project_id: "P1".into(),
        kind,
        load_case_ids: cases.iter().map(|s| s.to_string()).collect(),
        load_combination_ids: combos.iter().map(|s| s.to_string()).collect(),
        num_modes: None,
        options: Default::default(),
    }
}

/// W14x90-like section with equal moments of inertia in both planes so the
/// closed-form answers hold regardless of load orientation.
fn w14x90() -> Section {
    Section::new("W14x90", 17_100e-6, 3.39e-4, 3.39e-4, 4.06e-6, 1.61e-3, 1.61e-3)
}

fn node_result<'a>(results: &'a [NodeResult], node: &str, case: &CaseRef) -> &'a NodeResult {
    results
        .iter()
        .find(|r| r.node_id == node && r.case == *case)
        .expect("node result present")
}

fn element_result<'a>(
    results: &'a [ElementResult],
    element: &str,
    case: &CaseRef,
    position: f64,
) -> &'a ElementResult {
    results
        .iter()
        .find(|r| r.element_id == element && r.case == *case && r.position == position)
        .expect("element result present")
}

/// Forces and moments about the origin must balance: the sum of reactions
/// and applied nodal loads vanishes in all six components.
fn assert_equilibrium(snapshot: &ModelSnapshot, results: &[NodeResult], case: &CaseRef) {
    let mut total_force = [0.0_f64; 3];
    let mut total_moment = [0.0_f64; 3];
    let mut load_norm = 0.0_f64;

    let mut accumulate = |p: [f64; 3], f: &[f64; 6]| {
        for d in 0..3 {
            total_force[d] += f[d];
            total_moment[d] += f[d + 3];
        }
        total_moment[0] += p[1] * f[2] - p[2] * f[1];
        total_moment[1] += p[2] * f[0] - p[0] * f[2];
        total_moment[2] += p[0] * f[1] - p[1] * f[0];
    };

    for load in &snapshot.loads {
        if let Load::Nodal(nodal) = load {
            if nodal.case == case.id() {
                let node = snapshot.node(&nodal.node).unwrap();
                accumulate(node.coords(), &nodal.components);
                load_norm += nodal.components.iter().map(|v| v * v).sum::<f64>();
            }
        }
    }
    let load_norm = load_norm.sqrt().max(1.0);

    for record in results.iter().filter(|r| r.case == *case) {
        if let Some(reaction) = &record.reaction {
            let node = snapshot.node(&record.node_id).unwrap();
            accumulate(node.coords(), reaction);
        }
    }

    for d in 0..3 {
        assert!(
            total_force[d].abs() <= 1e-6 * load_norm,
            "force residual in direction {d}: {}",
            total_force[d]
        );
        assert!(
            total_moment[d].abs() <= 1e-6 * load_norm,
            "moment residual about axis {d}: {}",
            total_moment[d]
        );
    }
}

#[test]
fn cantilever_tip_load() {
    let length = 3.0;
    let load = -1000.0;
    let snapshot = ModelSnapshot::new(
        "P1",
        vec![
            Node::new("N1", 0.0, 0.0, 0.0).fixed(),
            Node::new("N2", length, 0.0, 0.0),
        ],
        vec![Element::new("E1", "N1", "N2", "W14x90", "Steel")],
        vec![w14x90()],
        vec![Material::new("Steel", E, NU, RHO)],
        vec![LoadCase::new("LC1", "Tip load")],
        vec![],
        vec![Load::Nodal(NodalLoad::force("N2", "LC1", 0.0, 0.0, load))],
    )
    .unwrap();

    let store = MemoryStore::new();
    store.insert_project(snapshot.clone());
    store.insert_analysis(analysis("A1", AnalysisKind::LinearStatic, &["LC1"], &[]));

    runner::run(&store, "A1").unwrap();
    assert_eq!(store.status("A1").unwrap().state, AnalysisState::Complete);

    let case = CaseRef::Case("LC1".into());
    let results = store.node_results("A1");

    let expected = load * length.powi(3) / (3.0 * E * 3.39e-4);
    let tip = node_result(&results, "N2", &case);
    assert_relative_eq!(tip.displacement[2], expected, max_relative = 0.01);

    let root = node_result(&results, "N1", &case);
    let reaction = root.reaction.unwrap();
    assert_relative_eq!(reaction[2], -load, max_relative = 1e-9);
    assert_relative_eq!(reaction[4], load * length, max_relative = 1e-9);

    assert_equilibrium(&snapshot, &results, &case);

    // Root moment in the element result: |My| = F * L
    let elements = store.element_results("A1");
    let at_root = element_result(&elements, "E1", &case, 0.0);
    assert_relative_eq!(at_root.moment_y.abs(), 3000.0, max_relative = 1e-9);
}

#[test]
fn simply_supported_midspan_load() {
    let span = 6.0;
    let load = -2000.0;
    let inertia = 3.39e-4;

    // Pin at both ends, torsion anchored at N1, axial released at N3
    let snapshot = ModelSnapshot::new(
        "P1",
        vec![
            Node::new("N1", 0.0, 0.0, 0.0)
                .with_restraints([true, true, true, true, false, false]),
            Node::new("N2", span / 2.0, 0.0, 0.0),
            Node::new("N3", span, 0.0, 0.0)
                .with_restraints([false, true, true, false, false, false]),
        ],
        vec![
            Element::new("E1", "N1", "N2", "W14x90", "Steel"),
            Element::new("E2", "N2", "N3", "W14x90", "Steel"),
        ],
        vec![w14x90()],
        vec![Material::new("Steel", E, NU, RHO)],
        vec![LoadCase::new("LC1", "Midspan load")],
        vec![],
        vec![Load::Nodal(NodalLoad::force("N2", "LC1", 0.0, 0.0, load))],
    )
    .unwrap();

    let store = MemoryStore::new();
    store.insert_project(snapshot.clone());
    store.insert_analysis(analysis("A1", AnalysisKind::LinearStatic, &["LC1"], &[]));
    runner::run(&store, "A1").unwrap();

    let case = CaseRef::Case("LC1".into());
    let results = store.node_results("A1");

    let expected = load * span.powi(3) / (48.0 * E * inertia);
    let mid = node_result(&results, "N2", &case);
    assert_relative_eq!(mid.displacement[2], expected, max_relative = 0.005);

    for support in ["N1", "N3"] {
        let reaction = node_result(&results, support, &case).reaction.unwrap();
        assert_relative_eq!(reaction[2], 1000.0, max_relative = 0.005);
    }

    assert_equilibrium(&snapshot, &results, &case);
}

#[test]
fn axial_rod() {
    let length = 2.0;
    let area = 0.01;
    let force = 1.0e6;

    let snapshot = ModelSnapshot::new(
        "P1",
        vec![
            Node::new("N1", 0.0, 0.0, 0.0).fixed(),
            Node::new("N2", length, 0.0, 0.0)
                .with_restraints([false, true, true, true, true, true]),
        ],
        vec![Element::new("E1", "N1", "N2", "Rod", "Steel")],
        vec![Section::new("Rod", area, 1e-5, 1e-5, 1e-6, 1e-4, 1e-4)],
        vec![Material::new("Steel", E, NU, RHO)],
        vec![LoadCase::new("LC1", "Axial pull")],
        vec![],
        vec![Load::Nodal(NodalLoad::force("N2", "LC1", force, 0.0, 0.0))],
    )
    .unwrap();

    let store = MemoryStore::new();
    store.insert_project(snapshot);
    store.insert_analysis(analysis("A1", AnalysisKind::LinearStatic, &["LC1"], &[]));
    runner::run(&store, "A1").unwrap();

    let case = CaseRef::Case("LC1".into());
    let results = store.node_results("A1");
    let tip = node_result(&results, "N2", &case);
    assert_relative_eq!(tip.displacement[0], force * length / (E * area), max_relative = 1e-9);

    let elements = store.element_results("A1");
    for position in [0.0, 1.0] {
        let record = element_result(&elements, "E1", &case, position);
        assert_relative_eq!(record.axial_force, force, max_relative = 1e-9);
        // sigma = F/A = 100 MPa at both ends, tension positive
        assert_relative_eq!(record.axial_stress, 100.0, max_relative = 1e-9);
    }
}

#[test]
fn distributed_load_on_simple_beam() {
    let span = 8.0;
    let w = -3000.0;
    let inertia = 3.39e-4;

    let snapshot = ModelSnapshot::new(
        "P1",
        vec![
            Node::new("N1", 0.0, 0.0, 0.0)
                .with_restraints([true, true, true, true, false, false]),
            Node::new("N2", span / 2.0, 0.0, 0.0),
            Node::new("N3", span, 0.0, 0.0)
                .with_restraints([false, true, true, false, false, false]),
        ],
        vec![
            Element::new("E1", "N1", "N2", "W14x90", "Steel"),
            Element::new("E2", "N2", "N3", "W14x90", "Steel"),
        ],
        vec![w14x90()],
        vec![Material::new("Steel", E, NU, RHO)],
        vec![LoadCase::new("LC1", "Uniform load")],
        vec![],
        vec![
            Load::Distributed(DistributedLoad::uniform("E1", "LC1", [0.0, 0.0, w])),
            Load::Distributed(DistributedLoad::uniform("E2", "LC1", [0.0, 0.0, w])),
        ],
    )
    .unwrap();

    let store = MemoryStore::new();
    store.insert_project(snapshot);
    store.insert_analysis(analysis("A1", AnalysisKind::LinearStatic, &["LC1"], &[]));
    runner::run(&store, "A1").unwrap();

    let case = CaseRef::Case("LC1".into());
    let results = store.node_results("A1");

    // Midspan deflection 5wL^4/(384EI); consistent nodal loads make the
    // nodal solution exact for an Euler-Bernoulli beam.
    let expected = 5.0 * w * span.powi(4) / (384.0 * E * inertia);
    let mid = node_result(&results, "N2", &case);
    assert_relative_eq!(mid.displacement[2], expected, max_relative = 1e-8);

    // Each support carries half the total load
    let total = -w * span;
    for support in ["N1", "N3"] {
        let reaction = node_result(&results, support, &case).reaction.unwrap();
        assert_relative_eq!(reaction[2], total / 2.0, max_relative = 1e-8);
    }

    // Member action at the support end of E1: shear wL/2 toward the span
    let elements = store.element_results("A1");
    let at_support = element_result(&elements, "E1", &case, 0.0);
    assert_relative_eq!(at_support.shear_z.abs(), total / 2.0, max_relative = 1e-8);
}

#[test]
fn load_combination_superposes() {
    let snapshot = ModelSnapshot::new(
        "P1",
        vec![
            Node::new("N1", 0.0, 0.0, 0.0).fixed(),
            Node::new("N2", 0.0, 0.0, 3.0),
            Node::new("N3", 4.0, 0.0, 3.0),
            Node::new("N4", 4.0, 0.0, 0.0).fixed(),
        ],
        vec![
            Element::new("E1", "N1", "N2", "W14x90", "Steel"),
            Element::new("E2", "N2", "N3", "W14x90", "Steel"),
            Element::new("E3", "N4", "N3", "W14x90", "Steel"),
        ],
        vec![w14x90()],
        vec![Material::new("Steel", E, NU, RHO)],
        vec![
            LoadCase::new("LC1", "Lateral"),
            LoadCase::new("LC2", "Gravity"),
        ],
        vec![LoadCombination::new("CB1", "1.2 LC1 + 1.6 LC2")
            .with_case("LC1", 1.2)
            .with_case("LC2", 1.6)],
        vec![
            Load::Nodal(NodalLoad::force("N2", "LC1", 25_000.0, 0.0, 0.0)),
            Load::Nodal(NodalLoad::force("N2", "LC2", 0.0, 0.0, -50_000.0)),
            Load::Nodal(NodalLoad::force("N3", "LC2", 0.0, 0.0, -50_000.0)),
        ],
    )
    .unwrap();

    let store = MemoryStore::new();
    store.insert_project(snapshot.clone());
    store.insert_analysis(analysis(
        "A1",
        AnalysisKind::LinearStatic,
        &["LC1", "LC2"],
        &["CB1"],
    ));
    runner::run(&store, "A1").unwrap();

    let combo = CaseRef::Combination("CB1".into());
    let results = store.node_results("A1");

    // Stored combination records equal the factored sum of stored cases
    for node in ["N2", "N3"] {
        let lc1 = node_result(&results, node, &CaseRef::Case("LC1".into()));
        let lc2 = node_result(&results, node, &CaseRef::Case("LC2".into()));
        let cb = node_result(&results, node, &combo);
        for d in 0..6 {
            let expected = 1.2 * lc1.displacement[d] + 1.6 * lc2.displacement[d];
            assert_relative_eq!(cb.displacement[d], expected, max_relative = 1e-10, epsilon = 1e-16);
        }
    }

    // And equal a direct solve of the factored load vector
    let engine = Engine::new(&snapshot, "A1", Default::default()).unwrap();
    let direct = engine
        .solve_static(&combo, &[("LC1", 1.2), ("LC2", 1.6)])
        .unwrap();
    for record in direct.node_results {
        let stored = node_result(&results, &record.node_id, &combo);
        for d in 0..6 {
            assert_relative_eq!(
                stored.displacement[d],
                record.displacement[d],
                max_relative = 1e-10,
                epsilon = 1e-16
            );
        }
    }

    // Element combination records: von Mises recomputed from components
    let elements = store.element_results("A1");
    let cb_root = element_result(&elements, "E1", &combo, 0.0);
    let expected_vm = ElementResult::von_mises(
        cb_root.axial_stress,
        cb_root.bending_stress_y,
        cb_root.bending_stress_z,
    );
    assert_relative_eq!(cb_root.von_mises_stress, expected_vm, max_relative = 1e-12);
}

#[test]
fn roll_angle_round_trip() {
    // Unequal inertias so the roll angle is observable in the deflection
    let section = Section::rectangular("R1", 0.2, 0.4);
    let iy = section.iy;
    let iz = section.iz;

    let solve_tip_dz = |roll_deg: f64| {
        let snapshot = ModelSnapshot::new(
            "P1",
            vec![
                Node::new("N1", 0.0, 0.0, 0.0).fixed(),
                Node::new("N2", 3.0, 0.0, 0.0),
            ],
            vec![Element::new("E1", "N1", "N2", "R1", "Steel").with_roll_deg(roll_deg)],
            vec![section.clone()],
            vec![Material::new("Steel", E, NU, RHO)],
            vec![LoadCase::new("LC1", "Tip load")],
            vec![],
            vec![Load::Nodal(NodalLoad::force("N2", "LC1", 0.0, 0.0, -1000.0))],
        )
        .unwrap();

        let store = MemoryStore::new();
        store.insert_project(snapshot);
        store.insert_analysis(analysis("A1", AnalysisKind::LinearStatic, &["LC1"], &[]));
        runner::run(&store, "A1").unwrap();

        let case = CaseRef::Case("LC1".into());
        let results = store.node_results("A1");
        node_result(&results, "N2", &case).displacement[2]
    };

    let dz_0 = solve_tip_dz(0.0);
    let dz_90 = solve_tip_dz(90.0);
    let dz_180 = solve_tip_dz(180.0);
    let dz_270 = solve_tip_dz(270.0);

    // A half turn reproduces the original bending plane; a quarter turn
    // swaps the inertias.
    assert_relative_eq!(dz_0, dz_180, max_relative = 1e-9);
    assert_relative_eq!(dz_90, dz_270, max_relative = 1e-9);
    assert_relative_eq!(dz_90 / dz_0, iy / iz, max_relative = 1e-9);
}

#[test]
fn prescribed_settlement_translates_rigidly() {
    let settlement = -0.01;
    let snapshot = ModelSnapshot::new(
        "P1",
        vec![
            Node::new("N1", 0.0, 0.0, 0.0)
                .fixed()
                .with_prescribed(2, settlement),
            Node::new("N2", 3.0, 0.0, 0.0)
                .with_restraints([false, false, true, false, false, false])
                .with_prescribed(2, settlement),
        ],
        vec![Element::new("E1", "N1", "N2", "W14x90", "Steel")],
        vec![w14x90()],
        vec![Material::new("Steel", E, NU, RHO)],
        vec![LoadCase::new("LC1", "Settlement only")],
        vec![],
        vec![],
    )
    .unwrap();

    let store = MemoryStore::new();
    store.insert_project(snapshot);
    store.insert_analysis(analysis("A1", AnalysisKind::LinearStatic, &["LC1"], &[]));
    runner::run(&store, "A1").unwrap();

    let case = CaseRef::Case("LC1".into());
    let results = store.node_results("A1");

    // Both ends settle together: a rigid translation with no member force
    assert_relative_eq!(
        node_result(&results, "N2", &case).displacement[2],
        settlement,
        max_relative = 1e-12
    );
    let elements = store.element_results("A1");
    let record = element_result(&elements, "E1", &case, 0.0);
    assert!(record.axial_force.abs() < 1e-3);
    assert!(record.moment_y.abs() < 1e-3);
}

#[test]
fn unrestrained_model_is_singular() {
    let snapshot = ModelSnapshot::new(
        "P1",
        vec![
            Node::new("N1", 0.0, 0.0, 0.0),
            Node::new("N2", 3.0, 0.0, 0.0),
        ],
        vec![Element::new("E1", "N1", "N2", "W14x90", "Steel")],
        vec![w14x90()],
        vec![Material::new("Steel", E, NU, RHO)],
        vec![LoadCase::new("LC1", "Load")],
        vec![],
        vec![Load::Nodal(NodalLoad::force("N2", "LC1", 0.0, 0.0, -1000.0))],
    )
    .unwrap();

    let store = MemoryStore::new();
    store.insert_project(snapshot);
    store.insert_analysis(analysis("A1", AnalysisKind::LinearStatic, &["LC1"], &[]));

    let error = runner::run(&store, "A1").unwrap_err();
    assert!(matches!(error, EngineError::Singular));

    // No partial results, FAILED with the error kind recorded
    assert!(store.node_results("A1").is_empty());
    assert!(store.element_results("A1").is_empty());
    let status = store.status("A1").unwrap();
    assert_eq!(status.state, AnalysisState::Failed);
    assert_eq!(status.error.as_deref(), Some("singular"));
}

#[test]
fn rerun_overwrites_results() {
    let snapshot = ModelSnapshot::new(
        "P1",
        vec![
            Node::new("N1", 0.0, 0.0, 0.0).fixed(),
            Node::new("N2", 3.0, 0.0, 0.0),
        ],
        vec![Element::new("E1", "N1", "N2", "W14x90", "Steel")],
        vec![w14x90()],
        vec![Material::new("Steel", E, NU, RHO)],
        vec![LoadCase::new("LC1", "Load")],
        vec![],
        vec![Load::Nodal(NodalLoad::force("N2", "LC1", 0.0, 0.0, -1000.0))],
    )
    .unwrap();

    let store = MemoryStore::new();
    store.insert_project(snapshot);
    store.insert_analysis(analysis("A1", AnalysisKind::LinearStatic, &["LC1"], &[]));

    runner::run(&store, "A1").unwrap();
    let first = store.node_results("A1").len();
    runner::run(&store, "A1").unwrap();
    assert_eq!(store.node_results("A1").len(), first);
}

#[test]
fn p_delta_softens_compressed_column() {
    // Column under axial compression plus a small lateral push: the
    // second-order lateral displacement must exceed the first-order one.
    let build = |kind: AnalysisKind| {
        let snapshot = ModelSnapshot::new(
            "P1",
            vec![
                Node::new("N1", 0.0, 0.0, 0.0).fixed(),
                Node::new("N2", 0.0, 0.0, 4.0),
            ],
            vec![Element::new("E1", "N1", "N2", "Col", "Steel")],
            vec![Section::rectangular("Col", 0.15, 0.15)],
            vec![Material::new("Steel", E, NU, RHO)],
            vec![LoadCase::new("LC1", "Push + weight")],
            vec![],
            vec![Load::Nodal(NodalLoad::force("N2", "LC1", 5_000.0, 0.0, -5.0e5))],
        )
        .unwrap();

        let store = MemoryStore::new();
        store.insert_project(snapshot);
        store.insert_analysis(analysis("A1", kind, &["LC1"], &[]));
        runner::run(&store, "A1").unwrap();

        let case = CaseRef::Case("LC1".into());
        let results = store.node_results("A1");
        node_result(&results, "N2", &case).displacement[0]
    };

    let first_order = build(AnalysisKind::LinearStatic);
    let second_order = build(AnalysisKind::PDelta);

    assert!(second_order > first_order * 1.01, "expected P-Delta amplification");
    assert!(second_order < first_order * 2.0, "column should be far from buckling");
}

#[test]
fn unsupported_kind_is_rejected() {
    let snapshot = ModelSnapshot::new(
        "P1",
        vec![
            Node::new("N1", 0.0, 0.0, 0.0).fixed(),
            Node::new("N2", 3.0, 0.0, 0.0),
        ],
        vec![Element::new("E1", "N1", "N2", "W14x90", "Steel")],
        vec![w14x90()],
        vec![Material::new("Steel", E, NU, RHO)],
        vec![],
        vec![],
        vec![],
    )
    .unwrap();

    let store = MemoryStore::new();
    store.insert_project(snapshot);
    store.insert_analysis(analysis("A1", AnalysisKind::Buckling, &[], &[]));

    let error = runner::run(&store, "A1").unwrap_err();
    assert!(matches!(error, EngineError::UnsupportedAnalysis(_)));
    assert_eq!(store.status("A1").unwrap().state, AnalysisState::Failed);
}
