//! framesolve - a native Rust 3D frame structural analysis engine
//!
//! Frame models of straight prismatic members are solved for nodal
//! displacements, support reactions, internal member forces/stresses and
//! natural modes:
//! - Linear static analysis per load case, with load-combination
//!   superposition
//! - P-Delta (second order) analysis
//! - Modal analysis via a generalized symmetric-definite eigensolver
//!
//! The numerical core is a pure function of an immutable [`model::ModelSnapshot`];
//! persistence sits behind the [`store::ModelStore`] trait and the
//! [`runner`] drives an analysis from snapshot to committed results.
//!
//! ## Example
//! ```no_run
//! use framesolve::prelude::*;
//!
//! let snapshot = ModelSnapshot::new(
//!     "P1",
//!     vec![
//!         Node::new("N1", 0.0, 0.0, 0.0).fixed(),
//!         Node::new("N2", 3.0, 0.0, 0.0),
//!     ],
//!     vec![Element::new("E1", "N1", "N2", "W310", "Steel")],
//!     vec![Section::wide_flange("W310", 0.31, 0.25, 0.016, 0.009)],
//!     vec![Material::steel("Steel")],
//!     vec![LoadCase::new("LC1", "Dead")],
//!     vec![],
//!     vec![Load::Nodal(NodalLoad::force("N2", "LC1", 0.0, 0.0, -1000.0))],
//! )
//! .unwrap();
//!
//! let store = MemoryStore::new();
//! store.insert_project(snapshot);
//! store.insert_analysis(AnalysisSpec {
//!     id: "A1".into(),
//!     project_id: "P1".into(),
//!     kind: AnalysisKind::LinearStatic,
//!     load_case_ids: vec!["LC1".into()],
//!     load_combination_ids: vec![],
//!     num_modes: None,
//!     options: Default::default(),
//! });
//!
//! let outcome = framesolve::runner::run(&store, "A1").unwrap();
//! assert_eq!(outcome.node_results, 2);
//! ```

pub mod analysis;
pub mod assembly;
pub mod combine;
pub mod dof;
pub mod error;
pub mod math;
pub mod model;
pub mod results;
pub mod runner;
pub mod solver;
pub mod store;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{AnalysisKind, AnalysisOptions, AnalysisSpec, AnalysisState};
    pub use crate::dof::DofMap;
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::model::{
        DistributedLoad, Element, EndReleases, Load, LoadCase, LoadCombination, Material,
        ModelSnapshot, NodalLoad, Node, Section,
    };
    pub use crate::results::{CaseRef, ElementResult, ModalResult, NodeResult};
    pub use crate::runner::{run, RunControl, RunOutcome};
    pub use crate::solver::Engine;
    pub use crate::store::{JsonProjectStore, MemoryStore, ModelStore};
}
