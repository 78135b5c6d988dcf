//! Analysis kinds, lifecycle states and run options

use serde::{Deserialize, Serialize};

/// Type of structural analysis to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// First-order linear static analysis
    LinearStatic,
    /// Modal (eigenvalue) analysis for natural frequencies
    Modal,
    /// Second-order P-Delta analysis
    PDelta,
    /// Nonlinear static analysis (not implemented)
    NonlinearStatic,
    /// Response spectrum analysis (not implemented)
    ResponseSpectrum,
    /// Time history analysis (not implemented)
    TimeHistory,
    /// Linearized buckling analysis (not implemented)
    Buckling,
}

impl AnalysisKind {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisKind::LinearStatic => "linear_static",
            AnalysisKind::Modal => "modal",
            AnalysisKind::PDelta => "p_delta",
            AnalysisKind::NonlinearStatic => "nonlinear_static",
            AnalysisKind::ResponseSpectrum => "response_spectrum",
            AnalysisKind::TimeHistory => "time_history",
            AnalysisKind::Buckling => "buckling",
        }
    }
}

impl Default for AnalysisKind {
    fn default() -> Self {
        Self::LinearStatic
    }
}

/// Lifecycle state of an analysis.
///
/// DRAFT -> QUEUED -> RUNNING -> (COMPLETE | FAILED). COMPLETE and FAILED
/// are terminal; only the job host may reset a terminal analysis to DRAFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisState {
    Draft,
    Queued,
    Running,
    Complete,
    Failed,
}

impl AnalysisState {
    /// Whether a transition to `next` is admissible.
    pub fn can_transition(&self, next: AnalysisState) -> bool {
        use AnalysisState::*;
        matches!(
            (self, next),
            (Draft, Queued)
                | (Queued, Running)
                | (Running, Complete)
                | (Running, Failed)
                | (Complete, Draft)
                | (Failed, Draft)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisState::Complete | AnalysisState::Failed)
    }
}

/// Options for structural analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Maximum iterations for P-Delta analysis
    pub max_iterations: usize,
    /// Displacement convergence tolerance for P-Delta (m)
    pub tolerance: f64,
    /// Iteration budget for the eigenvalue solver
    pub eigen_max_iterations: usize,
    /// Relative residual tolerance for the eigenvalue solver
    pub eigen_tolerance: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            tolerance: 1e-6,
            eigen_max_iterations: 300,
            eigen_tolerance: 1e-8,
        }
    }
}

/// Configuration of a single analysis, as read from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSpec {
    pub id: String,
    pub project_id: String,
    pub kind: AnalysisKind,
    /// Load cases to solve (linear static / P-Delta)
    #[serde(default)]
    pub load_case_ids: Vec<String>,
    /// Load combinations to evaluate after the cases are solved
    #[serde(default)]
    pub load_combination_ids: Vec<String>,
    /// Number of modes to extract (modal analysis)
    #[serde(default)]
    pub num_modes: Option<usize>,
    #[serde(default)]
    pub options: AnalysisOptions,
}
