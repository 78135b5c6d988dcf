//! Error types for the analysis engine

use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// A referenced entity does not exist in the store or snapshot.
    #[error("referenced {kind} '{id}' not found")]
    ModelMissing { kind: &'static str, id: String },

    /// The model references existing entities but their data is unusable
    /// (dangling refs, non-positive properties, zero-length elements).
    #[error("model inconsistent: {0}")]
    ModelInconsistent(String),

    #[error("analysis kind '{0}' is not supported")]
    UnsupportedAnalysis(String),

    /// The reduced stiffness matrix could not be factored; the model is a
    /// mechanism or has insufficient supports.
    #[error("singular stiffness matrix - model may be a mechanism or have insufficient supports")]
    Singular,

    #[error("eigenvalue solver failed to converge within {0} iterations")]
    EigenNoConverge(usize),

    #[error("run cancelled")]
    Cancelled,

    #[error("run exceeded its deadline")]
    Timeout,

    /// Persistence layer failure. Retriable by the job host, never inside
    /// the engine.
    #[error("store failure: {0}")]
    Store(String),
}

impl EngineError {
    /// Stable short name recorded against a FAILED analysis.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::ModelMissing { .. } => "model_missing",
            EngineError::ModelInconsistent(_) => "model_inconsistent",
            EngineError::UnsupportedAnalysis(_) => "unsupported_analysis",
            EngineError::Singular => "singular",
            EngineError::EigenNoConverge(_) => "eigen_no_converge",
            EngineError::Cancelled => "cancelled",
            EngineError::Timeout => "timeout",
            EngineError::Store(_) => "store_failure",
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
