//! Error types raised by the computation engines

use miette::Diagnostic;
use thiserror::Error;

/// Failure of a deterministic computation.
///
/// Only non-positive denominators are errors. Metrics that simply have no
/// value for the inputs (break-even with a non-positive margin, IRR without
/// a root, payback beyond the horizon) are reported as `None` instead.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum ModelError {
    #[error("invalid input: {field} must be {requirement} (got {value})")]
    #[diagnostic(
        code(pbfe::input::invalid),
        help("check the job file; this value is used as a divisor")
    )]
    InvalidInput {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },
}

impl ModelError {
    /// Fail unless `value > 0`
    pub fn require_positive(field: &'static str, value: f64) -> Result<f64, ModelError> {
        if value > 0.0 && value.is_finite() {
            Ok(value)
        } else {
            Err(ModelError::InvalidInput {
                field,
                requirement: "greater than zero",
                value,
            })
        }
    }

    /// Fail unless the integer count is at least one
    pub fn require_nonzero(field: &'static str, value: u32) -> Result<u32, ModelError> {
        if value >= 1 {
            Ok(value)
        } else {
            Err(ModelError::InvalidInput {
                field,
                requirement: "at least 1",
                value: f64::from(value),
            })
        }
    }

    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            ModelError::InvalidInput { field, .. } => field,
        }
    }
}

/// Failure of a Monte Carlo run as a whole.
///
/// Per-iteration IRR and payback gaps are not failures; they shorten the
/// corresponding output sequence instead.
#[derive(Debug, Error, Diagnostic)]
pub enum SimulationError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error("simulation cancelled after {completed} of {requested} iterations")]
    #[diagnostic(code(pbfe::simulation::cancelled))]
    Cancelled { completed: u64, requested: u64 },

    #[error("failed to start worker pool: {0}")]
    #[diagnostic(code(pbfe::simulation::worker_pool))]
    WorkerPool(String),

    #[error("simulation needs at least one iteration")]
    #[diagnostic(code(pbfe::simulation::no_iterations))]
    NoIterations,
}
