//! Errors of the arm environment.
use thiserror::Error;

/// Errors raised by the control core and its backends.
///
/// Functions of this crate return [`anyhow::Result`]; use
/// `err.downcast_ref::<ArmEnvError>()` to discriminate the cases below.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArmEnvError {
    /// A vector does not have the configured length. Not recoverable.
    #[error("Shape mismatch of {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Name of the offending vector.
        what: String,
        /// Configured length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// The arm service did not answer in time or is disconnected.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A feed has not delivered the requested data yet.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Object placement did not find a valid pose within the retry cap.
    #[error("Goal sampling failed after {attempts} attempts")]
    GoalSamplingFailed {
        /// Number of draws made.
        attempts: usize,
    },

    /// An operation was called in a lifecycle state that does not allow it.
    #[error("Not ready: {0}")]
    NotReady(String),

    /// The backend does not know an entity (body, site, joint or mocap).
    #[error("Unknown name: {0}")]
    UnknownName(String),
}

impl ArmEnvError {
    /// Shorthand of [`ArmEnvError::ShapeMismatch`].
    pub fn shape(what: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected,
            got,
        }
    }
}
