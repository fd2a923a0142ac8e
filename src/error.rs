//! Error types for the tempo estimator

use thiserror::Error;

use crate::estimator::SessionState;

/// Errors that can occur while configuring or running a tempo estimation
///
/// A clip that is too short (or silent) is not an error: it produces an empty
/// [`EstimationResult`](crate::EstimationResult) and a 0.0 BPM estimate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Invalid input parameters (sample rate, buffer bounds, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation not allowed in the estimator's current state
    #[error("Cannot {operation} while estimator is {state}; call reset() first")]
    InvalidState {
        /// State the estimator was in
        state: SessionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Numerical error (overflow, non-finite intermediate values)
    #[error("Numerical error: {0}")]
    NumericalError(String),
}

impl AnalysisError {
    pub(crate) fn invalid_config<T: Into<String>>(message: T) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub(crate) fn invalid_input<T: Into<String>>(message: T) -> Self {
        Self::InvalidInput(message.into())
    }
}
