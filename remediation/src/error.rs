//! Request-level error taxonomy.
//!
//! Only `NotFound` and `InvalidState` ever surface to callers. Diagnosis
//! failures are recovered with the fail-safe default, and actuator failures
//! are captured as failed resolutions, so the audit trail stays complete.

use crate::registry::RegistryError;

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unknown event or action id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation not valid for the entity's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Unexpected internal failure (poisoned lock, missing invariant).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<RegistryError> for EngineError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::EventNotFound(_) | RegistryError::ActionNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            RegistryError::StatusConflict { .. }
            | RegistryError::ActionStatusConflict { .. }
            | RegistryError::ResolutionExists(_)
            | RegistryError::MissingDiagnosis(_) => Self::InvalidState(err.to_string()),
            RegistryError::LockPoisoned => Self::Internal(err.to_string()),
        }
    }
}
