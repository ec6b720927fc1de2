use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which half of a drift sample was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorRole {
    Intent,
    Action,
}

impl fmt::Display for VectorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intent => write!(f, "intent"),
            Self::Action => write!(f, "action"),
        }
    }
}

/// Why a drift sample was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VectorFault {
    #[error("vector is empty")]
    Empty,

    #[error("length mismatch: intent has {intent_len} elements, action has {action_len}")]
    LengthMismatch { intent_len: usize, action_len: usize },

    #[error("non-finite value at index {index}")]
    NonFinite { index: usize },
}

/// A malformed (intent, action) pair. Raised before any lane state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {vector} vector: {fault}")]
pub struct InvalidVectorError {
    pub vector: VectorRole,
    pub fault: VectorFault,
}

impl InvalidVectorError {
    pub fn new(vector: VectorRole, fault: VectorFault) -> Self {
        Self { vector, fault }
    }
}

/// Errors from the drift monitor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriftError {
    #[error(transparent)]
    InvalidVector(#[from] InvalidVectorError),

    #[error("invalid drift configuration: {0}")]
    InvalidConfig(String),
}

pub type DriftResult<T> = Result<T, DriftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_names_both_lengths() {
        let e = InvalidVectorError::new(
            VectorRole::Action,
            VectorFault::LengthMismatch {
                intent_len: 3,
                action_len: 2,
            },
        );
        let msg = e.to_string();
        assert!(msg.contains("length mismatch"));
        assert!(msg.contains("action"));
        assert!(msg.contains('3') && msg.contains('2'));
    }

    #[test]
    fn drift_error_is_transparent_for_vectors() {
        let inner = InvalidVectorError::new(VectorRole::Intent, VectorFault::Empty);
        let e: DriftError = inner.clone().into();
        assert_eq!(e.to_string(), inner.to_string());
    }
}
