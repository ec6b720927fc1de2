use thiserror::Error;

/// Errors from scheduler configuration and lifecycle.
#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("tick frequency must be finite and positive, got {0} Hz")]
    InvalidFrequency(f64),

    #[error("scheduler is already running")]
    AlreadyRunning,
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Failure reported by a tick subscriber. Logged and counted, never propagated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct SubscriberError {
    pub message: String,
}

impl SubscriberError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
