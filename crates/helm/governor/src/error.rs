use helm_buffer::BufferError;
use helm_drift::DriftError;
use helm_guard::GuardError;
use helm_pulse::SchedulerError;
use thiserror::Error;

/// Errors surfaced by the governor layer.
///
/// Guardian and risk rejections are not errors; they come back as
/// [`GateDecision`](crate::GateDecision) values.
#[derive(Debug, Error)]
pub enum GovernorError {
    #[error("drift: {0}")]
    Drift(#[from] DriftError),

    #[error("plan enrichment: {0}")]
    Guard(#[from] GuardError),

    #[error("buffer: {0}")]
    Buffer(#[from] BufferError),

    #[error("scheduler: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("telemetry: {0}")]
    Telemetry(String),
}

pub type GovernorResult<T> = Result<T, GovernorError>;
