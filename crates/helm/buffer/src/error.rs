use thiserror::Error;

/// Errors from buffer construction. `push` itself never fails.
#[derive(Debug, Error, PartialEq)]
pub enum BufferError {
    #[error("buffer capacity must be positive, got {0}")]
    InvalidCapacity(usize),

    #[error("pressure threshold must lie in (0, 1], got {0}")]
    InvalidPressureThreshold(f64),

    #[error("stats window must be positive, got {0}")]
    InvalidStatsWindow(usize),
}

pub type BufferResult<T> = Result<T, BufferError>;
