use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BufferError, BufferResult};

/// Default buffer capacity (entries).
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default occupancy fraction at which decimation starts.
pub const DEFAULT_PRESSURE_THRESHOLD: f64 = 0.8;

/// Default number of recent operations the backpressure window covers.
pub const DEFAULT_STATS_WINDOW: usize = 512;

/// How the buffer sheds load once it is under pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimationStrategy {
    /// Evict the single oldest entry, and only when the buffer is full.
    Fifo,
    /// Under pressure, evict the oldest entry whose priority is strictly below
    /// the median priority of buffered entries. Falls back to `Fifo` when the
    /// buffer is full and no such entry exists.
    #[default]
    Adaptive,
}

impl fmt::Display for DecimationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => write!(f, "fifo"),
            Self::Adaptive => write!(f, "adaptive"),
        }
    }
}

/// Construction parameters for a [`BoundedBuffer`](crate::BoundedBuffer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub capacity: usize,
    /// Fraction of capacity in (0, 1] at which decimation kicks in.
    pub pressure_threshold: f64,
    pub strategy: DecimationStrategy,
    /// Number of recent accept/evict events used for `drop_rate`.
    pub stats_window: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            pressure_threshold: DEFAULT_PRESSURE_THRESHOLD,
            strategy: DecimationStrategy::default(),
            stats_window: DEFAULT_STATS_WINDOW,
        }
    }
}

impl BufferConfig {
    pub fn new(capacity: usize, pressure_threshold: f64, strategy: DecimationStrategy) -> Self {
        Self {
            capacity,
            pressure_threshold,
            strategy,
            ..Self::default()
        }
    }

    /// Plain FIFO buffer that only evicts when full.
    pub fn fifo(capacity: usize) -> Self {
        Self::new(capacity, 1.0, DecimationStrategy::Fifo)
    }

    pub fn with_stats_window(mut self, window: usize) -> Self {
        self.stats_window = window;
        self
    }

    pub fn validate(&self) -> BufferResult<()> {
        if self.capacity == 0 {
            return Err(BufferError::InvalidCapacity(self.capacity));
        }
        // NaN fails both comparisons.
        if !(self.pressure_threshold > 0.0 && self.pressure_threshold <= 1.0) {
            return Err(BufferError::InvalidPressureThreshold(self.pressure_threshold));
        }
        if self.stats_window == 0 {
            return Err(BufferError::InvalidStatsWindow(self.stats_window));
        }
        Ok(())
    }

    /// Whether `occupancy` entries put the buffer under pressure.
    pub fn is_under_pressure(&self, occupancy: usize) -> bool {
        occupancy as f64 >= self.capacity as f64 * self.pressure_threshold
    }
}
