use serde::{Deserialize, Serialize};

use crate::decision::GuardianDecision;
use crate::error::{DriftError, DriftResult};

pub const DEFAULT_ALPHA: f64 = 0.2;
pub const DEFAULT_WARN_THRESHOLD: f64 = 0.3;
pub const DEFAULT_BLOCK_THRESHOLD: f64 = 0.6;
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

/// Smoothing factor, decision thresholds and history bound shared by every lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// EMA smoothing factor in (0, 1].
    pub alpha: f64,
    pub warn_threshold: f64,
    pub block_threshold: f64,
    /// Raw readings retained per lane.
    pub history_capacity: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            warn_threshold: DEFAULT_WARN_THRESHOLD,
            block_threshold: DEFAULT_BLOCK_THRESHOLD,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl DriftConfig {
    pub fn new(alpha: f64, warn_threshold: f64, block_threshold: f64) -> Self {
        Self {
            alpha,
            warn_threshold,
            block_threshold,
            ..Self::default()
        }
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn validate(&self) -> DriftResult<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(DriftError::InvalidConfig(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if !(self.warn_threshold > 0.0
            && self.warn_threshold < self.block_threshold
            && self.block_threshold <= 1.0)
        {
            return Err(DriftError::InvalidConfig(format!(
                "thresholds must satisfy 0 < warn < block <= 1, got warn={} block={}",
                self.warn_threshold, self.block_threshold
            )));
        }
        if self.history_capacity == 0 {
            return Err(DriftError::InvalidConfig(
                "history_capacity must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Map a smoothed drift value onto a guardian decision.
    pub fn classify(&self, ema: f64) -> GuardianDecision {
        if ema >= self.block_threshold {
            GuardianDecision::Block
        } else if ema >= self.warn_threshold {
            GuardianDecision::Warn
        } else {
            GuardianDecision::Allow
        }
    }
}
