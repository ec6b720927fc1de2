use chrono::{DateTime, Utc};
use helm_types::{LaneId, PriorityHint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Graduated outcome of a drift update. Ordered from most to least permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardianDecision {
    Allow,
    Warn,
    /// The in-flight action must not execute.
    Block,
}

impl GuardianDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Block => "block",
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Block)
    }
}

impl fmt::Display for GuardianDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one `update` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReading {
    pub lane: LaneId,
    /// Divergence of this sample alone, in [0, 1].
    pub raw: f64,
    /// Smoothed drift after folding in `raw`.
    pub ema: f64,
    pub guardian: GuardianDecision,
}

/// One retained entry of a lane's raw history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftRecord {
    pub raw: f64,
    pub ema: f64,
    pub guardian: GuardianDecision,
    pub recorded_at: DateTime<Utc>,
}

// History is plain FIFO.
impl PriorityHint for DriftRecord {}

/// Published on the monitor's decision stream after every successful update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianEvent {
    pub reading: DriftReading,
    /// Position of this update within its lane, starting at 1.
    pub lane_update: u64,
    pub at: DateTime<Utc>,
}
