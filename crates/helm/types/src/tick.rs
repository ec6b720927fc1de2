use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single scheduler heartbeat.
///
/// `sequence` starts at 1 for every scheduling run and increases by exactly
/// one per fired tick. Ticks skipped because the loop fell behind do not
/// consume a sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSignal {
    pub sequence: u64,
    pub emitted_at: DateTime<Utc>,
}

impl TickSignal {
    pub fn new(sequence: u64) -> Self {
        Self {
            sequence,
            emitted_at: Utc::now(),
        }
    }
}

impl fmt::Display for TickSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick#{}", self.sequence)
    }
}
