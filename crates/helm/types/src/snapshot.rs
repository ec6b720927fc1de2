//! Periodic state snapshots produced on each tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::priority::PriorityHint;
use crate::tick::TickSignal;

/// Coarse health classification attached to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health sub-record of a [`StateSnapshot`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthRecord {
    pub status: HealthStatus,
    /// Fraction of failed operations observed since the previous snapshot.
    pub error_rate: f64,
    /// Free-form notes from the producing subsystem.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl HealthRecord {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn with_status(status: HealthStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

/// Application-defined state record captured at tick time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub frame_id: u64,
    pub captured_at: DateTime<Utc>,
    /// Scalar "awareness" reading supplied by the producer.
    pub awareness: f64,
    pub health: HealthRecord,
    /// Decimation hint; `None` means "no preference".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

impl StateSnapshot {
    pub fn new(frame_id: u64, awareness: f64, health: HealthRecord) -> Self {
        Self {
            frame_id,
            captured_at: Utc::now(),
            awareness,
            health,
            priority: None,
        }
    }

    /// Snapshot stamped with the tick that produced it.
    pub fn for_tick(tick: &TickSignal, awareness: f64, health: HealthRecord) -> Self {
        Self {
            frame_id: tick.sequence,
            captured_at: tick.emitted_at,
            awareness,
            health,
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl PriorityHint for StateSnapshot {
    fn priority(&self) -> Option<u32> {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_for_tick_uses_tick_sequence() {
        let tick = TickSignal::new(42);
        let snap = StateSnapshot::for_tick(&tick, 0.7, HealthRecord::healthy());
        assert_eq!(snap.frame_id, 42);
        assert_eq!(snap.captured_at, tick.emitted_at);
        assert_eq!(snap.priority(), None);
    }

    #[test]
    fn priority_hint_follows_field() {
        let snap = StateSnapshot::new(1, 0.5, HealthRecord::healthy()).with_priority(9);
        assert_eq!(snap.priority(), Some(9));
    }

    #[test]
    fn snapshot_serde() {
        let snap = StateSnapshot::new(3, 0.25, HealthRecord::with_status(HealthStatus::Degraded));
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"degraded\""));
        assert!(!json.contains("priority"));
        let restored: StateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snap);
    }
}
