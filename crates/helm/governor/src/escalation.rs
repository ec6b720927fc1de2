//! Caller-side warn escalation.

use dashmap::DashMap;
use helm_drift::GuardianDecision;
use helm_types::LaneId;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where a lane stands after observing one guardian decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EscalationState {
    /// Last decision was not a warning.
    Clear,
    /// Consecutive warnings so far, below the limit.
    Counting { consecutive: u32, limit: u32 },
    /// The limit was reached; the counter has been reset and the action needs
    /// external review.
    Escalated { consecutive: u32 },
}

impl EscalationState {
    pub fn is_escalated(&self) -> bool {
        matches!(self, Self::Escalated { .. })
    }
}

/// Counts consecutive `warn` decisions per lane.
pub struct EscalationTracker {
    limit: u32,
    streaks: DashMap<LaneId, u32>,
}

impl EscalationTracker {
    /// `limit` is clamped to at least 1.
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
            streaks: DashMap::new(),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn observe(&self, lane: &LaneId, decision: GuardianDecision) -> EscalationState {
        if decision != GuardianDecision::Warn {
            self.streaks.remove(lane);
            return EscalationState::Clear;
        }

        let mut streak = self.streaks.entry(lane.clone()).or_insert(0);
        *streak += 1;
        let consecutive = *streak;
        if consecutive >= self.limit {
            *streak = 0;
            drop(streak);
            warn!(%lane, consecutive, "repeated drift warnings escalated for review");
            EscalationState::Escalated { consecutive }
        } else {
            EscalationState::Counting {
                consecutive,
                limit: self.limit,
            }
        }
    }

    /// Current warn streak for `lane`.
    pub fn pending(&self, lane: &LaneId) -> u32 {
        self.streaks.get(lane).map(|s| *s).unwrap_or(0)
    }

    pub fn reset(&self, lane: &LaneId) {
        self.streaks.remove(lane);
    }
}
