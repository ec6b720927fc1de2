//! State of a single drift lane.

use chrono::Utc;
use helm_buffer::BoundedBuffer;
use helm_types::LaneId;
use serde::{Deserialize, Serialize};

use crate::config::DriftConfig;
use crate::decision::{DriftReading, DriftRecord, GuardianDecision};
use crate::error::{DriftError, DriftResult, InvalidVectorError};
use crate::metric::{cosine_complement, ema_step, validate_sample};

/// Point-in-time copy of a lane, for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneSnapshot {
    pub lane: LaneId,
    pub ema: f64,
    pub updates: u64,
    pub last_decision: Option<GuardianDecision>,
    /// Retained raw readings, oldest first.
    pub raw_history: Vec<f64>,
}

/// EMA plus bounded raw history for one lane.
///
/// Not synchronized; [`DriftMonitor`](crate::DriftMonitor) serializes access
/// per lane.
pub struct LaneDrift {
    lane: LaneId,
    config: DriftConfig,
    ema: f64,
    updates: u64,
    last_decision: Option<GuardianDecision>,
    history: BoundedBuffer<DriftRecord>,
}

impl LaneDrift {
    pub fn new(lane: LaneId, config: DriftConfig) -> DriftResult<Self> {
        config.validate()?;
        let history = BoundedBuffer::fifo(config.history_capacity)
            .map_err(|e| DriftError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            lane,
            config,
            ema: 0.0,
            updates: 0,
            last_decision: None,
            history,
        })
    }

    pub fn lane(&self) -> &LaneId {
        &self.lane
    }

    pub fn ema(&self) -> f64 {
        self.ema
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn last_decision(&self) -> Option<GuardianDecision> {
        self.last_decision
    }

    /// Fold one (intent, action) sample into the lane.
    ///
    /// On error the lane is left exactly as it was.
    pub fn update(
        &mut self,
        intent: &[f64],
        action: &[f64],
    ) -> Result<DriftReading, InvalidVectorError> {
        validate_sample(intent, action)?;

        let raw = cosine_complement(intent, action);
        let ema = ema_step(self.ema, raw, self.config.alpha);
        let guardian = self.config.classify(ema);

        self.ema = ema;
        self.updates += 1;
        self.last_decision = Some(guardian);
        self.history.push(DriftRecord {
            raw,
            ema,
            guardian,
            recorded_at: Utc::now(),
        });

        Ok(DriftReading {
            lane: self.lane.clone(),
            raw,
            ema,
            guardian,
        })
    }

    pub fn history(&self) -> Vec<DriftRecord> {
        self.history.snapshot().into_iter().map(|e| e.item).collect()
    }

    pub fn raw_history(&self) -> Vec<f64> {
        self.history.snapshot().into_iter().map(|e| e.item.raw).collect()
    }

    pub fn snapshot(&self) -> LaneSnapshot {
        LaneSnapshot {
            lane: self.lane.clone(),
            ema: self.ema,
            updates: self.updates,
            last_decision: self.last_decision,
            raw_history: self.raw_history(),
        }
    }
}
