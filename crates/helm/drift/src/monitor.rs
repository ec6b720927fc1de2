//! Lane-keyed drift monitor.

use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use helm_types::LaneId;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::DriftConfig;
use crate::decision::{DriftReading, GuardianDecision, GuardianEvent};
use crate::error::DriftResult;
use crate::lane::{LaneDrift, LaneSnapshot};
use crate::metric::validate_sample;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

struct LaneCell {
    drift: LaneDrift,
    /// Set by `reset_lane` once the cell is no longer reachable from the map.
    retired: bool,
}

type LaneSlot = Arc<Mutex<LaneCell>>;

/// Tracks intent/action drift for any number of isolated lanes.
///
/// Each lane sits behind its own mutex: updates to different lanes never
/// contend, updates to the same lane are serialized. Lanes are created on
/// first successful update.
pub struct DriftMonitor {
    config: DriftConfig,
    lanes: DashMap<LaneId, LaneSlot>,
    events: broadcast::Sender<GuardianEvent>,
}

impl DriftMonitor {
    pub fn new(config: DriftConfig) -> DriftResult<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            config,
            lanes: DashMap::new(),
            events,
        })
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Fold an (intent, action) sample into `lane` and classify the result.
    ///
    /// Fails with [`DriftError::InvalidVector`](crate::DriftError::InvalidVector)
    /// on a malformed sample, in which case no lane is created or changed.
    pub fn update(&self, lane: &LaneId, intent: &[f64], action: &[f64]) -> DriftResult<DriftReading> {
        validate_sample(intent, action)?;

        let (reading, lane_update) = loop {
            let slot = self.slot_or_create(lane)?;
            if let Some(applied) = apply(&slot, intent, action)? {
                break applied;
            }
            debug!(%lane, "drift lane reset during update, retrying");
        };

        match reading.guardian {
            GuardianDecision::Allow => {
                debug!(%lane, raw = reading.raw, ema = reading.ema, "drift within bounds")
            }
            GuardianDecision::Warn | GuardianDecision::Block => warn!(
                %lane,
                raw = reading.raw,
                ema = reading.ema,
                guardian = %reading.guardian,
                "drift threshold crossed"
            ),
        }

        // No receivers is fine.
        let _ = self.events.send(GuardianEvent {
            reading: reading.clone(),
            lane_update,
            at: Utc::now(),
        });

        Ok(reading)
    }

    /// Stream of every successful update, across all lanes.
    pub fn subscribe(&self) -> broadcast::Receiver<GuardianEvent> {
        self.events.subscribe()
    }

    pub fn ema(&self, lane: &LaneId) -> Option<f64> {
        self.slot(lane).map(|slot| slot.lock().drift.ema())
    }

    pub fn lane_snapshot(&self, lane: &LaneId) -> Option<LaneSnapshot> {
        self.slot(lane).map(|slot| slot.lock().drift.snapshot())
    }

    /// Known lanes, sorted.
    pub fn lanes(&self) -> Vec<LaneId> {
        let mut lanes: Vec<LaneId> = self.lanes.iter().map(|e| e.key().clone()).collect();
        lanes.sort();
        lanes
    }

    /// Forget a lane entirely. The next update starts again from zero.
    ///
    /// An update racing the reset lands either before it (and is discarded
    /// with the lane) or on the fresh lane, never on the removed state.
    pub fn reset_lane(&self, lane: &LaneId) -> bool {
        match self.lanes.remove(lane) {
            Some((_, slot)) => {
                slot.lock().retired = true;
                debug!(%lane, "drift lane reset");
                true
            }
            None => false,
        }
    }

    fn slot(&self, lane: &LaneId) -> Option<LaneSlot> {
        self.lanes.get(lane).map(|entry| Arc::clone(entry.value()))
    }

    fn slot_or_create(&self, lane: &LaneId) -> DriftResult<LaneSlot> {
        match self.lanes.entry(lane.clone()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let drift = LaneDrift::new(lane.clone(), self.config.clone())?;
                debug!(%lane, "drift lane created");
                let cell = LaneCell {
                    drift,
                    retired: false,
                };
                Ok(Arc::clone(entry.insert(Arc::new(Mutex::new(cell))).value()))
            }
        }
    }
}

/// Apply a validated sample to `slot`. `None` when the lane was reset after
/// the slot was looked up.
fn apply(
    slot: &Mutex<LaneCell>,
    intent: &[f64],
    action: &[f64],
) -> DriftResult<Option<(DriftReading, u64)>> {
    let mut cell = slot.lock();
    if cell.retired {
        return Ok(None);
    }
    let reading = cell.drift.update(intent, action)?;
    Ok(Some((reading, cell.drift.updates())))
}
