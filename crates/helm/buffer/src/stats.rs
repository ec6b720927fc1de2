//! Rolling backpressure accounting.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::DecimationStrategy;

/// One buffer event as seen by the rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowEvent {
    Accepted,
    Evicted,
}

/// Counts over the last `size` events only, so the drop rate tracks current
/// load instead of converging to a lifetime average.
#[derive(Debug, Clone)]
pub(crate) struct RollingWindow {
    events: VecDeque<WindowEvent>,
    size: usize,
    accepted: u64,
    evicted: u64,
}

impl RollingWindow {
    pub(crate) fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            events: VecDeque::with_capacity(size),
            size,
            accepted: 0,
            evicted: 0,
        }
    }

    pub(crate) fn record(&mut self, event: WindowEvent) {
        if self.events.len() == self.size {
            match self.events.pop_front() {
                Some(WindowEvent::Accepted) => self.accepted -= 1,
                Some(WindowEvent::Evicted) => self.evicted -= 1,
                None => {}
            }
        }
        match event {
            WindowEvent::Accepted => self.accepted += 1,
            WindowEvent::Evicted => self.evicted += 1,
        }
        self.events.push_back(event);
    }

    pub(crate) fn accepted(&self) -> u64 {
        self.accepted
    }

    pub(crate) fn evicted(&self) -> u64 {
        self.evicted
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// `evicted / (evicted + accepted)` over the window, 0 when empty.
    pub(crate) fn drop_rate(&self) -> f64 {
        let total = self.accepted + self.evicted;
        if total == 0 {
            0.0
        } else {
            self.evicted as f64 / total as f64
        }
    }
}

/// Point-in-time view of buffer pressure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackpressureStats {
    pub occupancy: usize,
    pub capacity: usize,
    /// `occupancy / capacity`.
    pub utilization: f64,
    /// Evictions over evictions plus acceptances, within the rolling window.
    pub drop_rate: f64,
    pub window_size: usize,
    pub window_accepted: u64,
    pub window_evicted: u64,
    pub total_accepted: u64,
    pub total_evicted: u64,
    pub under_pressure: bool,
    pub strategy: DecimationStrategy,
}
