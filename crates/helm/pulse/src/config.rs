use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{SchedulerError, SchedulerResult};

/// Hard ceiling on the firing rate, whatever the configuration asks for.
pub const MAX_TICK_FREQUENCY_HZ: f64 = 100.0;

/// Default target frequency.
pub const DEFAULT_TICK_FREQUENCY_HZ: f64 = 10.0;

/// Tick scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Requested ticks per second.
    #[serde(default = "default_frequency")]
    pub frequency_hz: f64,
    /// Deployment-specific cap. Can lower [`MAX_TICK_FREQUENCY_HZ`], never raise it.
    #[serde(default = "default_cap")]
    pub max_frequency_hz: f64,
}

fn default_frequency() -> f64 {
    DEFAULT_TICK_FREQUENCY_HZ
}

fn default_cap() -> f64 {
    MAX_TICK_FREQUENCY_HZ
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_TICK_FREQUENCY_HZ,
            max_frequency_hz: MAX_TICK_FREQUENCY_HZ,
        }
    }
}

impl TickConfig {
    pub fn with_frequency(frequency_hz: f64) -> Self {
        Self {
            frequency_hz,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        for hz in [self.frequency_hz, self.max_frequency_hz] {
            if !hz.is_finite() || hz <= 0.0 {
                return Err(SchedulerError::InvalidFrequency(hz));
            }
        }
        Ok(())
    }

    /// Requested frequency after applying both caps.
    pub fn effective_frequency_hz(&self) -> f64 {
        self.frequency_hz
            .min(self.max_frequency_hz)
            .min(MAX_TICK_FREQUENCY_HZ)
    }

    pub fn is_capped(&self) -> bool {
        self.effective_frequency_hz() < self.frequency_hz
    }

    /// Interval between ticks at the effective frequency.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.effective_frequency_hz())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_period_is_100ms() {
        let config = TickConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.period(), Duration::from_millis(100));
    }

    #[test]
    fn frequency_is_capped() {
        let config = TickConfig::with_frequency(10_000.0);
        assert_eq!(config.effective_frequency_hz(), MAX_TICK_FREQUENCY_HZ);
        assert!(config.is_capped());
        assert_eq!(config.period(), Duration::from_millis(10));
    }

    #[test]
    fn configured_cap_cannot_exceed_hard_cap() {
        let config = TickConfig {
            frequency_hz: 500.0,
            max_frequency_hz: 1_000.0,
        };
        assert_eq!(config.effective_frequency_hz(), MAX_TICK_FREQUENCY_HZ);

        let lowered = TickConfig {
            frequency_hz: 50.0,
            max_frequency_hz: 20.0,
        };
        assert_eq!(lowered.effective_frequency_hz(), 20.0);
    }

    #[test]
    fn rejects_non_positive_or_nan() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(TickConfig::with_frequency(bad).validate().is_err());
        }
    }
}
