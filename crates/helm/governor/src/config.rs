//! Layered configuration: defaults, then an optional file, then `HELM_*` environment.

use helm_buffer::BufferConfig;
use helm_drift::DriftConfig;
use helm_pulse::TickConfig;
use serde::{Deserialize, Serialize};

use crate::error::{GovernorError, GovernorResult};

/// Plan enrichment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Maximum cached tag sets. Zero disables the cache.
    pub cache_capacity: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 4096,
        }
    }
}

/// Caller-side escalation policy for repeated drift warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    pub consecutive_warn_limit: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            consecutive_warn_limit: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Prefix applied to every collector name.
    pub namespace: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: "helm".to_string(),
        }
    }
}

/// Complete configuration for a Helm deployment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HelmConfig {
    pub tick: TickConfig,
    pub buffer: BufferConfig,
    pub drift: DriftConfig,
    pub guard: GuardConfig,
    pub escalation: EscalationConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

impl HelmConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// Environment keys use the `HELM_` prefix and `__` between sections,
    /// e.g. `HELM_DRIFT__ALPHA=0.3`.
    pub fn load(path: Option<&str>) -> GovernorResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&HelmConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("HELM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: HelmConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check every section; the first problem found is returned.
    pub fn validate(&self) -> GovernorResult<()> {
        self.tick.validate()?;
        self.buffer.validate()?;
        self.drift.validate()?;
        if self.escalation.consecutive_warn_limit == 0 {
            return Err(GovernorError::InvalidConfig(
                "escalation.consecutive_warn_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_buffer::DecimationStrategy;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = HelmConfig::default();
        assert_eq!(config.tick.frequency_hz, 10.0);
        assert_eq!(config.tick.max_frequency_hz, 100.0);
        assert_eq!(config.buffer.capacity, 1024);
        assert_eq!(config.buffer.pressure_threshold, 0.8);
        assert_eq!(config.buffer.strategy, DecimationStrategy::Adaptive);
        assert_eq!(config.drift.alpha, 0.2);
        assert_eq!(config.drift.warn_threshold, 0.3);
        assert_eq!(config.drift.block_threshold, 0.6);
        assert_eq!(config.guard.cache_capacity, 4096);
        assert_eq!(config.escalation.consecutive_warn_limit, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[tick]
frequency_hz = 25.0

[buffer]
capacity = 64
strategy = "fifo"

[drift]
alpha = 0.5
"#
        )
        .unwrap();

        let config = HelmConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.tick.frequency_hz, 25.0);
        assert_eq!(config.buffer.capacity, 64);
        assert_eq!(config.buffer.strategy, DecimationStrategy::Fifo);
        assert_eq!(config.drift.alpha, 0.5);
        // Untouched keys keep their defaults.
        assert_eq!(config.drift.warn_threshold, 0.3);
        assert_eq!(config.escalation.consecutive_warn_limit, 3);
    }

    #[test]
    fn invalid_values_rejected_on_load() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[drift]\nwarn_threshold = 0.9\nblock_threshold = 0.5").unwrap();
        assert!(matches!(
            HelmConfig::load(file.path().to_str()),
            Err(GovernorError::Drift(_))
        ));
    }

    #[test]
    fn zero_escalation_limit_rejected() {
        let mut config = HelmConfig::default();
        config.escalation.consecutive_warn_limit = 0;
        assert!(matches!(
            config.validate(),
            Err(GovernorError::InvalidConfig(_))
        ));
    }
}
