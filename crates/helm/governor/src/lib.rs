#![deny(unsafe_code)]
//! # helm-governor
//!
//! The caller side of the governance core. Components below this crate
//! report; this crate decides.
//!
//! ```text
//!                   ┌──────────────────── ActionGate ────────────────────┐
//!   ActionRequest ──┤ TagEnricher ─► RiskDecisionEngine ─┐               │
//!                   │                                    ├─► GateDecision│
//!                   │ DriftMonitor ─► EscalationTracker ─┘               │
//!                   └────────────────────────────────────────────────────┘
//!
//!   SnapshotPipeline: TickScheduler ─► SnapshotRecorder ─► BoundedBuffer
//! ```
//!
//! Also here: layered [`HelmConfig`] loading, [`init_tracing`], and the
//! Prometheus [`GovernanceMetrics`].

pub mod config;
pub mod error;
pub mod escalation;
pub mod gate;
pub mod metrics;
pub mod runtime;
pub mod telemetry;

pub use crate::config::{
    EscalationConfig, GuardConfig, HelmConfig, LoggingConfig, MetricsConfig,
};
pub use error::{GovernorError, GovernorResult};
pub use escalation::{EscalationState, EscalationTracker};
pub use gate::{ActionGate, ActionRequest, DriftSample, GateDecision, GateEvaluation};
pub use metrics::GovernanceMetrics;
pub use runtime::SnapshotPipeline;
pub use telemetry::init_tracing;
