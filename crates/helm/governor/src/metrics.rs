//! Prometheus collectors for the governance core.

use helm_buffer::BackpressureStats;
use helm_drift::DriftReading;
use helm_guard::PlanVerdict;
use helm_pulse::TickRunSummary;
use helm_types::LaneId;
use prometheus::{
    Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

use crate::gate::GateDecision;

/// Collectors for guardian decisions, risk verdicts, escalations and buffer pressure.
pub struct GovernanceMetrics {
    pub guardian_decisions_total: IntCounterVec,
    pub drift_ema: HistogramVec,
    pub risk_recommendations_total: IntCounterVec,
    pub escalations_total: IntCounterVec,
    pub gate_decisions_total: IntCounterVec,
    pub buffer_occupancy: IntGauge,
    pub buffer_utilization: Gauge,
    pub buffer_drop_rate: Gauge,
    pub ticks_total: IntCounter,
    pub subscriber_failures_total: IntCounter,
}

impl GovernanceMetrics {
    /// Create the collectors under `namespace` and register them on `registry`.
    pub fn new(registry: &Registry, namespace: &str) -> prometheus::Result<Self> {
        let guardian_decisions_total = IntCounterVec::new(
            Opts::new("guardian_decisions_total", "Drift guardian decisions").namespace(namespace),
            &["lane", "decision"],
        )?;
        registry.register(Box::new(guardian_decisions_total.clone()))?;

        let drift_ema = HistogramVec::new(
            HistogramOpts::new("drift_ema", "Smoothed drift after each update")
                .namespace(namespace)
                .buckets(vec![0.05, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
            &["lane"],
        )?;
        registry.register(Box::new(drift_ema.clone()))?;

        let risk_recommendations_total = IntCounterVec::new(
            Opts::new("risk_recommendations_total", "Risk engine recommendations")
                .namespace(namespace),
            &["recommendation", "risk_level"],
        )?;
        registry.register(Box::new(risk_recommendations_total.clone()))?;

        let escalations_total = IntCounterVec::new(
            Opts::new("escalations_total", "Warn streaks escalated for review").namespace(namespace),
            &["lane"],
        )?;
        registry.register(Box::new(escalations_total.clone()))?;

        let gate_decisions_total = IntCounterVec::new(
            Opts::new("gate_decisions_total", "Combined action gate outcomes").namespace(namespace),
            &["outcome"],
        )?;
        registry.register(Box::new(gate_decisions_total.clone()))?;

        let buffer_occupancy = IntGauge::with_opts(
            Opts::new("buffer_occupancy", "Snapshots currently buffered").namespace(namespace),
        )?;
        registry.register(Box::new(buffer_occupancy.clone()))?;

        let buffer_utilization = Gauge::with_opts(
            Opts::new("buffer_utilization", "Buffer occupancy over capacity").namespace(namespace),
        )?;
        registry.register(Box::new(buffer_utilization.clone()))?;

        let buffer_drop_rate = Gauge::with_opts(
            Opts::new("buffer_drop_rate", "Evictions over recent buffer operations")
                .namespace(namespace),
        )?;
        registry.register(Box::new(buffer_drop_rate.clone()))?;

        let ticks_total = IntCounter::with_opts(
            Opts::new("ticks_total", "Scheduler ticks fired").namespace(namespace),
        )?;
        registry.register(Box::new(ticks_total.clone()))?;

        let subscriber_failures_total = IntCounter::with_opts(
            Opts::new("subscriber_failures_total", "Tick subscriber errors and panics")
                .namespace(namespace),
        )?;
        registry.register(Box::new(subscriber_failures_total.clone()))?;

        Ok(Self {
            guardian_decisions_total,
            drift_ema,
            risk_recommendations_total,
            escalations_total,
            gate_decisions_total,
            buffer_occupancy,
            buffer_utilization,
            buffer_drop_rate,
            ticks_total,
            subscriber_failures_total,
        })
    }

    pub fn record_drift(&self, reading: &DriftReading) {
        let lane = reading.lane.as_str();
        self.guardian_decisions_total
            .with_label_values(&[lane, reading.guardian.as_str()])
            .inc();
        self.drift_ema.with_label_values(&[lane]).observe(reading.ema);
    }

    pub fn record_verdict(&self, verdict: &PlanVerdict) {
        let level = verdict.risk_level.to_string();
        self.risk_recommendations_total
            .with_label_values(&[verdict.recommendation.as_str(), level.as_str()])
            .inc();
    }

    pub fn record_escalation(&self, lane: &LaneId) {
        self.escalations_total.with_label_values(&[lane.as_str()]).inc();
    }

    pub fn record_gate(&self, decision: &GateDecision) {
        self.gate_decisions_total
            .with_label_values(&[decision.outcome()])
            .inc();
    }

    pub fn observe_buffer(&self, stats: &BackpressureStats) {
        self.buffer_occupancy.set(stats.occupancy as i64);
        self.buffer_utilization.set(stats.utilization);
        self.buffer_drop_rate.set(stats.drop_rate);
    }

    pub fn record_tick_run(&self, summary: &TickRunSummary) {
        self.ticks_total.inc_by(summary.ticks);
        self.subscriber_failures_total
            .inc_by(summary.subscriber_failures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_drift::GuardianDecision;

    #[test]
    fn registers_under_namespace() {
        let registry = Registry::new();
        let metrics = GovernanceMetrics::new(&registry, "helm").unwrap();
        metrics.record_drift(&DriftReading {
            lane: LaneId::new("prod"),
            raw: 1.0,
            ema: 0.36,
            guardian: GuardianDecision::Warn,
        });
        metrics.record_escalation(&LaneId::new("prod"));

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"helm_guardian_decisions_total".to_string()));
        assert!(names.contains(&"helm_drift_ema".to_string()));
        assert!(names.contains(&"helm_escalations_total".to_string()));
        assert_eq!(
            metrics
                .guardian_decisions_total
                .with_label_values(&["prod", "warn"])
                .get(),
            1
        );
    }

    #[test]
    fn double_registration_is_an_error() {
        let registry = Registry::new();
        GovernanceMetrics::new(&registry, "helm").unwrap();
        assert!(GovernanceMetrics::new(&registry, "helm").is_err());
    }
}
