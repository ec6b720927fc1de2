//! Snapshot pipeline: scheduler, recorder and buffer wired from configuration.

use std::sync::Arc;
use std::time::Duration;

use helm_buffer::{BackpressureStats, BoundedBuffer};
use helm_pulse::{SnapshotRecorder, SnapshotSource, TickRunSummary, TickScheduler, TickSubscriber};
use helm_types::StateSnapshot;
use tracing::info;

use crate::config::HelmConfig;
use crate::error::GovernorResult;
use crate::metrics::GovernanceMetrics;

/// Periodically captures state snapshots into a shared bounded buffer.
///
/// ```text
///   TickScheduler ──► SnapshotRecorder<S> ──push──► BoundedBuffer ◄──drain── consumer
/// ```
pub struct SnapshotPipeline<S> {
    scheduler: Arc<TickScheduler>,
    buffer: Arc<BoundedBuffer<StateSnapshot>>,
    recorder: Arc<SnapshotRecorder<S>>,
    metrics: Option<Arc<GovernanceMetrics>>,
}

impl<S: SnapshotSource + 'static> SnapshotPipeline<S> {
    pub fn new(config: &HelmConfig, source: S) -> GovernorResult<Self> {
        let scheduler = Arc::new(TickScheduler::new(config.tick.clone())?);
        let buffer = Arc::new(BoundedBuffer::new(config.buffer.clone())?);
        let recorder = Arc::new(SnapshotRecorder::new(
            "state-snapshot",
            source,
            Arc::clone(&buffer),
        ));
        scheduler.subscribe(recorder.clone());

        Ok(Self {
            scheduler,
            buffer,
            recorder,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<GovernanceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Add another subscriber. It is dispatched after the snapshot recorder on
    /// every tick; dispatched invocations run concurrently.
    pub fn subscribe(&self, subscriber: Arc<dyn TickSubscriber>) {
        self.scheduler.subscribe(subscriber);
    }

    /// Run for `duration` (zero: until [`stop`](Self::stop)).
    pub async fn run(&self, duration: Duration) -> GovernorResult<TickRunSummary> {
        let summary = self.scheduler.start(duration).await?;
        let stats = self.buffer.backpressure_stats();
        info!(
            ticks = summary.ticks,
            recorded = self.recorder.recorded(),
            occupancy = stats.occupancy,
            drop_rate = stats.drop_rate,
            "snapshot pipeline run finished"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_tick_run(&summary);
            metrics.observe_buffer(&stats);
        }
        Ok(summary)
    }

    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Take every buffered snapshot, oldest first.
    pub fn drain(&self) -> Vec<StateSnapshot> {
        let drained = self.buffer.pop_all_items();
        if let Some(metrics) = &self.metrics {
            metrics.observe_buffer(&self.buffer.backpressure_stats());
        }
        drained
    }

    pub fn stats(&self) -> BackpressureStats {
        self.buffer.backpressure_stats()
    }

    pub fn scheduler(&self) -> &Arc<TickScheduler> {
        &self.scheduler
    }

    pub fn buffer(&self) -> &Arc<BoundedBuffer<StateSnapshot>> {
        &self.buffer
    }

    pub fn recorder(&self) -> &Arc<SnapshotRecorder<S>> {
        &self.recorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_pulse::SubscriberError;
    use helm_types::{HealthRecord, TickSignal};

    fn source(tick: &TickSignal) -> Result<StateSnapshot, SubscriberError> {
        Ok(StateSnapshot::for_tick(tick, 0.9, HealthRecord::healthy()))
    }

    #[tokio::test(start_paused = true)]
    async fn fills_and_drains_buffer() {
        let mut config = HelmConfig::default();
        config.buffer.capacity = 5;
        let pipeline = SnapshotPipeline::new(&config, source).unwrap();

        let summary = pipeline.run(Duration::from_secs(1)).await.unwrap();
        assert_eq!(pipeline.recorder().recorded(), summary.ticks);

        let stats = pipeline.stats();
        assert_eq!(stats.occupancy, 5);
        assert!(stats.drop_rate > 0.0);

        let drained = pipeline.drain();
        assert_eq!(drained.len(), 5);
        assert!(drained.windows(2).all(|w| w[0].frame_id < w[1].frame_id));
        assert!(pipeline.buffer().is_empty());
    }

    #[test]
    fn invalid_buffer_config_rejected() {
        let mut config = HelmConfig::default();
        config.buffer.capacity = 0;
        assert!(SnapshotPipeline::new(&config, source).is_err());
    }
}
