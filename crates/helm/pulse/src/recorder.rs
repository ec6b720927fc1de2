//! Tick subscriber that captures a snapshot and pushes it into a bounded buffer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use helm_buffer::{BoundedBuffer, PushOutcome};
use helm_types::{StateSnapshot, TickSignal};
use tracing::trace;

use crate::error::SubscriberError;
use crate::subscriber::TickSubscriber;

/// Produces the application state for a tick.
pub trait SnapshotSource: Send + Sync {
    fn capture(&self, tick: &TickSignal) -> Result<StateSnapshot, SubscriberError>;
}

impl<F> SnapshotSource for F
where
    F: Fn(&TickSignal) -> Result<StateSnapshot, SubscriberError> + Send + Sync,
{
    fn capture(&self, tick: &TickSignal) -> Result<StateSnapshot, SubscriberError> {
        self(tick)
    }
}

/// Bridges the scheduler and the buffer: one snapshot per tick.
pub struct SnapshotRecorder<S> {
    name: String,
    source: S,
    buffer: Arc<BoundedBuffer<StateSnapshot>>,
    recorded: AtomicU64,
    evictions: AtomicU64,
}

impl<S: SnapshotSource> SnapshotRecorder<S> {
    pub fn new(name: impl Into<String>, source: S, buffer: Arc<BoundedBuffer<StateSnapshot>>) -> Self {
        Self {
            name: name.into(),
            source,
            buffer,
            recorded: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn buffer(&self) -> &Arc<BoundedBuffer<StateSnapshot>> {
        &self.buffer
    }

    /// Snapshots pushed so far.
    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }

    /// Pushes that displaced an older snapshot.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<S: SnapshotSource> TickSubscriber for SnapshotRecorder<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_tick(&self, tick: TickSignal) -> Result<(), SubscriberError> {
        let snapshot = self.source.capture(&tick)?;
        let outcome = self.buffer.push(snapshot);
        self.recorded.fetch_add(1, Ordering::Relaxed);
        if let PushOutcome::AcceptedWithEviction { evicted, .. } = outcome {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(tick = tick.sequence, evicted_sequence = evicted, "snapshot displaced");
        }
        Ok(())
    }
}
