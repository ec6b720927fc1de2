//! Tick scheduler: fires subscribers at a capped frequency.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use helm_types::TickSignal;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::TickConfig;
use crate::error::{SchedulerError, SchedulerResult, SubscriberError};
use crate::subscriber::{FnSubscriber, TickSubscriber};

/// Handle returned by [`TickScheduler::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(usize);

/// Why a scheduling run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The requested duration elapsed.
    Deadline,
    /// [`TickScheduler::stop`] was called.
    Cancelled,
}

/// Totals for one call to [`TickScheduler::start`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRunSummary {
    pub ticks: u64,
    /// Per-subscriber ticks skipped because the previous invocation was still running.
    pub coalesced: u64,
    /// Subscriber invocations that returned an error or panicked.
    pub subscriber_failures: u64,
    pub effective_frequency_hz: f64,
    pub elapsed: Duration,
    pub stopped_by: StopReason,
}

struct SubscriberSlot {
    id: SubscriptionId,
    subscriber: Arc<dyn TickSubscriber>,
    in_flight: AtomicBool,
}

/// Clears a slot's in-flight flag when the invocation ends, including by panic.
struct InFlightGuard(Arc<SubscriberSlot>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

/// Marks the scheduler idle and clears a pending stop when a run ends,
/// including when the caller drops the [`TickScheduler::start`] future.
struct RunGuard<'a>(&'a TickScheduler);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.shutdown.send_replace(false);
        self.0.running.store(false, Ordering::Release);
    }
}

#[derive(Default)]
struct RunCounters {
    coalesced: AtomicU64,
    failures: AtomicU64,
}

/// Periodic signal generator.
///
/// Holds no buffer state: subscribers decide what a tick means (typically
/// pushing a snapshot into a shared [`BoundedBuffer`](helm_buffer::BoundedBuffer)).
pub struct TickScheduler {
    config: TickConfig,
    subscribers: RwLock<Vec<Arc<SubscriberSlot>>>,
    next_id: AtomicUsize,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> SchedulerResult<Self> {
        config.validate()?;
        if config.is_capped() {
            warn!(
                requested_hz = config.frequency_hz,
                effective_hz = config.effective_frequency_hz(),
                "tick frequency capped"
            );
        }
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            config,
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            running: AtomicBool::new(false),
            shutdown,
        })
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Register a subscriber. Subscribers are dispatched in registration order.
    pub fn subscribe(&self, subscriber: Arc<dyn TickSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(subscriber = subscriber.name(), "tick subscriber registered");
        self.subscribers.write().push(Arc::new(SubscriberSlot {
            id,
            subscriber,
            in_flight: AtomicBool::new(false),
        }));
        id
    }

    /// Register a synchronous closure as a subscriber.
    pub fn subscribe_fn<F>(&self, name: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(TickSignal) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnSubscriber::new(name, callback)))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|slot| slot.id != id);
        subscribers.len() != before
    }

    /// Names of registered subscribers, in dispatch order.
    pub fn subscriber_names(&self) -> Vec<String> {
        self.subscribers
            .read()
            .iter()
            .map(|slot| slot.subscriber.name().to_string())
            .collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop issuing ticks. In-flight subscriber work still completes.
    ///
    /// The request is latched until the current run ends, so a stop issued
    /// before a spawned [`start`](Self::start) is first polled still cancels it.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Fire ticks until `run_for` elapses, or until [`stop`](Self::stop) when
    /// `run_for` is zero. Returns once every in-flight invocation has finished.
    ///
    /// Dropping the returned future aborts in-flight invocations and leaves
    /// the scheduler ready for another run.
    pub async fn start(&self, run_for: Duration) -> SchedulerResult<TickRunSummary> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(SchedulerError::AlreadyRunning);
        }
        let run = RunGuard(self);

        let mut shutdown = self.shutdown.subscribe();
        let cancelled = async move {
            // A closed channel counts as a stop.
            let _ = shutdown.wait_for(|stop| *stop).await;
        };
        tokio::pin!(cancelled);

        let effective_hz = self.config.effective_frequency_hz();
        let started = Instant::now();
        let deadline = (!run_for.is_zero()).then(|| started + run_for);
        let expiry = async move {
            match deadline {
                Some(at) => time::sleep_until(at).await,
                None => futures::future::pending::<()>().await,
            }
        };
        tokio::pin!(expiry);

        let mut interval = time::interval(self.config.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(frequency_hz = effective_hz, ?run_for, "tick scheduler started");

        let counters = Arc::new(RunCounters::default());
        let mut in_flight = JoinSet::new();
        let mut sequence = 0_u64;

        let stopped_by = loop {
            tokio::select! {
                biased;
                _ = &mut expiry => break StopReason::Deadline,
                _ = &mut cancelled => break StopReason::Cancelled,
                _ = interval.tick() => {
                    sequence += 1;
                    while in_flight.try_join_next().is_some() {}
                    self.dispatch(TickSignal::new(sequence), &counters, &mut in_flight);
                }
            }
        };

        // Panics are caught inside each task; a JoinError here can only be cancellation.
        while in_flight.join_next().await.is_some() {}
        drop(run);

        let summary = TickRunSummary {
            ticks: sequence,
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            subscriber_failures: counters.failures.load(Ordering::Relaxed),
            effective_frequency_hz: effective_hz,
            elapsed: started.elapsed(),
            stopped_by,
        };
        info!(
            ticks = summary.ticks,
            coalesced = summary.coalesced,
            failures = summary.subscriber_failures,
            reason = ?summary.stopped_by,
            "tick scheduler stopped"
        );
        Ok(summary)
    }

    fn dispatch(
        &self,
        tick: TickSignal,
        counters: &Arc<RunCounters>,
        in_flight: &mut JoinSet<()>,
    ) {
        let slots: Vec<Arc<SubscriberSlot>> = self.subscribers.read().clone();
        for slot in slots {
            if slot.in_flight.swap(true, Ordering::AcqRel) {
                counters.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(
                    tick = tick.sequence,
                    subscriber = slot.subscriber.name(),
                    "subscriber busy, tick coalesced"
                );
                continue;
            }

            let counters = Arc::clone(counters);
            in_flight.spawn(async move {
                let guard = InFlightGuard(slot);
                let slot = &guard.0;
                let outcome = AssertUnwindSafe(slot.subscriber.on_tick(tick))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => {
                        counters.failures.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            tick = tick.sequence,
                            subscriber = slot.subscriber.name(),
                            %error,
                            "tick subscriber failed"
                        );
                    }
                    Err(_) => {
                        counters.failures.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            tick = tick.sequence,
                            subscriber = slot.subscriber.name(),
                            "tick subscriber panicked"
                        );
                    }
                }
            });
        }
    }
}
