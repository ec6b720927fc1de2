//! The bounded buffer itself.

use std::collections::VecDeque;

use helm_types::PriorityHint;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{BufferConfig, DecimationStrategy};
use crate::error::BufferResult;
use crate::stats::{BackpressureStats, RollingWindow, WindowEvent};

/// A buffered item plus its insertion sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferEntry<T> {
    /// Monotonic per-buffer insertion counter, starting at 0.
    pub sequence: u64,
    pub item: T,
}

/// What a single `push` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Accepted { sequence: u64 },
    /// The item was accepted and exactly one older entry was evicted.
    AcceptedWithEviction { sequence: u64, evicted: u64 },
}

impl PushOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            Self::Accepted { sequence } | Self::AcceptedWithEviction { sequence, .. } => *sequence,
        }
    }

    pub fn evicted(&self) -> Option<u64> {
        match self {
            Self::Accepted { .. } => None,
            Self::AcceptedWithEviction { evicted, .. } => Some(*evicted),
        }
    }
}

struct BufferState<T> {
    entries: VecDeque<BufferEntry<T>>,
    /// Entries currently carrying a priority hint.
    hinted: usize,
    /// Reused by the median search so pushes under pressure do not allocate.
    scratch: Vec<u32>,
    next_sequence: u64,
    window: RollingWindow,
    total_accepted: u64,
    total_evicted: u64,
}

/// Fixed-capacity buffer that degrades by eviction instead of rejecting.
///
/// All state (entries, sequence counter, rolling counters) sits behind one
/// mutex, so `push`, `pop_all` and `backpressure_stats` are safe to call
/// from any number of threads through a shared reference.
pub struct BoundedBuffer<T> {
    config: BufferConfig,
    state: Mutex<BufferState<T>>,
}

impl<T: PriorityHint> BoundedBuffer<T> {
    pub fn new(config: BufferConfig) -> BufferResult<Self> {
        config.validate()?;
        let state = BufferState {
            entries: VecDeque::with_capacity(config.capacity),
            hinted: 0,
            scratch: Vec::new(),
            next_sequence: 0,
            window: RollingWindow::new(config.stats_window),
            total_accepted: 0,
            total_evicted: 0,
        };
        Ok(Self {
            config,
            state: Mutex::new(state),
        })
    }

    /// FIFO buffer of the given capacity.
    pub fn fifo(capacity: usize) -> BufferResult<Self> {
        Self::new(BufferConfig::fifo(capacity))
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Insert `item`, evicting at most one older entry.
    ///
    /// Never fails: a full buffer makes room instead of refusing.
    ///
    /// The adaptive median search is O(capacity) and runs only while the
    /// buffer is under pressure with at least two hinted entries.
    pub fn push(&self, item: T) -> PushOutcome {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let occupancy = state.entries.len();

        let victim = if occupancy >= self.config.capacity {
            match self.config.strategy {
                DecimationStrategy::Fifo => Some(0),
                DecimationStrategy::Adaptive => Some(
                    below_median_victim(&state.entries, state.hinted, &mut state.scratch)
                        .unwrap_or(0),
                ),
            }
        } else if self.config.strategy == DecimationStrategy::Adaptive
            && self.config.is_under_pressure(occupancy)
        {
            below_median_victim(&state.entries, state.hinted, &mut state.scratch)
        } else {
            None
        };

        let evicted = match victim.and_then(|index| state.entries.remove(index)) {
            Some(entry) => {
                if entry.item.priority().is_some() {
                    state.hinted -= 1;
                }
                Some(entry.sequence)
            }
            None => None,
        };
        if let Some(sequence) = evicted {
            state.total_evicted += 1;
            state.window.record(WindowEvent::Evicted);
            trace!(
                evicted = sequence,
                occupancy,
                strategy = %self.config.strategy,
                "buffer entry evicted"
            );
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        if item.priority().is_some() {
            state.hinted += 1;
        }
        state.entries.push_back(BufferEntry { sequence, item });
        state.total_accepted += 1;
        state.window.record(WindowEvent::Accepted);

        match evicted {
            Some(evicted) => PushOutcome::AcceptedWithEviction { sequence, evicted },
            None => PushOutcome::Accepted { sequence },
        }
    }

    /// Drain every buffered entry in insertion order, leaving the buffer empty.
    pub fn pop_all(&self) -> Vec<BufferEntry<T>> {
        let mut state = self.state.lock();
        state.hinted = 0;
        state.entries.drain(..).collect()
    }

    /// Like [`pop_all`](Self::pop_all) but strips the bookkeeping.
    pub fn pop_all_items(&self) -> Vec<T> {
        self.pop_all().into_iter().map(|entry| entry.item).collect()
    }

    pub fn backpressure_stats(&self) -> BackpressureStats {
        let state = self.state.lock();
        let occupancy = state.entries.len();
        BackpressureStats {
            occupancy,
            capacity: self.config.capacity,
            utilization: occupancy as f64 / self.config.capacity as f64,
            drop_rate: state.window.drop_rate(),
            window_size: state.window.size(),
            window_accepted: state.window.accepted(),
            window_evicted: state.window.evicted(),
            total_accepted: state.total_accepted,
            total_evicted: state.total_evicted,
            under_pressure: self.config.is_under_pressure(occupancy),
            strategy: self.config.strategy,
        }
    }
}

impl<T: PriorityHint + Clone> BoundedBuffer<T> {
    /// Non-draining copy of the current entries, oldest first.
    pub fn snapshot(&self) -> Vec<BufferEntry<T>> {
        self.state.lock().entries.iter().cloned().collect()
    }

    /// Most recently accepted item, if any.
    pub fn latest(&self) -> Option<T> {
        self.state.lock().entries.back().map(|entry| entry.item.clone())
    }
}

/// Index of the oldest entry whose priority is strictly below the median of
/// all prioritized entries. Entries without a hint are never chosen here.
fn below_median_victim<T: PriorityHint>(
    entries: &VecDeque<BufferEntry<T>>,
    hinted: usize,
    priorities: &mut Vec<u32>,
) -> Option<usize> {
    if hinted < 2 {
        return None;
    }
    priorities.clear();
    priorities.extend(entries.iter().filter_map(|e| e.item.priority()));
    if priorities.len() < 2 {
        return None;
    }

    let mid = priorities.len() / 2;
    let (_, upper, _) = priorities.select_nth_unstable(mid);
    let upper = f64::from(*upper);
    let median = if priorities.len() % 2 == 0 {
        let lower = priorities[..mid].iter().copied().max().unwrap_or_default();
        (f64::from(lower) + upper) / 2.0
    } else {
        upper
    };

    entries.iter().position(|entry| {
        entry
            .item
            .priority()
            .is_some_and(|p| f64::from(p) < median)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Frame {
        name: &'static str,
        priority: Option<u32>,
    }

    impl Frame {
        fn plain(name: &'static str) -> Self {
            Self { name, priority: None }
        }

        fn ranked(name: &'static str, priority: u32) -> Self {
            Self {
                name,
                priority: Some(priority),
            }
        }
    }

    impl PriorityHint for Frame {
        fn priority(&self) -> Option<u32> {
            self.priority
        }
    }

    fn names(entries: &[BufferEntry<Frame>]) -> Vec<&'static str> {
        entries.iter().map(|e| e.item.name).collect()
    }

    #[test]
    fn accepts_until_full() {
        let buffer = BoundedBuffer::fifo(3).unwrap();
        assert_eq!(buffer.push(Frame::plain("a")), PushOutcome::Accepted { sequence: 0 });
        assert_eq!(buffer.push(Frame::plain("b")), PushOutcome::Accepted { sequence: 1 });
        assert_eq!(buffer.len(), 2);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn fifo_fallback_without_priorities() {
        let buffer =
            BoundedBuffer::new(BufferConfig::new(3, 0.67, DecimationStrategy::Adaptive)).unwrap();
        for name in ["A", "B", "C"] {
            assert!(buffer.push(Frame::plain(name)).evicted().is_none());
        }
        let outcome = buffer.push(Frame::plain("D"));
        assert_eq!(outcome.evicted(), Some(0));
        assert_eq!(buffer.len(), 3);
        assert_eq!(names(&buffer.pop_all()), vec!["B", "C", "D"]);
    }

    #[test]
    fn adaptive_evicts_low_priority_under_pressure() {
        let buffer =
            BoundedBuffer::new(BufferConfig::new(4, 0.5, DecimationStrategy::Adaptive)).unwrap();
        buffer.push(Frame::ranked("keep", 5));
        buffer.push(Frame::ranked("low", 1));
        // Occupancy 2 >= 4 * 0.5: the below-median entry goes before capacity is reached.
        let outcome = buffer.push(Frame::ranked("new", 5));
        assert_eq!(outcome.evicted(), Some(1));
        assert_eq!(names(&buffer.snapshot()), vec!["keep", "new"]);
    }

    #[test]
    fn adaptive_prefers_oldest_below_median() {
        let buffer =
            BoundedBuffer::new(BufferConfig::new(5, 1.0, DecimationStrategy::Adaptive)).unwrap();
        buffer.push(Frame::ranked("hi-old", 9));
        buffer.push(Frame::ranked("lo-old", 2));
        buffer.push(Frame::ranked("mid", 5));
        buffer.push(Frame::ranked("lo-new", 1));
        buffer.push(Frame::ranked("hi-new", 8));
        buffer.push(Frame::ranked("incoming", 7));
        assert_eq!(
            names(&buffer.pop_all()),
            vec!["hi-old", "mid", "lo-new", "hi-new", "incoming"]
        );
    }

    #[test]
    fn adaptive_falls_back_to_oldest_when_priorities_equal() {
        let buffer =
            BoundedBuffer::new(BufferConfig::new(2, 0.5, DecimationStrategy::Adaptive)).unwrap();
        buffer.push(Frame::ranked("a", 3));
        // Under pressure, but nothing is strictly below the median: no eviction yet.
        assert!(buffer.push(Frame::ranked("b", 3)).evicted().is_none());
        assert_eq!(buffer.push(Frame::ranked("c", 3)).evicted(), Some(0));
        assert_eq!(names(&buffer.pop_all()), vec!["b", "c"]);
    }

    #[test]
    fn unprioritized_entries_survive_decimation() {
        let buffer =
            BoundedBuffer::new(BufferConfig::new(4, 0.5, DecimationStrategy::Adaptive)).unwrap();
        buffer.push(Frame::plain("plain"));
        buffer.push(Frame::ranked("high", 10));
        buffer.push(Frame::ranked("low", 1));
        buffer.push(Frame::ranked("mid", 4));
        let survivors = names(&buffer.snapshot());
        assert!(survivors.contains(&"plain"));
        assert!(!survivors.contains(&"low"));
    }

    #[test]
    fn fifo_strategy_ignores_pressure_until_full() {
        let buffer =
            BoundedBuffer::new(BufferConfig::new(3, 0.1, DecimationStrategy::Fifo)).unwrap();
        buffer.push(Frame::ranked("a", 9));
        buffer.push(Frame::ranked("b", 1));
        assert!(buffer.push(Frame::ranked("c", 1)).evicted().is_none());
        assert_eq!(buffer.push(Frame::ranked("d", 1)).evicted(), Some(0));
    }

    #[test]
    fn pop_all_empties_buffer() {
        let buffer = BoundedBuffer::fifo(4).unwrap();
        buffer.push("x");
        buffer.push("y");
        let drained = buffer.pop_all_items();
        assert_eq!(drained, vec!["x", "y"]);
        assert!(buffer.is_empty());
        assert!(buffer.pop_all().is_empty());
    }

    #[test]
    fn sequences_continue_after_drain() {
        let buffer = BoundedBuffer::fifo(4).unwrap();
        buffer.push("x");
        buffer.pop_all();
        assert_eq!(buffer.push("y").sequence(), 1);
    }

    #[test]
    fn latest_returns_newest() {
        let buffer = BoundedBuffer::fifo(2).unwrap();
        assert_eq!(buffer.latest(), None);
        buffer.push(1.5_f64);
        buffer.push(2.5_f64);
        assert_eq!(buffer.latest(), Some(2.5));
    }

    #[test]
    fn stats_report_utilization_and_drop_rate() {
        let buffer = BoundedBuffer::new(BufferConfig::fifo(2).with_stats_window(8)).unwrap();
        buffer.push("a");
        let stats = buffer.backpressure_stats();
        assert_eq!(stats.occupancy, 1);
        assert!((stats.utilization - 0.5).abs() < 1e-12);
        assert_eq!(stats.drop_rate, 0.0);

        buffer.push("b");
        buffer.push("c");
        let stats = buffer.backpressure_stats();
        assert_eq!(stats.total_accepted, 3);
        assert_eq!(stats.total_evicted, 1);
        assert!((stats.drop_rate - 0.25).abs() < 1e-12);
        assert!(stats.under_pressure);
        assert_eq!(stats.strategy, DecimationStrategy::Fifo);
    }

    #[test]
    fn drop_rate_is_windowed_not_lifetime() {
        let buffer = BoundedBuffer::new(BufferConfig::fifo(1).with_stats_window(4)).unwrap();
        for i in 0..100_u64 {
            buffer.push(i);
        }
        buffer.pop_all();
        buffer.push(1000);
        buffer.push(1001);
        // Only the last four events count: accept, accept, evict, accept.
        let stats = buffer.backpressure_stats();
        assert_eq!(stats.window_accepted + stats.window_evicted, 4);
        assert!(stats.drop_rate < 0.5);
        assert_eq!(stats.total_accepted, 102);
    }

    #[test]
    fn concurrent_pushes_respect_capacity() {
        let buffer = Arc::new(BoundedBuffer::fifo(16).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || {
                    for i in 0..200_u64 {
                        buffer.push(t * 1_000 + i);
                        assert!(buffer.len() <= 16);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let drained = buffer.pop_all();
        assert_eq!(drained.len(), 16);
        assert!(drained.windows(2).all(|w| w[0].sequence < w[1].sequence));
        let stats = buffer.backpressure_stats();
        assert_eq!(stats.total_accepted, 1600);
        assert_eq!(stats.total_evicted, 1600 - 16);
    }

    #[test]
    fn hinted_count_tracks_evictions_and_drains() {
        let buffer =
            BoundedBuffer::new(BufferConfig::new(4, 0.5, DecimationStrategy::Adaptive)).unwrap();
        let hinted = |b: &BoundedBuffer<Frame>| b.state.lock().hinted;

        buffer.push(Frame::plain("p1"));
        buffer.push(Frame::ranked("r1", 1));
        // Under pressure, but a single hint has nothing to be compared with.
        assert!(buffer.push(Frame::plain("p2")).evicted().is_none());
        assert!(buffer.push(Frame::plain("p3")).evicted().is_none());
        assert_eq!(hinted(&buffer), 1);

        // Full with one hint: the oldest entry goes.
        assert_eq!(buffer.push(Frame::ranked("r2", 9)).evicted(), Some(0));
        assert_eq!(hinted(&buffer), 2);

        // r1 sits below the median of {1, 9}.
        assert_eq!(buffer.push(Frame::ranked("r3", 9)).evicted(), Some(1));
        assert_eq!(hinted(&buffer), 2);

        // Nothing below the median of {9, 9}: oldest plain entry goes.
        assert_eq!(buffer.push(Frame::plain("p4")).evicted(), Some(2));
        assert_eq!(hinted(&buffer), 2);

        buffer.pop_all();
        assert_eq!(hinted(&buffer), 0);
        buffer.push(Frame::ranked("low", 1));
        buffer.push(Frame::ranked("high", 5));
        assert_eq!(buffer.push(Frame::ranked("new", 5)).evicted(), Some(7));
        assert_eq!(hinted(&buffer), 2);
    }

    #[test]
    fn concurrent_drains_and_stats_race_pushes() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let buffer = Arc::new(
            BoundedBuffer::new(BufferConfig::new(32, 0.75, DecimationStrategy::Adaptive)).unwrap(),
        );
        let done = Arc::new(AtomicBool::new(false));

        let pushers: Vec<_> = (0..4_u32)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || {
                    for i in 0..500_u32 {
                        let priority = (i % 3 == 0).then_some(t + i % 7);
                        buffer.push(Frame { name: "f", priority });
                    }
                })
            })
            .collect();

        let drainers: Vec<_> = (0..2)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    let mut drained = Vec::new();
                    loop {
                        let finished = done.load(Ordering::Acquire);
                        let batch = buffer.pop_all();
                        assert!(batch.windows(2).all(|w| w[0].sequence < w[1].sequence));
                        drained.extend(batch.iter().map(|e| e.sequence));
                        if finished {
                            return drained;
                        }
                        std::thread::yield_now();
                    }
                })
            })
            .collect();

        let observer = {
            let buffer = Arc::clone(&buffer);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let stats = buffer.backpressure_stats();
                    assert!(stats.occupancy <= stats.capacity);
                    assert!(stats.total_evicted <= stats.total_accepted);
                    assert!((0.0..=1.0).contains(&stats.drop_rate));
                }
            })
        };

        for handle in pushers {
            handle.join().unwrap();
        }
        done.store(true, Ordering::Release);
        observer.join().unwrap();

        let mut drained: Vec<u64> = drainers
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        let remaining = buffer.len() as u64;
        let stats = buffer.backpressure_stats();
        assert_eq!(stats.total_accepted, 2_000);
        assert_eq!(
            drained.len() as u64 + remaining,
            stats.total_accepted - stats.total_evicted
        );

        let count = drained.len();
        drained.sort_unstable();
        drained.dedup();
        assert_eq!(drained.len(), count);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn strategy_from(flag: bool) -> DecimationStrategy {
            if flag {
                DecimationStrategy::Adaptive
            } else {
                DecimationStrategy::Fifo
            }
        }

        proptest! {
            #[test]
            fn occupancy_never_exceeds_capacity(
                capacity in 1usize..32,
                threshold in 0.05f64..=1.0,
                adaptive in any::<bool>(),
                priorities in proptest::collection::vec(proptest::option::of(0u32..10), 0..200),
            ) {
                let config = BufferConfig::new(capacity, threshold, strategy_from(adaptive));
                let buffer = BoundedBuffer::new(config).unwrap();
                for (i, priority) in priorities.iter().enumerate() {
                    let frame = Frame { name: "p", priority: *priority };
                    let before = buffer.len();
                    let outcome = buffer.push(frame);
                    prop_assert!(buffer.len() <= capacity);
                    prop_assert_eq!(outcome.sequence(), i as u64);
                    let expected = if outcome.evicted().is_some() { before } else { before + 1 };
                    prop_assert_eq!(buffer.len(), expected);
                }
            }

            #[test]
            fn survivors_keep_acceptance_order(
                capacity in 1usize..16,
                adaptive in any::<bool>(),
                priorities in proptest::collection::vec(proptest::option::of(0u32..5), 1..100),
            ) {
                let config = BufferConfig::new(capacity, 0.5, strategy_from(adaptive));
                let buffer = BoundedBuffer::new(config).unwrap();
                for priority in &priorities {
                    buffer.push(Frame { name: "p", priority: *priority });
                }
                let drained = buffer.pop_all();
                prop_assert!(drained.windows(2).all(|w| w[0].sequence < w[1].sequence));
                let stats = buffer.backpressure_stats();
                prop_assert_eq!(
                    stats.total_accepted - stats.total_evicted,
                    drained.len() as u64
                );
            }
        }
    }
}
