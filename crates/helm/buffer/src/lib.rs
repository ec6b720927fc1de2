#![deny(unsafe_code)]
//! # helm-buffer
//!
//! Fixed-capacity buffer for tick-time state snapshots.
//!
//! Producers (tick subscribers) push, consumers drain with [`BoundedBuffer::pop_all`].
//! When producers outpace consumers the buffer sheds load by eviction rather
//! than rejecting pushes:
//!
//! ```text
//!   push ──► occupancy < capacity·threshold ─────────────► append
//!        ──► under pressure (adaptive) ──► evict oldest below-median priority, append
//!        ──► full ──► evict (below-median or oldest), append
//! ```
//!
//! At most one entry is evicted per push, and survivors keep their acceptance
//! order. Pressure is observable through [`BoundedBuffer::backpressure_stats`],
//! whose drop rate is computed over a rolling window of recent operations.

pub mod config;
pub mod error;
pub mod ring;
pub mod stats;

pub use config::{
    BufferConfig, DecimationStrategy, DEFAULT_CAPACITY, DEFAULT_PRESSURE_THRESHOLD,
    DEFAULT_STATS_WINDOW,
};
pub use error::{BufferError, BufferResult};
pub use helm_types::PriorityHint;
pub use ring::{BoundedBuffer, BufferEntry, PushOutcome};
pub use stats::BackpressureStats;
