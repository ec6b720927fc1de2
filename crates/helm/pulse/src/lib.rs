#![deny(unsafe_code)]
//! # helm-pulse
//!
//! Periodic tick generation for the governance core.
//!
//! ```text
//!   TickScheduler ──tick#n──► subscriber A (spawned, failures isolated)
//!        │        ──tick#n──► subscriber B ──► SnapshotRecorder ──► BoundedBuffer
//!        │
//!        └── capped at 100 Hz; a busy subscriber has its tick coalesced
//! ```
//!
//! The scheduler owns no application state. A subscriber that errors or
//! panics is logged and counted; the loop keeps firing.

pub mod config;
pub mod error;
pub mod recorder;
pub mod scheduler;
pub mod subscriber;

pub use config::{TickConfig, DEFAULT_TICK_FREQUENCY_HZ, MAX_TICK_FREQUENCY_HZ};
pub use error::{SchedulerError, SchedulerResult, SubscriberError};
pub use recorder::{SnapshotRecorder, SnapshotSource};
pub use scheduler::{StopReason, SubscriptionId, TickRunSummary, TickScheduler};
pub use subscriber::{FnSubscriber, TickSubscriber};
