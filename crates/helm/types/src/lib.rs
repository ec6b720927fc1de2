#![deny(unsafe_code)]
//! # helm-types
//!
//! Shared vocabulary for the Helm governance core.
//!
//! - [`TickSignal`]: the scheduler's heartbeat (sequence + wall clock)
//! - [`StateSnapshot`]: the record a tick subscriber produces and the buffer retains
//! - [`LaneId`]: isolation key for per-lane drift state
//! - [`PriorityHint`]: optional priority consulted by adaptive decimation

pub mod lane;
pub mod priority;
pub mod snapshot;
pub mod tick;

pub use lane::LaneId;
pub use priority::PriorityHint;
pub use snapshot::{HealthRecord, HealthStatus, StateSnapshot};
pub use tick::TickSignal;
