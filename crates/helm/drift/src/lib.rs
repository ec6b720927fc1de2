#![deny(unsafe_code)]
//! # helm-drift
//!
//! Measures how far an executed action strays from its stated intent.
//!
//! Each call folds one (intent, action) vector pair into a per-lane
//! exponential moving average and maps the result onto a guardian decision:
//!
//! ```text
//!   raw  = 1 - cos(intent, action)        clamped to [0, 1]
//!   ema' = α·raw + (1-α)·ema
//!
//!   0 ──── allow ──── warn_threshold ──── warn ──── block_threshold ──── block ──── 1
//! ```
//!
//! Lanes are isolated: every lane owns its EMA and a bounded raw history
//! (a FIFO [`helm_buffer::BoundedBuffer`]). Counting consecutive warnings is
//! left to the caller.

pub mod config;
pub mod decision;
pub mod error;
pub mod lane;
pub mod metric;
pub mod monitor;

pub use config::{
    DriftConfig, DEFAULT_ALPHA, DEFAULT_BLOCK_THRESHOLD, DEFAULT_HISTORY_CAPACITY,
    DEFAULT_WARN_THRESHOLD,
};
pub use decision::{DriftReading, DriftRecord, GuardianDecision, GuardianEvent};
pub use error::{DriftError, DriftResult, InvalidVectorError, VectorFault, VectorRole};
pub use lane::{LaneDrift, LaneSnapshot};
pub use metric::{convergence_steps, cosine_complement, validate_sample};
pub use monitor::DriftMonitor;
