#![deny(unsafe_code)]
//! # helm-guard
//!
//! Classifies action plans before they run.
//!
//! ```text
//!   plan + context ──► TagEnricher ──► TaggedPlan ──► RiskDecisionEngine ──► PlanVerdict
//!                        │  static PATTERN_TABLE          │ Σ weight·confidence
//!                        └─ BLAKE3-keyed cache            └ allow / require_approval / block
//! ```
//!
//! A single sensitive tag forces approval even when the aggregate score is
//! low, so a critical but low-confidence finding is never averaged away.

pub mod cache;
pub mod engine;
pub mod enricher;
pub mod error;
pub mod patterns;
pub mod tag;

pub use cache::{CacheKey, CacheStats, EnrichmentCache};
pub use engine::{
    Approver, PlanVerdict, Recommendation, RiskDecisionEngine, RiskLevel, HIGH_RISK_THRESHOLD,
    MEDIUM_RISK_THRESHOLD,
};
pub use enricher::TagEnricher;
pub use error::{GuardError, GuardResult};
pub use patterns::{Matcher, PatternRule, PATTERN_TABLE};
pub use tag::{PlanContext, RiskCategory, RiskTag, TaggedPlan};
