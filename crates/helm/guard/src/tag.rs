//! Risk tags and the records that carry them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of sensitivity a tag describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    PrivilegeEscalation,
    Financial,
    Pii,
    ModelSwitch,
    ExternalCall,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 5] = [
        Self::PrivilegeEscalation,
        Self::Financial,
        Self::Pii,
        Self::ModelSwitch,
        Self::ExternalCall,
    ];

    /// Contribution of a tag with confidence 1.0 to the aggregate risk score.
    pub const fn weight(&self) -> f64 {
        match self {
            Self::PrivilegeEscalation => 0.7,
            Self::Financial => 0.5,
            Self::Pii => 0.45,
            Self::ModelSwitch => 0.3,
            Self::ExternalCall => 0.25,
        }
    }

    /// Categories that force human approval whatever the aggregate score.
    pub const fn is_sensitive(&self) -> bool {
        !matches!(self, Self::ExternalCall)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrivilegeEscalation => "privilege_escalation",
            Self::Financial => "financial",
            Self::Pii => "pii",
            Self::ModelSwitch => "model_switch",
            Self::ExternalCall => "external_call",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confidence-scored sensitivity annotation on a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskTag {
    pub name: String,
    pub category: RiskCategory,
    /// In [0, 1]. Exact field-name matches score higher than heuristic ones.
    pub confidence: f64,
    pub description: String,
    /// Plan paths that triggered the tag, e.g. `parameters.email`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_fields: Vec<String>,
}

impl RiskTag {
    pub fn new(
        name: impl Into<String>,
        category: RiskCategory,
        confidence: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            confidence: confidence.clamp(0.0, 1.0),
            description: description.into(),
            matched_fields: Vec::new(),
        }
    }

    pub fn with_matched_fields(mut self, fields: Vec<String>) -> Self {
        self.matched_fields = fields;
        self
    }
}

/// Who asked for a plan to run, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanContext {
    pub caller_id: String,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl PlanContext {
    pub fn new(caller_id: impl Into<String>) -> Self {
        Self {
            caller_id: caller_id.into(),
            requested_at: Utc::now(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

impl Default for PlanContext {
    fn default() -> Self {
        Self::new("anonymous")
    }
}

/// A plan plus the tags found in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedPlan {
    pub original_plan: Value,
    pub tags: Vec<RiskTag>,
    pub enrichment_time_ms: f64,
    /// Tags came from the enrichment cache.
    #[serde(default)]
    pub from_cache: bool,
}

impl TaggedPlan {
    pub fn new(original_plan: Value, tags: Vec<RiskTag>) -> Self {
        Self {
            original_plan,
            tags,
            enrichment_time_ms: 0.0,
            from_cache: false,
        }
    }

    pub fn has_category(&self, category: RiskCategory) -> bool {
        self.tags.iter().any(|t| t.category == category)
    }

    /// Distinct categories present, most severe first.
    pub fn categories(&self) -> Vec<RiskCategory> {
        let mut categories: Vec<RiskCategory> = self.tags.iter().map(|t| t.category).collect();
        categories.sort();
        categories.dedup();
        categories
    }
}
