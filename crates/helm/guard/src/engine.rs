//! Risk decision engine: tags in, execution recommendation out.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::tag::{RiskCategory, RiskTag, TaggedPlan};

/// Score at or above which a plan is `medium` risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.5;
/// Score at or above which a plan is `high` risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// What the caller should do with the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Allow,
    RequireApproval,
    /// Blocked pending human approval.
    Block,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::RequireApproval => "require_approval",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewer role in an approval chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approver {
    PrivacyReviewer,
    DataProtectionOfficer,
    FinanceReviewer,
    ComplianceOfficer,
    SecurityReviewer,
    SecurityLead,
    MlPlatformReviewer,
    HumanSupervisor,
}

impl Approver {
    /// Reviewers responsible for a sensitive category, in sign-off order.
    pub fn chain_for(category: RiskCategory) -> &'static [Approver] {
        match category {
            RiskCategory::Pii => &[Self::PrivacyReviewer, Self::DataProtectionOfficer],
            RiskCategory::Financial => &[Self::FinanceReviewer, Self::ComplianceOfficer],
            RiskCategory::PrivilegeEscalation => &[Self::SecurityReviewer, Self::SecurityLead],
            RiskCategory::ModelSwitch => &[Self::MlPlatformReviewer],
            RiskCategory::ExternalCall => &[],
        }
    }
}

/// Output of [`RiskDecisionEngine::validate_plan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanVerdict {
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub tags_detected: Vec<RiskTag>,
    pub recommendation: Recommendation,
    /// Empty when the recommendation is `allow`.
    pub approval_chain: Vec<Approver>,
    pub reasons: Vec<String>,
}

impl PlanVerdict {
    pub fn requires_human(&self) -> bool {
        self.recommendation != Recommendation::Allow
    }
}

/// Aggregates tag weights into a score and applies the approval policy:
///
/// 1. `high` risk level blocks, with a human supervisor closing the chain.
/// 2. Any sensitive category (PII, financial, privilege escalation, model
///    switch) requires approval, however low the score.
/// 3. Everything else is allowed.
#[derive(Debug, Clone, Default)]
pub struct RiskDecisionEngine;

impl RiskDecisionEngine {
    pub fn new() -> Self {
        Self
    }

    /// `clamp(Σ weight(category) · confidence, 0, 1)`
    pub fn score(tags: &[RiskTag]) -> f64 {
        tags.iter()
            .map(|tag| tag.category.weight() * tag.confidence)
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    pub fn validate_plan(&self, plan: &TaggedPlan) -> PlanVerdict {
        let risk_score = Self::score(&plan.tags);
        let risk_level = RiskLevel::from_score(risk_score);

        let sensitive: Vec<RiskCategory> = plan
            .categories()
            .into_iter()
            .filter(RiskCategory::is_sensitive)
            .collect();

        let mut approval_chain: Vec<Approver> = Vec::new();
        for category in &sensitive {
            for approver in Approver::chain_for(*category) {
                if !approval_chain.contains(approver) {
                    approval_chain.push(*approver);
                }
            }
        }

        let mut reasons = Vec::new();
        let recommendation = if risk_level == RiskLevel::High {
            approval_chain.push(Approver::HumanSupervisor);
            reasons.push(format!("risk score {risk_score:.2} is high"));
            Recommendation::Block
        } else if !sensitive.is_empty() {
            reasons.extend(
                sensitive
                    .iter()
                    .map(|c| format!("sensitive category {c} requires approval")),
            );
            Recommendation::RequireApproval
        } else {
            Recommendation::Allow
        };

        if recommendation != Recommendation::Allow {
            info!(
                %recommendation,
                %risk_level,
                risk_score,
                tags = plan.tags.len(),
                "plan needs human sign-off"
            );
        }

        PlanVerdict {
            risk_level,
            risk_score,
            tags_detected: plan.tags.clone(),
            recommendation,
            approval_chain,
            reasons,
        }
    }
}
