//! Combined pre-execution gate: risk verdict, drift guardian and warn escalation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use helm_drift::{DriftMonitor, DriftReading, GuardianDecision};
use helm_guard::{
    Approver, PlanContext, PlanVerdict, Recommendation, RiskDecisionEngine, TagEnricher,
};
use helm_types::LaneId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::HelmConfig;
use crate::error::GovernorResult;
use crate::escalation::{EscalationState, EscalationTracker};
use crate::metrics::GovernanceMetrics;

/// Intent and action vectors for one action, as produced by an upstream vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSample {
    pub intent: Vec<f64>,
    pub action: Vec<f64>,
}

/// Everything the gate needs to judge one pending action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub plan: Value,
    pub context: PlanContext,
    pub lane: LaneId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift: Option<DriftSample>,
}

impl ActionRequest {
    pub fn new(plan: Value, context: PlanContext, lane: impl Into<LaneId>) -> Self {
        Self {
            plan,
            context,
            lane: lane.into(),
            drift: None,
        }
    }

    pub fn with_vectors(mut self, intent: Vec<f64>, action: Vec<f64>) -> Self {
        self.drift = Some(DriftSample { intent, action });
        self
    }
}

/// The single execution decision for an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateDecision {
    /// Run the action. `drift_warning` is set when the guardian said `warn`.
    Execute { drift_warning: bool },
    /// Hold until every approver in `chain` signs off.
    AwaitApproval {
        chain: Vec<Approver>,
        reasons: Vec<String>,
    },
    /// Repeated drift warnings; external review is required before running.
    /// When the plan also needs sign-off, `chain` carries the approvers that
    /// must still be routed to after review.
    Review {
        chain: Vec<Approver>,
        reasons: Vec<String>,
    },
    /// Must not run. Surface to the caller, do not retry.
    Reject { reasons: Vec<String> },
}

impl GateDecision {
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Execute { .. } => "execute",
            Self::AwaitApproval { .. } => "await_approval",
            Self::Review { .. } => "review",
            Self::Reject { .. } => "reject",
        }
    }

    pub fn may_execute(&self) -> bool {
        matches!(self, Self::Execute { .. })
    }
}

/// Full record of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateEvaluation {
    pub evaluation_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub decision: GateDecision,
    pub verdict: PlanVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift: Option<DriftReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationState>,
}

/// Runs enrich, validate, drift and escalation for each action and folds the
/// results into one [`GateDecision`].
///
/// Precedence, strictest first: a `block` from either the risk engine or the
/// drift guardian rejects; an escalated warn streak requires review; a risk
/// approval requirement holds the action; otherwise it executes.
pub struct ActionGate {
    enricher: TagEnricher,
    engine: RiskDecisionEngine,
    drift: Arc<DriftMonitor>,
    escalation: EscalationTracker,
    metrics: Option<Arc<GovernanceMetrics>>,
}

impl ActionGate {
    pub fn new(
        enricher: TagEnricher,
        engine: RiskDecisionEngine,
        drift: Arc<DriftMonitor>,
        escalation: EscalationTracker,
    ) -> Self {
        Self {
            enricher,
            engine,
            drift,
            escalation,
            metrics: None,
        }
    }

    pub fn from_config(config: &HelmConfig) -> GovernorResult<Self> {
        config.validate()?;
        Ok(Self::new(
            TagEnricher::new(config.guard.cache_capacity),
            RiskDecisionEngine::new(),
            Arc::new(DriftMonitor::new(config.drift.clone())?),
            EscalationTracker::new(config.escalation.consecutive_warn_limit),
        ))
    }

    pub fn with_metrics(mut self, metrics: Arc<GovernanceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn drift_monitor(&self) -> &Arc<DriftMonitor> {
        &self.drift
    }

    pub fn enricher(&self) -> &TagEnricher {
        &self.enricher
    }

    pub fn escalation(&self) -> &EscalationTracker {
        &self.escalation
    }

    /// Judge one action. Errors only on malformed input (empty plan, bad vectors);
    /// every rejection is an ordinary [`GateDecision`].
    #[instrument(skip_all, fields(lane = %request.lane, caller = %request.context.caller_id))]
    pub fn evaluate(&self, request: &ActionRequest) -> GovernorResult<GateEvaluation> {
        let evaluation_id = Uuid::new_v4();

        let tagged = self.enricher.enrich_plan(&request.plan, &request.context)?;
        let verdict = self.engine.validate_plan(&tagged);

        let drift = match &request.drift {
            Some(sample) => Some(
                self.drift
                    .update(&request.lane, &sample.intent, &sample.action)?,
            ),
            None => None,
        };
        let escalation = drift
            .as_ref()
            .map(|reading| self.escalation.observe(&request.lane, reading.guardian));

        let decision = fold(&verdict, drift.as_ref(), escalation.as_ref());

        match &decision {
            GateDecision::Reject { reasons } => {
                warn!(%evaluation_id, ?reasons, "action rejected")
            }
            GateDecision::Review { .. } | GateDecision::AwaitApproval { .. } => {
                info!(%evaluation_id, outcome = decision.outcome(), "action held")
            }
            GateDecision::Execute { drift_warning } => {
                info!(%evaluation_id, drift_warning, "action cleared")
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_verdict(&verdict);
            if let Some(reading) = &drift {
                metrics.record_drift(reading);
            }
            if escalation.is_some_and(|e| e.is_escalated()) {
                metrics.record_escalation(&request.lane);
            }
            metrics.record_gate(&decision);
        }

        Ok(GateEvaluation {
            evaluation_id,
            evaluated_at: Utc::now(),
            decision,
            verdict,
            drift,
            escalation,
        })
    }
}

fn fold(
    verdict: &PlanVerdict,
    drift: Option<&DriftReading>,
    escalation: Option<&EscalationState>,
) -> GateDecision {
    let guardian = drift.map(|d| d.guardian);

    let mut block_reasons = Vec::new();
    if verdict.recommendation == Recommendation::Block {
        block_reasons.extend(verdict.reasons.iter().cloned());
    }
    if let Some(reading) = drift.filter(|d| d.guardian == GuardianDecision::Block) {
        block_reasons.push(format!(
            "drift ema {:.3} on {} reached the block threshold",
            reading.ema, reading.lane
        ));
    }
    if !block_reasons.is_empty() {
        return GateDecision::Reject {
            reasons: block_reasons,
        };
    }

    let needs_approval = verdict.recommendation == Recommendation::RequireApproval;
    if let Some(EscalationState::Escalated { consecutive }) = escalation {
        let mut reasons = vec![format!("{consecutive} consecutive drift warnings")];
        let mut chain = Vec::new();
        if needs_approval {
            reasons.extend(verdict.reasons.iter().cloned());
            chain = verdict.approval_chain.clone();
        }
        return GateDecision::Review { chain, reasons };
    }

    let drift_warning = guardian == Some(GuardianDecision::Warn);
    if needs_approval {
        let mut reasons = verdict.reasons.clone();
        if drift_warning {
            reasons.push("drift guardian warned".to_string());
        }
        return GateDecision::AwaitApproval {
            chain: verdict.approval_chain.clone(),
            reasons,
        };
    }

    GateDecision::Execute { drift_warning }
}
