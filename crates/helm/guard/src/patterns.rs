//! The static pattern table driving the tag enricher.
//!
//! Rules are evaluated in table order. Within a category, a plan site (a
//! field path) claimed by an earlier rule is not counted again by a later,
//! less specific one: an `email` field yields one high-confidence PII tag,
//! not an exact tag plus a substring tag for the same field.

use serde_json::Value;

use crate::tag::RiskCategory;

pub const EXACT_FIELD_CONFIDENCE: f64 = 0.9;
pub const FIELD_SUBSTRING_CONFIDENCE: f64 = 0.6;
pub const VALUE_SUBSTRING_CONFIDENCE: f64 = 0.5;

/// How a rule recognizes a site. All comparisons are on lowercased text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Field name equals one of the listed names.
    FieldExact(&'static [&'static str]),
    /// Field name contains one of the listed fragments.
    FieldContains(&'static [&'static str]),
    /// A string value contains one of the listed fragments.
    ValueContains(&'static [&'static str]),
}

impl Matcher {
    pub const fn confidence(&self) -> f64 {
        match self {
            Self::FieldExact(_) => EXACT_FIELD_CONFIDENCE,
            Self::FieldContains(_) => FIELD_SUBSTRING_CONFIDENCE,
            Self::ValueContains(_) => VALUE_SUBSTRING_CONFIDENCE,
        }
    }

    pub(crate) fn matches(&self, site: &Site) -> bool {
        match (self, &site.kind) {
            (Self::FieldExact(names), SiteKind::Field) => names.iter().any(|n| *n == site.text),
            (Self::FieldContains(fragments), SiteKind::Field)
            | (Self::ValueContains(fragments), SiteKind::Value) => {
                fragments.iter().any(|f| site.text.contains(f))
            }
            _ => false,
        }
    }
}

/// One row of the table: a matcher and the tag it produces.
#[derive(Debug, Clone, Copy)]
pub struct PatternRule {
    pub name: &'static str,
    pub category: RiskCategory,
    pub matcher: Matcher,
    pub description: &'static str,
}

pub static PATTERN_TABLE: &[PatternRule] = &[
    // Exact field names
    PatternRule {
        name: "pii.personal_field",
        category: RiskCategory::Pii,
        matcher: Matcher::FieldExact(&[
            "email",
            "email_address",
            "phone",
            "phone_number",
            "ssn",
            "social_security_number",
            "date_of_birth",
            "dob",
            "home_address",
            "passport_number",
            "national_id",
            "full_name",
        ]),
        description: "Plan carries a personal-data field",
    },
    PatternRule {
        name: "financial.account_field",
        category: RiskCategory::Financial,
        matcher: Matcher::FieldExact(&[
            "account_number",
            "bank_account",
            "iban",
            "routing_number",
            "credit_card",
            "card_number",
            "cvv",
            "amount",
            "transfer_amount",
            "balance",
            "salary",
        ]),
        description: "Plan carries a financial field",
    },
    PatternRule {
        name: "privilege.escalation_field",
        category: RiskCategory::PrivilegeEscalation,
        matcher: Matcher::FieldExact(&[
            "sudo",
            "is_admin",
            "grant_role",
            "permissions",
            "privileges",
            "run_as",
            "elevated",
            "escalate",
        ]),
        description: "Plan requests elevated privileges",
    },
    PatternRule {
        name: "model.switch_field",
        category: RiskCategory::ModelSwitch,
        matcher: Matcher::FieldExact(&[
            "model",
            "model_id",
            "model_name",
            "target_model",
            "fallback_model",
        ]),
        description: "Plan selects or switches the execution model",
    },
    PatternRule {
        name: "network.endpoint_field",
        category: RiskCategory::ExternalCall,
        matcher: Matcher::FieldExact(&[
            "url",
            "uri",
            "endpoint",
            "webhook",
            "webhook_url",
            "callback_url",
            "host",
        ]),
        description: "Plan names an outbound network target",
    },
    // Field-name fragments
    PatternRule {
        name: "pii.personal_field_heuristic",
        category: RiskCategory::Pii,
        matcher: Matcher::FieldContains(&[
            "email", "phone", "ssn", "birth", "address", "passport", "surname", "personal",
        ]),
        description: "Field name suggests personal data",
    },
    PatternRule {
        name: "financial.field_heuristic",
        category: RiskCategory::Financial,
        matcher: Matcher::FieldContains(&[
            "card", "account", "payment", "iban", "invoice", "amount", "salary", "bank",
        ]),
        description: "Field name suggests financial data",
    },
    PatternRule {
        name: "privilege.field_heuristic",
        category: RiskCategory::PrivilegeEscalation,
        matcher: Matcher::FieldContains(&[
            "admin", "privilege", "permission", "sudo", "escalat", "superuser",
        ]),
        description: "Field name suggests a privilege change",
    },
    PatternRule {
        name: "model.field_heuristic",
        category: RiskCategory::ModelSwitch,
        matcher: Matcher::FieldContains(&["model", "llm"]),
        description: "Field name suggests model selection",
    },
    PatternRule {
        name: "network.field_heuristic",
        category: RiskCategory::ExternalCall,
        matcher: Matcher::FieldContains(&["url", "endpoint", "webhook", "remote"]),
        description: "Field name suggests an outbound call",
    },
    // String values
    PatternRule {
        name: "privilege.command_value",
        category: RiskCategory::PrivilegeEscalation,
        matcher: Matcher::ValueContains(&[
            "sudo ",
            "chmod 777",
            "grant all",
            "escalate_privilege",
            "as administrator",
        ]),
        description: "Value contains a privilege-escalation command",
    },
    PatternRule {
        name: "model.switch_value",
        category: RiskCategory::ModelSwitch,
        matcher: Matcher::ValueContains(&["switch_model", "change_model", "swap_model"]),
        description: "Value requests a model switch",
    },
    PatternRule {
        name: "network.url_value",
        category: RiskCategory::ExternalCall,
        matcher: Matcher::ValueContains(&["http://", "https://", "ftp://", "wss://"]),
        description: "Value contains a network URL",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SiteKind {
    Field,
    Value,
}

/// A scannable location in a plan: a field name or a string value.
#[derive(Debug, Clone)]
pub(crate) struct Site {
    pub path: String,
    pub kind: SiteKind,
    pub text: String,
}

/// Flatten a plan into its field-name and string-value sites, in document order.
pub(crate) fn collect_sites(plan: &Value) -> Vec<Site> {
    let mut sites = Vec::new();
    walk(plan, String::new(), &mut sites);
    sites
}

fn walk(value: &Value, path: String, sites: &mut Vec<Site>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                sites.push(Site {
                    path: child_path.clone(),
                    kind: SiteKind::Field,
                    text: key.to_lowercase(),
                });
                walk(child, child_path, sites);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, format!("{path}[{index}]"), sites);
            }
        }
        Value::String(text) => sites.push(Site {
            path: if path.is_empty() { "$".into() } else { path },
            kind: SiteKind::Value,
            text: text.to_lowercase(),
        }),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
