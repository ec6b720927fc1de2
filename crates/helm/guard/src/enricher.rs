//! Tag enricher: scans a plan against [`PATTERN_TABLE`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheStats, EnrichmentCache};
use crate::error::{GuardError, GuardResult};
use crate::patterns::{collect_sites, PatternRule, PATTERN_TABLE};
use crate::tag::{PlanContext, RiskCategory, RiskTag, TaggedPlan};

/// Annotates action plans with risk tags.
///
/// Deterministic for identical `(plan, context)` input and never mutates
/// the plan, which is what makes the optional cache safe.
pub struct TagEnricher {
    rules: &'static [PatternRule],
    cache: Option<EnrichmentCache>,
}

impl Default for TagEnricher {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TagEnricher {
    /// Enricher over the built-in table. A `cache_capacity` of zero disables caching.
    pub fn new(cache_capacity: usize) -> Self {
        Self::with_rules(PATTERN_TABLE, cache_capacity)
    }

    pub fn with_rules(rules: &'static [PatternRule], cache_capacity: usize) -> Self {
        Self {
            rules,
            cache: (cache_capacity > 0).then(|| EnrichmentCache::new(cache_capacity)),
        }
    }

    pub fn rules(&self) -> &'static [PatternRule] {
        self.rules
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(EnrichmentCache::stats)
    }

    pub fn enrich_plan(&self, plan: &Value, context: &PlanContext) -> GuardResult<TaggedPlan> {
        if is_empty_plan(plan) {
            return Err(GuardError::EmptyPlan);
        }
        let started = Instant::now();

        let (tags, from_cache) = match &self.cache {
            Some(cache) => {
                let key = EnrichmentCache::key(plan, context)?;
                match cache.get(&key) {
                    Some(tags) => (tags.as_ref().clone(), true),
                    None => {
                        let tags = self.scan(plan);
                        cache.insert(key, Arc::new(tags.clone()));
                        (tags, false)
                    }
                }
            }
            None => (self.scan(plan), false),
        };

        let enrichment_time_ms = started.elapsed().as_secs_f64() * 1_000.0;
        debug!(
            caller = %context.caller_id,
            tags = tags.len(),
            from_cache,
            enrichment_time_ms,
            "plan enriched"
        );

        Ok(TaggedPlan {
            original_plan: plan.clone(),
            tags,
            enrichment_time_ms,
            from_cache,
        })
    }

    fn scan(&self, plan: &Value) -> Vec<RiskTag> {
        let sites = collect_sites(plan);
        let mut claimed: HashSet<(RiskCategory, &str)> = HashSet::new();
        let mut tags = Vec::new();

        for rule in self.rules {
            let mut matched: Vec<&str> = Vec::new();
            for site in &sites {
                let path = site.path.as_str();
                if rule.matcher.matches(site)
                    && !claimed.contains(&(rule.category, path))
                    && !matched.contains(&path)
                {
                    matched.push(path);
                }
            }
            if matched.is_empty() {
                continue;
            }

            claimed.extend(matched.iter().map(|path| (rule.category, *path)));
            tags.push(
                RiskTag::new(
                    rule.name,
                    rule.category,
                    rule.matcher.confidence(),
                    rule.description,
                )
                .with_matched_fields(matched.into_iter().map(str::to_owned).collect()),
            );
        }
        tags
    }
}

fn is_empty_plan(plan: &Value) -> bool {
    match plan {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::EXACT_FIELD_CONFIDENCE;
    use serde_json::json;

    fn export_plan() -> Value {
        json!({"action": "export_data", "parameters": {"email": "a@b.com"}})
    }

    #[test]
    fn email_field_yields_single_high_confidence_pii_tag() {
        let tagged = TagEnricher::default()
            .enrich_plan(&export_plan(), &PlanContext::default())
            .unwrap();

        let pii: Vec<&RiskTag> = tagged
            .tags
            .iter()
            .filter(|t| t.category == RiskCategory::Pii)
            .collect();
        assert_eq!(pii.len(), 1);
        assert!(pii[0].confidence >= 0.8);
        assert_eq!(pii[0].confidence, EXACT_FIELD_CONFIDENCE);
        assert_eq!(pii[0].matched_fields, vec!["parameters.email"]);
        assert_eq!(tagged.original_plan, export_plan());
    }

    #[test]
    fn heuristic_fires_on_unclaimed_sites() {
        let plan = json!({"contact": {"work_email": "x", "email": "y"}});
        let tagged = TagEnricher::default()
            .enrich_plan(&plan, &PlanContext::default())
            .unwrap();
        let names: Vec<&str> = tagged.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["pii.personal_field", "pii.personal_field_heuristic"]);
        assert_eq!(tagged.tags[1].matched_fields, vec!["contact.work_email"]);
        assert!(tagged.tags[1].confidence < tagged.tags[0].confidence);
    }

    #[test]
    fn detects_each_category() {
        let plan = json!({
            "steps": [
                {"tool": "shell", "command": "sudo systemctl restart"},
                {"transfer_amount": 120, "phone_number": "555-0100"},
                {"target_model": "large"},
                {"notify": "https://hooks.example.com/x"}
            ]
        });
        let tagged = TagEnricher::default()
            .enrich_plan(&plan, &PlanContext::default())
            .unwrap();
        assert_eq!(tagged.categories(), RiskCategory::ALL.to_vec());
    }

    #[test]
    fn benign_plan_has_no_tags() {
        let plan = json!({"action": "list_files", "parameters": {"dir": "/tmp"}});
        let tagged = TagEnricher::default()
            .enrich_plan(&plan, &PlanContext::default())
            .unwrap();
        assert!(tagged.tags.is_empty());
    }

    #[test]
    fn empty_plans_rejected() {
        let enricher = TagEnricher::default();
        for plan in [Value::Null, json!({}), json!([])] {
            assert!(matches!(
                enricher.enrich_plan(&plan, &PlanContext::default()),
                Err(GuardError::EmptyPlan)
            ));
        }
    }

    #[test]
    fn enrichment_is_deterministic() {
        let enricher = TagEnricher::default();
        let ctx = PlanContext::new("alice");
        let a = enricher.enrich_plan(&export_plan(), &ctx).unwrap();
        let b = enricher.enrich_plan(&export_plan(), &ctx).unwrap();
        assert_eq!(a.tags, b.tags);
    }

    #[test]
    fn cached_result_matches_fresh_scan() {
        let enricher = TagEnricher::new(16);
        let ctx = PlanContext::new("alice");
        let fresh = enricher.enrich_plan(&export_plan(), &ctx).unwrap();
        let cached = enricher.enrich_plan(&export_plan(), &ctx).unwrap();
        assert!(!fresh.from_cache);
        assert!(cached.from_cache);
        assert_eq!(fresh.tags, cached.tags);

        let stats = enricher.cache_stats().unwrap();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert!(TagEnricher::new(0).cache_stats().is_none());
    }
}
