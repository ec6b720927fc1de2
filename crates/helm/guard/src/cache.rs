//! Memoization of enrichment results.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::GuardResult;
use crate::tag::{PlanContext, RiskTag};

/// Cache key: BLAKE3 over the canonical JSON of everything that can affect tagging.
pub type CacheKey = blake3::Hash;

/// Hit/miss counters for the enrichment cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Bounded concurrent cache of tag sets.
///
/// When full, the oldest insertion is dropped. Losing an entry only costs a
/// recomputation. Lookups go straight to the map; inserts are serialized on
/// the insertion-order queue so the entry count never exceeds `capacity`.
pub struct EnrichmentCache {
    capacity: usize,
    entries: DashMap<CacheKey, Arc<Vec<RiskTag>>>,
    order: Mutex<VecDeque<CacheKey>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EnrichmentCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: DashMap::with_capacity(capacity.min(4096)),
            order: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Key for a (plan, context) pair. The request timestamp never influences
    /// tags, so it is left out of the key.
    pub fn key(plan: &Value, context: &PlanContext) -> GuardResult<CacheKey> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&serde_json::to_vec(plan)?);
        hasher.update(b"\x00");
        hasher.update(context.caller_id.as_bytes());
        hasher.update(b"\x00");
        hasher.update(&serde_json::to_vec(&context.attributes)?);
        Ok(hasher.finalize())
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<RiskTag>>> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(entry.value()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `tags` under `key`. Replacing an existing key keeps its age.
    pub fn insert(&self, key: CacheKey, tags: Arc<Vec<RiskTag>>) {
        let mut order = self.order.lock();
        if self.entries.contains_key(&key) {
            self.entries.insert(key, tags);
            return;
        }
        if order.len() >= self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
                trace!(key = %oldest.to_hex(), "enrichment cache entry evicted");
            }
        }
        order.push_back(key);
        self.entries.insert(key, tags);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        let mut order = self.order.lock();
        order.clear();
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
