// Bounded FIFO verdict cache.
//
// Maps cache keys to fused verdict snapshots. Eviction is strictly
// insertion-ordered (FIFO, not LRU): when full, the oldest-inserted entry
// goes, regardless of how recently it was read. One mutex guards
// lookup/insert/evict — contention is negligible next to the network
// calls the cache saves. There is deliberately no locking between "check"
// and "compute and insert": a duplicate concurrent computation for the
// same key is tolerated, the later insert simply overwrites.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use crate::fusion::FusedVerdict;

/// Default entry bound.
pub const DEFAULT_CAPACITY: usize = 300;

pub struct VerdictCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

struct CacheInner {
    map: HashMap<String, FusedVerdict>,
    /// Keys in insertion order; front is the eviction candidate.
    order: VecDeque<String>,
}

impl VerdictCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity,
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Look up a verdict snapshot by key.
    pub fn get(&self, key: &str) -> Option<FusedVerdict> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.map.get(key).cloned()
    }

    /// Insert a verdict, evicting the oldest entry when at capacity.
    /// Re-inserting an existing key overwrites in place and keeps the
    /// key's original position in the eviction order.
    pub fn insert(&self, key: String, verdict: FusedVerdict) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if inner.map.insert(key.clone(), verdict).is_some() {
            return;
        }
        if inner.order.len() == self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
            }
        }
        inner.order.push_back(key);
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::{Category, CategoryScores};

    fn verdict(toxicity: f64) -> FusedVerdict {
        FusedVerdict {
            is_malicious: false,
            scores: CategoryScores {
                toxicity,
                hate_speech: 0.0,
                profanity: 0.0,
                threat: 0.0,
                violence: 0.0,
                sexual: 0.0,
            },
            confidence: toxicity,
            category: Category::Safe,
            matched_terms: Vec::new(),
            safety_verdict: None,
            violated_categories: Vec::new(),
            reasoning: String::new(),
        }
    }

    #[test]
    fn get_returns_what_was_inserted() {
        let cache = VerdictCache::new(4);
        cache.insert("k1".to_string(), verdict(10.0));
        assert_eq!(cache.get("k1").unwrap().scores.toxicity, 10.0);
        assert!(cache.get("k2").is_none());
    }

    #[test]
    fn evicts_oldest_inserted_first() {
        let cache = VerdictCache::new(2);
        cache.insert("k1".to_string(), verdict(1.0));
        cache.insert("k2".to_string(), verdict(2.0));

        // Reading k1 must NOT protect it: this is FIFO, not LRU.
        assert!(cache.get("k1").is_some());

        cache.insert("k3".to_string(), verdict(3.0));
        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert!(cache.get("k3").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reinsert_overwrites_without_growing() {
        let cache = VerdictCache::new(2);
        cache.insert("k1".to_string(), verdict(1.0));
        cache.insert("k1".to_string(), verdict(9.0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k1").unwrap().scores.toxicity, 9.0);
    }

    #[test]
    fn stays_bounded_under_many_inserts() {
        let cache = VerdictCache::new(3);
        for i in 0..50 {
            cache.insert(format!("k{i}"), verdict(i as f64));
        }
        assert_eq!(cache.len(), 3);
        // Only the three newest survive.
        assert!(cache.get("k47").is_some());
        assert!(cache.get("k49").is_some());
        assert!(cache.get("k46").is_none());
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let cache = VerdictCache::new(0);
        cache.insert("k1".to_string(), verdict(1.0));
        assert_eq!(cache.len(), 1);
        cache.insert("k2".to_string(), verdict(2.0));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("k2").is_some());
    }
}
