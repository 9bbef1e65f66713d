//! TTL cache for aggregate results.

use crate::aggregator::AggregateResult;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    result: AggregateResult,
    cached_at: Instant,
}

/// Thread-safe TTL cache mapping IP strings to previously computed
/// aggregate results.
///
/// A uniform TTL applies to every entry and lazy expiry is the only
/// destruction path; there is no invalidation API. Backend trouble is
/// never surfaced: a poisoned lock reads as a miss on `get` and a silent
/// no-op on `put`.
pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ResultCache {
    /// Create a new result cache.
    pub fn new(ttl_seconds: u64, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_seconds),
            max_entries,
        }
    }

    /// Get a cached result if present and not expired.
    pub fn get(&self, ip: &str) -> Option<AggregateResult> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(ip)?;

        if entry.cached_at.elapsed() > self.ttl {
            // Left in place to avoid a write lock; eviction handles it
            None
        } else {
            Some(entry.result.clone())
        }
    }

    /// Store a result. Best-effort: a failed write never fails the query.
    pub fn put(&self, ip: &str, result: AggregateResult) {
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.max_entries && !entries.contains_key(ip) {
                let ttl = self.ttl;
                entries.retain(|_, e| e.cached_at.elapsed() <= ttl);

                // Still at capacity after the expired sweep: drop the oldest
                if entries.len() >= self.max_entries {
                    if let Some(oldest) = entries
                        .iter()
                        .min_by_key(|(_, e)| e.cached_at)
                        .map(|(k, _)| k.clone())
                    {
                        entries.remove(&oldest);
                    }
                }
            }

            entries.insert(
                ip.to_string(),
                CacheEntry {
                    result,
                    cached_at: Instant::now(),
                },
            );
        }
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
