// Search response cache.
//
// Caches listing pages keyed by the canonical omit-empty query projection,
// so identical searches within the TTL are served without touching the
// network. Bounded by entry count with least-recently-used eviction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::models::ListingPage;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            default_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicUsize,
    misses: AtomicUsize,
    insertions: AtomicUsize,
    evictions: AtomicUsize,
    expirations: AtomicUsize,
}

// Point-in-time snapshot of the counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hits: usize,
    pub misses: usize,
    pub insertions: usize,
    pub evictions: usize,
    pub expirations: usize,
}

struct CacheEntry {
    page: ListingPage,
    created_at: Instant,
    ttl: Duration,
    last_accessed: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

pub struct SearchCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    stats: CacheStats,
}

impl SearchCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    // Store a page under its query key. `ttl` of `None` uses the configured
    // default. Evicts the least-recently-used entry when full.
    pub fn store(&self, key: &str, page: ListingPage, ttl: Option<Duration>) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.config.max_entries {
            self.evict_lru();
        }

        let now = Instant::now();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                page,
                created_at: now,
                ttl: ttl.unwrap_or(self.config.default_ttl),
                last_accessed: now,
            },
        );
        self.stats.insertions.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(%key, "cached search page");
    }

    // Fetch a page if present and not expired. An expired entry is removed
    // and counted as both an expiration and a miss.
    pub fn get(&self, key: &str) -> Option<ListingPage> {
        let expired = match self.entries.get_mut(key) {
            Some(mut entry) => {
                if entry.is_expired() {
                    true
                } else {
                    entry.last_accessed = Instant::now();
                    self.stats.hits.fetch_add(1, Ordering::SeqCst);
                    return Some(entry.page.clone());
                }
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::SeqCst);
                return None;
            }
        };

        if expired {
            // Entry guard is dropped before removal.
            self.entries.remove(key);
            self.stats.expirations.fetch_add(1, Ordering::SeqCst);
            self.stats.misses.fetch_add(1, Ordering::SeqCst);
        }
        None
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // Drop everything, e.g. after a mutation that changes search results.
    pub fn invalidate_all(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.entries.len(),
            hits: self.stats.hits.load(Ordering::SeqCst),
            misses: self.stats.misses.load(Ordering::SeqCst),
            insertions: self.stats.insertions.load(Ordering::SeqCst),
            evictions: self.stats.evictions.load(Ordering::SeqCst),
            expirations: self.stats.expirations.load(Ordering::SeqCst),
        }
    }

    fn evict_lru(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.last_accessed)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.stats.evictions.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(%key, "evicted least-recently-used search page");
        }
    }
}
