//! Opt-in prediction cache.
//!
//! Scoring is deterministic, so the result for a given input against a
//! given artifact never changes. [`PredictionCache`] memoises those results
//! in moka's async LRU + TTL cache, keyed on a content hash of (artifact
//! checksum, text, price, units, channel). The artifact checksum is part of
//! the key, so a reload that changes the model can never be answered from
//! entries computed under the previous one.
//!
//! Without a [`CacheConfig`] passed to the predictor no cache is allocated.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;

use crate::scoring::Score;
use crate::telemetry;

/// Configuration for the prediction cache.
///
/// ```rust
/// # use triad::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(10_000)
///     .ttl(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Everything a score depends on besides the rules themselves.
#[derive(Debug, Clone, Copy)]
pub struct CacheKey<'a> {
    pub artifact_checksum: &'a str,
    pub text: &'a str,
    pub price: f64,
    pub units: i64,
    pub channel: &'a str,
}

impl CacheKey<'_> {
    /// Content hash of the key.
    ///
    /// `DefaultHasher` is stable within a process, which is all an
    /// in-memory cache needs. Price is hashed by bit pattern; the channel
    /// is lowercased to match the scoring lookup.
    fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.artifact_checksum.hash(&mut hasher);
        self.text.hash(&mut hasher);
        self.price.to_bits().hash(&mut hasher);
        self.units.hash(&mut hasher);
        self.channel.to_lowercase().hash(&mut hasher);
        hasher.finish()
    }
}

/// In-memory cache of scored inputs.
pub struct PredictionCache {
    cache: Cache<u64, Score>,
}

impl PredictionCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }

    /// Look up a cached score. Emits hit/miss metrics.
    pub async fn get(&self, key: &CacheKey<'_>) -> Option<Score> {
        match self.cache.get(&key.digest()).await {
            Some(score) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(score)
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    pub async fn insert(&self, key: &CacheKey<'_>, score: Score) {
        self.cache.insert(key.digest(), score).await;
    }

    /// Approximate number of entries (moka applies writes lazily).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

impl std::fmt::Debug for PredictionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key<'a>(checksum: &'a str, text: &'a str, channel: &'a str) -> CacheKey<'a> {
        CacheKey {
            artifact_checksum: checksum,
            text,
            price: 10.0,
            units: 1,
            channel,
        }
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(key("c", "t", "amazon").digest(), key("c", "t", "amazon").digest());
    }

    #[test]
    fn digest_differs_on_checksum() {
        assert_ne!(key("c1", "t", "amazon").digest(), key("c2", "t", "amazon").digest());
    }

    #[test]
    fn digest_differs_on_features() {
        let base = key("c", "t", "amazon");
        let mut other = base;
        other.price = 10.5;
        assert_ne!(base.digest(), other.digest());
        let mut other = base;
        other.units = 2;
        assert_ne!(base.digest(), other.digest());
    }

    #[test]
    fn channel_case_does_not_matter() {
        assert_eq!(key("c", "t", "AMAZON").digest(), key("c", "t", "amazon").digest());
    }
}
