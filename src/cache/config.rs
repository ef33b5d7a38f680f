//! Cache configuration.
//!
//! Controls the pagination cache via the `[cache]` section of `bookapi.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every lookup computes; nothing is stored.
    pub enabled: bool,
    /// Maximum number of cached pages before LRU eviction.
    pub capacity: usize,
    /// Optional expiry hint. Correctness never depends on it.
    pub ttl: Option<Duration>,
    /// Serialize concurrent misses on the same key behind one computation.
    pub single_flight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            ttl: None,
            single_flight: true,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            capacity: settings.capacity,
            ttl: settings.ttl,
            single_flight: settings.single_flight,
        }
    }
}

impl CacheConfig {
    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
