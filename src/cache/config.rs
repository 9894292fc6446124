//! Question cache configuration.
//!
//! Controlled via the `[cache]` table of `qanda.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CAPACITY: usize = 1_000;
const DEFAULT_FRESHNESS_SECONDS: u64 = 20 * 60;
const DEFAULT_SHARDS: usize = 16;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve single-question reads from the in-process cache.
    pub enabled: bool,
    /// Maximum number of cached questions across all shards.
    pub capacity: usize,
    /// Age at which an entry is treated as a miss.
    pub freshness_seconds: u64,
    /// Number of independently locked shards.
    pub shards: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            freshness_seconds: DEFAULT_FRESHNESS_SECONDS,
            shards: DEFAULT_SHARDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            capacity: settings.capacity.get(),
            freshness_seconds: settings.freshness.as_secs(),
            shards: settings.shards.get(),
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Shard count, clamped to `1..=capacity` so no shard is permanently empty.
    pub fn shard_count(&self) -> usize {
        self.shards.clamp(1, self.capacity_non_zero().get())
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_seconds)
    }
}
