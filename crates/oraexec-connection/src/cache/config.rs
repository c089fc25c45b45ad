//! Cache configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a connection cache
///
/// Controls whether cached connections expire after sitting unused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Idle time in milliseconds after which a cached connection is closed
    /// and replaced. `None` keeps connections until the cache is cleared.
    max_idle_ms: Option<u64>,
}

impl CacheConfig {
    /// Create a configuration whose connections never expire
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle expiry in milliseconds
    pub fn with_max_idle_ms(mut self, max_idle_ms: u64) -> Self {
        self.max_idle_ms = Some(max_idle_ms);
        self
    }

    /// Get the idle expiry as a Duration if set
    pub fn max_idle(&self) -> Option<Duration> {
        self.max_idle_ms.map(Duration::from_millis)
    }
}
