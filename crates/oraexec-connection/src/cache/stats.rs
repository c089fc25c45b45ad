//! Cache statistics types

use serde::{Deserialize, Serialize};

/// Counters describing a connection cache's activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of connections currently cached
    entries: usize,
    /// Connections opened and retained by the cache
    opened: u64,
    /// Lookups answered by an already cached connection
    reused: u64,
    /// Redundant connections closed after losing an open race, plus cached
    /// connections found closed and dropped
    discarded: u64,
    /// Connections closed for exceeding the idle expiry
    expired: u64,
}

impl CacheStats {
    pub fn new(entries: usize, opened: u64, reused: u64, discarded: u64, expired: u64) -> Self {
        Self {
            entries,
            opened,
            reused,
            discarded,
            expired,
        }
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn opened(&self) -> u64 {
        self.opened
    }

    pub fn reused(&self) -> u64 {
        self.reused
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn expired(&self) -> u64 {
        self.expired
    }

    /// Fraction of lookups served from the cache (0.0 to 1.0)
    ///
    /// Returns 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.opened + self.reused;
        if lookups == 0 {
            0.0
        } else {
            self.reused as f64 / lookups as f64
        }
    }
}
