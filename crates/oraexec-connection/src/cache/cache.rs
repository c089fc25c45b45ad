//! Connection cache implementation

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use oraexec_core::{Connection, ConnectionString, DatabaseDriver, Result};
use parking_lot::Mutex;
use tokio::time::Instant;

use super::config::CacheConfig;
use super::stats::CacheStats;
use crate::ConnectionHandle;
use crate::broker::open;

/// Use bookkeeping shared by a cache entry and the leases taken on it
struct Usage {
    in_flight: AtomicUsize,
    last_used_at: Mutex<Instant>,
}

impl Usage {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            in_flight: AtomicUsize::new(0),
            last_used_at: Mutex::new(Instant::now()),
        })
    }

    fn begin(&self) {
        *self.last_used_at.lock() = Instant::now();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn end(&self) {
        *self.last_used_at.lock() = Instant::now();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Idle means nobody holds a lease and the last one ended over `max_idle` ago
    fn idle_longer_than(&self, max_idle: Duration) -> bool {
        let last_used_at = self.last_used_at.lock();
        self.in_flight.load(Ordering::SeqCst) == 0 && last_used_at.elapsed() > max_idle
    }
}

/// Internal wrapper for cached connections with metadata
struct CacheEntry {
    handle: ConnectionHandle,
    usage: Arc<Usage>,
}

impl CacheEntry {
    fn new(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            usage: Usage::new(),
        }
    }

    fn lease(&self) -> CacheLease {
        self.usage.begin();
        CacheLease {
            handle: self.handle.clone(),
            usage: self.usage.clone(),
        }
    }

    fn is_expired(&self, config: &CacheConfig) -> bool {
        config
            .max_idle()
            .is_some_and(|max_idle| self.usage.idle_longer_than(max_idle))
    }
}

/// A cached connection checked out for the duration of a call
///
/// While any lease on an entry is alive the entry is in use and never
/// expires. Dropping the lease ends the use and restarts the idle clock.
pub struct CacheLease {
    handle: ConnectionHandle,
    usage: Arc<Usage>,
}

impl CacheLease {
    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        self.handle.connection()
    }
}

impl Drop for CacheLease {
    fn drop(&mut self) {
        self.usage.end();
    }
}

impl fmt::Debug for CacheLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLease")
            .field("handle", &self.handle)
            .field("in_flight", &self.usage.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

/// Outcome of looking a key up under the lock
enum Lookup {
    Hit(CacheLease),
    /// No usable entry; any stale connection that was removed must be closed
    Miss(Option<ConnectionHandle>),
}

/// A cache holding at most one live connection per connection string
///
/// Lookups never hold the lock across an await. Two callers missing the same
/// key concurrently both open a connection; the first to finish is retained
/// and the other closes its own and uses the retained one.
pub struct ConnectionCache {
    driver: Arc<dyn DatabaseDriver>,
    config: CacheConfig,
    entries: Mutex<HashMap<ConnectionString, CacheEntry>>,
    opened: AtomicU64,
    reused: AtomicU64,
    discarded: AtomicU64,
    expired: AtomicU64,
}

impl ConnectionCache {
    /// Create an empty cache opening connections through `driver`
    pub fn new(driver: Arc<dyn DatabaseDriver>, config: CacheConfig) -> Self {
        Self {
            driver,
            config,
            entries: Mutex::new(HashMap::new()),
            opened: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        }
    }

    /// Get the cached connection for `connection_string`, opening it if
    /// there is none.
    ///
    /// A cached connection that has been closed, or that exceeded the idle
    /// expiry, is closed and replaced by a fresh one.
    pub async fn get_or_open(&self, connection_string: &ConnectionString) -> Result<ConnectionHandle> {
        let lease = self.checkout(connection_string).await?;
        Ok(lease.handle().clone())
    }

    /// Like [`get_or_open`](Self::get_or_open), but the entry counts as in
    /// use until the returned lease is dropped.
    #[tracing::instrument(skip(self, connection_string), fields(connection = %connection_string))]
    pub async fn checkout(&self, connection_string: &ConnectionString) -> Result<CacheLease> {
        match self.lookup(connection_string) {
            Lookup::Hit(lease) => {
                tracing::debug!(session_id = %lease.handle().session_id(), "cached connection reused");
                return Ok(lease);
            }
            Lookup::Miss(Some(stale)) => {
                if let Err(e) = stale.close().await {
                    tracing::warn!(error = %e, session_id = %stale.session_id(), "failed to close stale cached connection");
                }
            }
            Lookup::Miss(None) => {}
        }

        let fresh = open(self.driver.as_ref(), connection_string).await?;

        let (lease, won) = {
            let mut entries = self.entries.lock();
            match entries.get(connection_string) {
                Some(entry) if entry.handle.is_live() => (entry.lease(), false),
                _ => {
                    let entry = CacheEntry::new(fresh.clone());
                    let lease = entry.lease();
                    entries.insert(connection_string.clone(), entry);
                    (lease, true)
                }
            }
        };

        if won {
            self.opened.fetch_add(1, Ordering::SeqCst);
            tracing::info!(session_id = %fresh.session_id(), "connection opened and cached");
        } else {
            self.discarded.fetch_add(1, Ordering::SeqCst);
            self.reused.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(
                session_id = %fresh.session_id(),
                kept_session_id = %lease.handle().session_id(),
                "lost open race, discarding redundant connection"
            );
            if let Err(e) = fresh.close().await {
                tracing::warn!(error = %e, "failed to close redundant connection");
            }
        }
        Ok(lease)
    }

    fn lookup(&self, connection_string: &ConnectionString) -> Lookup {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(connection_string) else {
            return Lookup::Miss(None);
        };

        if !entry.handle.is_live() {
            self.discarded.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(session_id = %entry.handle.session_id(), "cached connection was closed");
            entries.remove(connection_string);
            return Lookup::Miss(None);
        }

        if entry.is_expired(&self.config) {
            self.expired.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(session_id = %entry.handle.session_id(), "cached connection expired");
            let stale = entries.remove(connection_string).map(|e| e.handle);
            return Lookup::Miss(stale);
        }

        self.reused.fetch_add(1, Ordering::SeqCst);
        Lookup::Hit(entry.lease())
    }

    /// Get the cached connection for a key without opening one
    pub fn get(&self, connection_string: &ConnectionString) -> Option<ConnectionHandle> {
        self.entries
            .lock()
            .get(connection_string)
            .map(|entry| entry.handle.clone())
    }

    /// Close and remove `handle` because it can no longer be trusted, such as
    /// after a command on it was aborted mid-call.
    ///
    /// The entry for `connection_string` is removed only if it still holds
    /// this connection, so a replacement opened meanwhile stays cached.
    /// Returns whether an entry was removed.
    #[tracing::instrument(skip(self, connection_string, handle), fields(session_id = %handle.session_id()))]
    pub async fn invalidate(&self, connection_string: &ConnectionString, handle: &ConnectionHandle) -> bool {
        let removed = {
            let mut entries = self.entries.lock();
            let cached = entries
                .get(connection_string)
                .is_some_and(|entry| entry.handle.same_connection(handle));
            cached && entries.remove(connection_string).is_some()
        };

        if removed {
            self.discarded.fetch_add(1, Ordering::SeqCst);
        }
        if let Err(e) = handle.close().await {
            tracing::warn!(error = %e, "failed to close invalidated connection");
        }
        tracing::info!(removed, "cached connection invalidated");
        removed
    }

    /// Close and remove every cached connection that is not in use and whose
    /// idle time exceeds the configured expiry, along with any that are
    /// already closed. Returns the number of entries removed.
    #[tracing::instrument(skip(self))]
    pub async fn evict_idle(&self) -> usize {
        let evicted: Vec<ConnectionHandle> = {
            let mut entries = self.entries.lock();
            let keys: Vec<ConnectionString> = entries
                .iter()
                .filter(|(_, entry)| !entry.handle.is_live() || entry.is_expired(&self.config))
                .map(|(key, _)| key.clone())
                .collect();
            keys.iter()
                .filter_map(|key| entries.remove(key))
                .map(|entry| entry.handle)
                .collect()
        };

        for handle in &evicted {
            if handle.is_live() {
                self.expired.fetch_add(1, Ordering::SeqCst);
            } else {
                self.discarded.fetch_add(1, Ordering::SeqCst);
            }
            if let Err(e) = handle.close().await {
                tracing::warn!(error = %e, session_id = %handle.session_id(), "failed to close evicted connection");
            }
        }

        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), "evicted idle cached connections");
        }
        evicted.len()
    }

    /// Close and remove every cached connection. Returns the number of
    /// entries removed.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self) -> usize {
        let drained: Vec<CacheEntry> = {
            let mut entries = self.entries.lock();
            entries.drain().map(|(_, entry)| entry).collect()
        };

        for entry in &drained {
            if let Err(e) = entry.handle.close().await {
                tracing::warn!(error = %e, session_id = %entry.handle.session_id(), "failed to close cached connection");
            }
        }

        tracing::info!(count = drained.len(), "connection cache cleared");
        drained.len()
    }

    /// Number of cached connections
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.len(),
            self.opened.load(Ordering::SeqCst),
            self.reused.load(Ordering::SeqCst),
            self.discarded.load(Ordering::SeqCst),
            self.expired.load(Ordering::SeqCst),
        )
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
