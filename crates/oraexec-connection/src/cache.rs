//! String-keyed connection cache
//!
//! The cache holds at most one live connection per connection string. It is
//! an ordinary value owned by the host application and injected into the
//! executor, so tests and separate executors can each have their own.
//!
//! # Example
//!
//! ```ignore
//! use oraexec_connection::cache::{CacheConfig, ConnectionCache};
//!
//! let config = CacheConfig::new().with_max_idle_ms(300_000);
//! let cache = ConnectionCache::new(driver, config);
//! let handle = cache.get_or_open(&connection_string).await?;
//! // The connection stays cached after use
//! cache.clear().await;
//! ```

mod cache;
mod config;
mod stats;


pub use cache::{CacheLease, ConnectionCache};
pub use config::CacheConfig;
pub use stats::CacheStats;
