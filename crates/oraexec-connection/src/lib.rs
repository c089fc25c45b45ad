//! oraexec connection - connection lifecycle for the command executor
//!
//! Two independent ways of obtaining a connection live here:
//!
//! - [`ConnectionBroker`] follows an explicit [`ConnectionPolicy`]: open a
//!   fresh connection or require one supplied by the caller, then close it or
//!   hand it back afterwards.
//! - [`ConnectionCache`] keeps at most one live connection per connection
//!   string and hands it out to every caller asking for that key.
//!
//! Neither serializes use of a connection. Callers sharing a handle must not
//! run two commands on it at once.

mod broker;
pub mod cache;
mod handle;
mod policy;

#[cfg(test)]
mod mock;

pub use broker::ConnectionBroker;
pub use cache::{CacheConfig, CacheLease, CacheStats, ConnectionCache};
pub use handle::ConnectionHandle;
pub use policy::ConnectionPolicy;
