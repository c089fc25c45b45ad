//! Driver and connection traits

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{ConnectionString, NativeCommand, Result};

/// A live database session
///
/// A connection is not safe for concurrent commands: callers sharing one
/// (for example through the connection cache) must serialize their use.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name
    fn driver_name(&self) -> &str;

    /// Identifier of the server session, stable for the connection's lifetime
    fn session_id(&self) -> Uuid;

    /// Execute a command without reading a row stream.
    ///
    /// Binds `command.parameters`, runs the command, writes the values of
    /// output parameters back into `command.parameters`, and returns the
    /// number of affected rows. Drivers honour `command.timeout_seconds`.
    async fn execute_non_query(&self, command: &mut NativeCommand) -> Result<u64>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// Core driver trait: opens connections from a connection string
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Open a new connection
    async fn connect(&self, connection_string: &ConnectionString) -> Result<Arc<dyn Connection>>;
}
