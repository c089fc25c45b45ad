//! Borrowed connection handles

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use oraexec_core::{Connection, ConnectionString, Result};

/// A non-owning handle to a live connection
///
/// Handles are cheap to clone and are how a kept-alive connection travels
/// from one call to the next. Whoever's policy says "close" closes it;
/// dropping a handle never does.
#[derive(Clone)]
pub struct ConnectionHandle {
    session_id: Uuid,
    connection_string: String,
    connection: Arc<dyn Connection>,
}

impl ConnectionHandle {
    pub fn new(connection_string: &ConnectionString, connection: Arc<dyn Connection>) -> Self {
        Self {
            session_id: connection.session_id(),
            connection_string: connection_string.redacted(),
            connection,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Redacted connection string the handle was opened with
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Whether the underlying connection is still open
    pub fn is_live(&self) -> bool {
        !self.connection.is_closed()
    }

    /// Whether two handles refer to the same connection object
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        Arc::ptr_eq(&self.connection, &other.connection)
    }

    /// Close the underlying connection. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.connection.is_closed() {
            return Ok(());
        }
        tracing::info!(session_id = %self.session_id, "closing connection");
        self.connection.close().await
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("session_id", &self.session_id)
            .field("connection_string", &self.connection_string)
            .field("driver", &self.connection.driver_name())
            .field("live", &self.is_live())
            .finish()
    }
}
