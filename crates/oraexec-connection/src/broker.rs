//! Policy-driven connection acquisition

use std::sync::Arc;

use oraexec_core::{ConnectionString, DatabaseDriver, ExecError, Result};

use crate::{ConnectionHandle, ConnectionPolicy};

/// Opens or validates connections according to a [`ConnectionPolicy`]
#[derive(Clone)]
pub struct ConnectionBroker {
    driver: Arc<dyn DatabaseDriver>,
}

impl ConnectionBroker {
    pub fn new(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }

    /// Get a live connection for a call.
    ///
    /// Create policies always open a new connection, ignoring `existing`.
    /// Reuse policies require `existing` to be a live connection and fail
    /// with [`ExecError::InvalidArgument`] otherwise.
    #[tracing::instrument(skip(self, connection_string, existing), fields(connection = %connection_string, policy = ?policy))]
    pub async fn acquire(
        &self,
        connection_string: &ConnectionString,
        policy: ConnectionPolicy,
        existing: Option<&ConnectionHandle>,
    ) -> Result<ConnectionHandle> {
        if policy.creates_new() {
            let handle = open(self.driver.as_ref(), connection_string).await?;
            tracing::info!(session_id = %handle.session_id(), "connection opened");
            return Ok(handle);
        }
        self.reuse(policy, existing)
    }

    /// Validate a caller-supplied connection for a reuse policy.
    ///
    /// No connection string is involved: the connection is already open.
    pub fn reuse(
        &self,
        policy: ConnectionPolicy,
        existing: Option<&ConnectionHandle>,
    ) -> Result<ConnectionHandle> {
        match existing {
            Some(handle) if handle.is_live() => {
                tracing::debug!(session_id = %handle.session_id(), policy = ?policy, "reusing caller connection");
                Ok(handle.clone())
            }
            Some(handle) => Err(ExecError::InvalidArgument(format!(
                "policy {:?} requires a live connection but session {} is closed",
                policy,
                handle.session_id()
            ))),
            None => Err(ExecError::InvalidArgument(format!(
                "policy {:?} requires an existing connection but none was supplied",
                policy
            ))),
        }
    }

    /// Finish with a connection.
    ///
    /// Close policies close the connection and return `None`; keep-alive
    /// policies leave it open and return the handle for a follow-up call.
    #[tracing::instrument(skip(self, handle), fields(session_id = %handle.session_id(), policy = ?policy))]
    pub async fn release(
        &self,
        handle: ConnectionHandle,
        policy: ConnectionPolicy,
    ) -> Result<Option<ConnectionHandle>> {
        if policy.closes_after() {
            handle.close().await?;
            Ok(None)
        } else {
            tracing::debug!("keeping connection alive");
            Ok(Some(handle))
        }
    }
}

/// Open a connection, reporting any driver failure as a connection error
pub(crate) async fn open(
    driver: &dyn DatabaseDriver,
    connection_string: &ConnectionString,
) -> Result<ConnectionHandle> {
    let connection = driver.connect(connection_string).await.map_err(|e| {
        tracing::error!(error = %e, driver = driver.name(), "failed to connect");
        match e {
            ExecError::Connection(_) => e,
            other => ExecError::Connection(other.to_string()),
        }
    })?;
    Ok(ConnectionHandle::new(connection_string, connection))
}
