//! Mock driver shared by the unit tests of this crate

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use oraexec_core::{
    Connection, ConnectionString, DatabaseDriver, ExecError, NativeCommand, Result,
};
use tokio::sync::Barrier;
use uuid::Uuid;

/// Mock connection for testing
pub(crate) struct MockConnection {
    session_id: Uuid,
    closed: AtomicBool,
}

impl MockConnection {
    fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    fn session_id(&self) -> Uuid {
        self.session_id
    }

    async fn execute_non_query(&self, _command: &mut NativeCommand) -> Result<u64> {
        Ok(0)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Mock driver that counts connections opened
///
/// Connection strings whose data source is `unreachable` fail to open. With
/// a rendezvous set, every `connect` waits until that many are in flight,
/// which forces concurrent callers to race.
pub(crate) struct MockDriver {
    opened: AtomicUsize,
    rendezvous: Option<Barrier>,
}

impl MockDriver {
    pub(crate) fn new() -> Self {
        Self {
            opened: AtomicUsize::new(0),
            rendezvous: None,
        }
    }

    pub(crate) fn with_rendezvous(n: usize) -> Self {
        Self {
            opened: AtomicUsize::new(0),
            rendezvous: Some(Barrier::new(n)),
        }
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self, connection_string: &ConnectionString) -> Result<Arc<dyn Connection>> {
        if connection_string.data_source() == Some("unreachable") {
            return Err(ExecError::Execution("TNS: could not resolve the connect identifier".into()));
        }
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection::new()))
    }
}

pub(crate) fn connection_string(data_source: &str) -> ConnectionString {
    ConnectionString::parse(&format!("Data Source={};User Id=app;Password=secret", data_source))
        .unwrap()
}
