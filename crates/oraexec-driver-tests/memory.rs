//! In-memory scripted driver
//!
//! Commands are matched by their text, trimmed and compared
//! case-insensitively, against scripts registered with [`MemoryDriver::on`].
//! A script receives the bound command and the session it runs on, fills in
//! output values and returns the affected row count. Ref cursors opened
//! through a [`Session`] stay readable until that session closes.
//!
//! Connection strings are interpreted loosely:
//!
//! - a missing `Data Source` fails with ORA-12162
//! - `Data Source=unreachable` fails with ORA-12154
//! - `Password=wrong` fails with ORA-01017

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use oraexec_core::{
    ColumnMeta, Connection, ConnectionString, CursorSource, DatabaseDriver, ExecError,
    NativeCommand, RefCursor, Result, Value,
};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

/// A scripted command body
pub type Script = Arc<dyn Fn(&mut NativeCommand, &Session) -> Result<u64> + Send + Sync>;

struct ScriptEntry {
    delay: Option<Duration>,
    script: Script,
}

type Scripts = Arc<RwLock<HashMap<String, ScriptEntry>>>;

/// A command as the driver received it, before the script ran
#[derive(Debug, Clone)]
pub struct ExecutedCommand {
    pub session_id: Uuid,
    pub command: NativeCommand,
}

/// Driver serving scripted commands from memory
pub struct MemoryDriver {
    scripts: Scripts,
    sessions: Arc<Mutex<Vec<Session>>>,
    executed: Arc<Mutex<Vec<ExecutedCommand>>>,
    connect_delay: Option<Duration>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(Mutex::new(Vec::new())),
            executed: Arc::new(Mutex::new(Vec::new())),
            connect_delay: None,
        }
    }

    /// Delay every connect, so that concurrent callers overlap
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Register the script run for `command_text`
    pub fn on<F>(self, command_text: &str, script: F) -> Self
    where
        F: Fn(&mut NativeCommand, &Session) -> Result<u64> + Send + Sync + 'static,
    {
        self.register(command_text, None, Arc::new(script))
    }

    /// Register a script that only completes after `delay`
    pub fn on_delayed<F>(self, command_text: &str, delay: Duration, script: F) -> Self
    where
        F: Fn(&mut NativeCommand, &Session) -> Result<u64> + Send + Sync + 'static,
    {
        self.register(command_text, Some(delay), Arc::new(script))
    }

    fn register(self, command_text: &str, delay: Option<Duration>, script: Script) -> Self {
        self.scripts
            .write()
            .insert(script_key(command_text), ScriptEntry { delay, script });
        self
    }

    /// Number of sessions opened so far
    pub fn opened(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Number of sessions not yet closed
    pub fn open_sessions(&self) -> usize {
        self.sessions.lock().iter().filter(|s| !s.is_closed()).count()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().clone()
    }

    /// Every command received, in arrival order
    pub fn executed(&self) -> Vec<ExecutedCommand> {
        self.executed.lock().clone()
    }

    pub fn last_command(&self) -> Option<NativeCommand> {
        self.executed.lock().last().map(|e| e.command.clone())
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn script_key(command_text: &str) -> String {
    command_text.trim().to_lowercase()
}

#[async_trait]
impl DatabaseDriver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self, connection_string: &ConnectionString) -> Result<Arc<dyn Connection>> {
        match connection_string.data_source() {
            None => {
                return Err(ExecError::Connection(
                    "ORA-12162: TNS:net service name is incorrectly specified".into(),
                ));
            }
            Some("unreachable") => {
                return Err(ExecError::Connection(
                    "ORA-12154: TNS:could not resolve the connect identifier specified".into(),
                ));
            }
            Some(_) => {}
        }
        if connection_string.password() == Some("wrong") {
            return Err(ExecError::Connection(
                "ORA-01017: invalid username/password; logon denied".into(),
            ));
        }

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }

        let session = Session::new();
        tracing::debug!(session_id = %session.id(), "memory session opened");
        self.sessions.lock().push(session.clone());
        Ok(Arc::new(MemoryConnection {
            session,
            scripts: self.scripts.clone(),
            executed: self.executed.clone(),
        }))
    }
}

struct MemoryConnection {
    session: Session,
    scripts: Scripts,
    executed: Arc<Mutex<Vec<ExecutedCommand>>>,
}

#[async_trait]
impl Connection for MemoryConnection {
    fn driver_name(&self) -> &str {
        "memory"
    }

    fn session_id(&self) -> Uuid {
        self.session.id()
    }

    async fn execute_non_query(&self, command: &mut NativeCommand) -> Result<u64> {
        if self.session.is_closed() {
            return Err(ExecError::Connection(
                "ORA-03114: not connected to ORACLE".into(),
            ));
        }

        let (delay, script) = {
            let scripts = self.scripts.read();
            match scripts.get(&script_key(&command.text)) {
                Some(entry) => (entry.delay, entry.script.clone()),
                None => {
                    return Err(ExecError::Execution(format!(
                        "ORA-06550: no script for '{}'",
                        command.text.trim()
                    )));
                }
            }
        };

        self.executed.lock().push(ExecutedCommand {
            session_id: self.session.id(),
            command: command.clone(),
        });

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
            if self.session.is_closed() {
                return Err(ExecError::Connection(
                    "ORA-03113: end-of-file on communication channel".into(),
                ));
            }
        }
        script(command, &self.session)
    }

    async fn close(&self) -> Result<()> {
        self.session.close();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.session.is_closed()
    }
}

struct SessionState {
    id: Uuid,
    closed: AtomicBool,
    next_cursor: AtomicU32,
    cursors: Mutex<HashMap<u32, Vec<Vec<Value>>>>,
}

#[async_trait]
impl CursorSource for SessionState {
    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn fetch_all(&self, cursor_id: u32) -> Result<Vec<Vec<Value>>> {
        self.cursors.lock().remove(&cursor_id).ok_or_else(|| {
            ExecError::StaleCursor(format!(
                "cursor {} is not open on session {}",
                cursor_id, self.id
            ))
        })
    }
}

/// One server session, shared by its connection and the cursors it opened
#[derive(Clone)]
pub struct Session {
    state: Arc<SessionState>,
}

impl Session {
    fn new() -> Self {
        Self {
            state: Arc::new(SessionState {
                id: Uuid::new_v4(),
                closed: AtomicBool::new(false),
                next_cursor: AtomicU32::new(1),
                cursors: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.state.id
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        if !self.state.closed.swap(true, Ordering::SeqCst) {
            self.state.cursors.lock().clear();
            tracing::debug!(session_id = %self.state.id, "memory session closed");
        }
    }

    /// Open a cursor over `rows` with columns given as `(name, type)` pairs
    pub fn open_cursor(&self, columns: &[(&str, &str)], rows: Vec<Vec<Value>>) -> Value {
        let cursor_id = self.state.next_cursor.fetch_add(1, Ordering::SeqCst);
        self.state.cursors.lock().insert(cursor_id, rows);
        let columns = columns
            .iter()
            .enumerate()
            .map(|(ordinal, (name, data_type))| ColumnMeta::new(*name, *data_type, ordinal))
            .collect();
        let source: Arc<dyn CursorSource> = self.state.clone();
        Value::Cursor(RefCursor::new(cursor_id, self.state.id, columns, source))
    }

    /// Whether `cursor` was opened on this session
    pub fn owns(&self, cursor: &RefCursor) -> bool {
        cursor.session_id() == self.state.id
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.state.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
