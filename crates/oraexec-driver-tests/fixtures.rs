//! Shared fixtures for the scenario tests.
//!
//! [`scripted_driver`] returns a [`MemoryDriver`] that knows a small set of
//! commands (an insert, a few stored procedures, a PL/SQL block opening a
//! ref cursor). Tests build an executor over it with [`executor`] and then
//! inspect the driver to see which sessions were opened, closed or reused.
//!
//! # Usage
//!
//! ```rust,ignore
//! use oraexec_driver_tests::fixtures::{self, commands, CONNECTION_STRING};
//!
//! #[tokio::test]
//! async fn test_insert() -> anyhow::Result<()> {
//!     let (executor, driver) = fixtures::executor();
//!     let request = CommandRequest::new(CONNECTION_STRING, commands::INSERT);
//!     // ...
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Once};
use std::time::Duration;

use oraexec_command::CommandExecutor;
use oraexec_core::{ExecError, LobStream, NativeCommand, Value};
use tracing_subscriber::EnvFilter;

use crate::memory::{MemoryDriver, Session};

/// A connection string the memory driver accepts
pub const CONNECTION_STRING: &str =
    "Data Source=//localhost:1521/XEPDB1;User Id=app;Password=secret";

/// A second, distinct cache key for the same database
pub const OTHER_CONNECTION_STRING: &str =
    "Data Source=//localhost:1521/XEPDB1;User Id=report;Password=secret";

/// A connection string whose host cannot be resolved
pub const UNREACHABLE_CONNECTION_STRING: &str =
    "Data Source=unreachable;User Id=app;Password=secret";

/// Text of the document returned by [`commands::GET_DOCUMENT`]
pub const DOCUMENT_TEXT: &str = "Grüße aus der Datenbank & mehr\nzweite Zeile";

/// Command texts known to [`scripted_driver`]
pub mod commands {
    /// Inserts one row; needs input `p`
    pub const INSERT: &str = "INSERT INTO T(c) VALUES (:p)";
    /// Sets output `returnVal` to `hello`
    pub const GET_GREETING: &str = "PKG_TEST.GET_GREETING";
    /// Opens output cursor `cur` over one row `COL1 = 1`
    pub const OPEN_CURSOR: &str = "BEGIN OPEN :cur FOR SELECT col1 FROM test; END;";
    /// Takes input cursor `p_cur`, which must belong to the calling session,
    /// and sets output `p_columns` to its column count
    pub const CONSUME_CURSOR: &str = "PKG_TEST.CONSUME_CURSOR";
    /// Sets CLOB output `doc` to a LOB stream holding the document text
    pub const GET_DOCUMENT: &str = "PKG_TEST.GET_DOCUMENT";
    /// Sets CLOB output `doc` to the raw UTF-16LE bytes of the document text
    pub const GET_DOCUMENT_BYTES: &str = "PKG_TEST.GET_DOCUMENT_BYTES";
    /// Copies input `p_in` to output `p_out`
    pub const ECHO: &str = "BEGIN :p_out := :p_in; END;";
    /// Fails with ORA-20001
    pub const RAISE: &str = "PKG_TEST.RAISE";
    /// Completes after a minute
    pub const SLOW: &str = "PKG_TEST.SLOW";
}

static INIT_TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// The filter comes from `RUST_LOG`, defaulting to `warn`.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A memory driver with every command of [`commands`] scripted
pub fn scripted_driver() -> MemoryDriver {
    MemoryDriver::new()
        .on(commands::INSERT, |command, _| {
            if command.parameter("p").is_none() {
                return Err(ExecError::Execution(
                    "ORA-01008: not all variables bound".into(),
                ));
            }
            Ok(1)
        })
        .on(commands::GET_GREETING, |command, _| {
            command.set_output("returnVal", Value::from("hello"))?;
            Ok(0)
        })
        .on(commands::OPEN_CURSOR, |command, session| {
            let cursor = session.open_cursor(&[("COL1", "NUMBER")], vec![vec![Value::Int32(1)]]);
            command.set_output("cur", cursor)?;
            Ok(0)
        })
        .on(commands::CONSUME_CURSOR, consume_cursor)
        .on(commands::GET_DOCUMENT, |command, _| {
            command.set_output("doc", Value::Lob(LobStream::from_text(DOCUMENT_TEXT)))?;
            Ok(0)
        })
        .on(commands::GET_DOCUMENT_BYTES, |command, _| {
            let bytes: Vec<u8> = DOCUMENT_TEXT
                .encode_utf16()
                .flat_map(u16::to_le_bytes)
                .collect();
            command.set_output("doc", Value::Bytes(bytes))?;
            Ok(0)
        })
        .on(commands::ECHO, |command, _| {
            let input = command
                .parameter("p_in")
                .map(|p| p.value.clone())
                .unwrap_or(Value::Null);
            command.set_output("p_out", input)?;
            Ok(0)
        })
        .on(commands::RAISE, |_, _| {
            Err(ExecError::Execution(
                "ORA-20001: application error raised by PKG_TEST.RAISE".into(),
            ))
        })
        .on_delayed(commands::SLOW, Duration::from_secs(60), |_, _| Ok(0))
}

fn consume_cursor(command: &mut NativeCommand, session: &Session) -> oraexec_core::Result<u64> {
    let columns = match command.parameter("p_cur").map(|p| &p.value) {
        Some(Value::Cursor(cursor)) if session.owns(cursor) && cursor.is_open() => {
            cursor.column_count()
        }
        _ => return Err(ExecError::Execution("ORA-01001: invalid cursor".into())),
    };
    command.set_output("p_columns", Value::Int32(columns as i32))?;
    Ok(0)
}

/// An executor with default configuration over [`scripted_driver`]
pub fn executor() -> (CommandExecutor, Arc<MemoryDriver>) {
    init_tracing();
    let driver = Arc::new(scripted_driver());
    (CommandExecutor::new(driver.clone()), driver)
}
