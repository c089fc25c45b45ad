//! oraexec command - run parameterized Oracle commands and shape their output
//!
//! This crate wires the pieces of a call together: the parameter codec
//! turns caller parameter specs into driver parameters, the executor runs
//! the command on a connection from the broker or the cache, and the result
//! materializer renders the output parameters as a row count, the raw
//! parameter list, XML or JSON. Ref cursors returned in output parameters are
//! drained by the cursor reader.

mod config;
pub mod cursor_reader;
mod executor;
pub mod parameters;
mod request;
pub mod result;

pub use config::ExecutorConfig;
pub use cursor_reader::{RowMap, drain, drain_parameter, rows_to_json};
pub use executor::{CommandExecutor, ExecutionStage};
pub use parameters::{ParameterDef, ParameterSpec, bind_all, coerce_json, from_native, to_native};
pub use request::{CommandRequest, ExecutionOptions, ExecutionResult, OutputSpec};
pub use result::{Payload, ReturnShape, XmlDocument, XmlElement, materialize};

// Re-exported so callers need a single dependency
pub use oraexec_connection::{
    CacheConfig, CacheLease, CacheStats, ConnectionCache, ConnectionHandle, ConnectionPolicy,
};
pub use oraexec_core::{
    CommandKind, ConnectionString, DatabaseDriver, ErrorKind, ExecError, OracleDbType, Result, Value,
};
