//! oraexec core - shared types and driver traits for the command executor
//!
//! This crate provides the types every other oraexec crate depends on:
//!
//! - `OracleDbType` - the caller-facing parameter type codes and their wire types
//! - `Value`, `LobStream`, `RefCursor` - parameter and column values
//! - `NativeCommand`, `NativeParameter` - commands in the form a driver binds them
//! - `Connection`, `DatabaseDriver` - the seam a database driver implements
//! - `ConnectionString` - parsing and log-safe rendering of connection strings
//! - `ExecError` - the error taxonomy

mod command;
mod connection;
mod connection_string;
mod cursor;
mod db_type;
mod error;
mod types;

pub use command::*;
pub use connection::*;
pub use connection_string::*;
pub use cursor::*;
pub use db_type::*;
pub use error::*;
pub use types::*;
