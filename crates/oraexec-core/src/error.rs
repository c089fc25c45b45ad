//! Error types for command execution

use thiserror::Error;

/// Core error type for command execution
#[derive(Error, Debug)]
pub enum ExecError {
    /// The connection could not be opened or acquired
    #[error("Connection error: {0}")]
    Connection(String),

    /// A parameter could not be bound (bad name, type or size)
    #[error("Parameter binding error: {0}")]
    ParameterBinding(String),

    /// The driver failed while running the command
    #[error("Execution error: {0}")]
    Execution(String),

    /// The command exceeded its configured timeout
    #[error("Execution error: command timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Output could not be materialized into the requested shape
    #[error("Result processing error: {0}")]
    ResultProcessing(String),

    #[error("Unsupported return shape: {0}")]
    UnsupportedReturnShape(String),

    /// The caller misused the API (missing connection, wrong runtime type, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A ref cursor was read after its owning session closed, or read twice
    #[error("Stale cursor: {0}")]
    StaleCursor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of an [`ExecError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    ParameterBinding,
    Execution,
    ResultProcessing,
    UnsupportedReturnShape,
    InvalidArgument,
}

impl ErrorKind {
    /// Whether this kind describes a programming mistake by the caller
    /// rather than an operational failure (network, database, timeout).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::ParameterBinding | ErrorKind::UnsupportedReturnShape | ErrorKind::InvalidArgument
        )
    }
}

impl ExecError {
    /// Get the taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::Connection(_) | ExecError::StaleCursor(_) => ErrorKind::Connection,
            ExecError::ParameterBinding(_) => ErrorKind::ParameterBinding,
            ExecError::Execution(_) | ExecError::Timeout { .. } => ErrorKind::Execution,
            ExecError::ResultProcessing(_) | ExecError::Io(_) | ExecError::Serialization(_) => {
                ErrorKind::ResultProcessing
            }
            ExecError::UnsupportedReturnShape(_) => ErrorKind::UnsupportedReturnShape,
            ExecError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Shorthand for `self.kind().is_caller_error()`
    pub fn is_caller_error(&self) -> bool {
        self.kind().is_caller_error()
    }
}

/// Result type alias for command execution
pub type Result<T> = std::result::Result<T, ExecError>;
