//! Request and response records of the executor

use oraexec_connection::{ConnectionHandle, ConnectionPolicy};
use oraexec_core::CommandKind;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_COMMAND_TIMEOUT_SECONDS;
use crate::parameters::ParameterSpec;
use crate::result::{Payload, ReturnShape};

/// What to run, where, and with which inputs
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Connection string; also the connection cache key
    pub connection_string: String,
    /// SQL text, PL/SQL block or stored procedure name
    pub command_text: String,
    pub command_kind: CommandKind,
    /// Seconds before the command is aborted; 0 disables the timeout
    pub timeout_seconds: u64,
    pub bind_by_name: bool,
    pub policy: ConnectionPolicy,
    pub input_parameters: Vec<ParameterSpec>,
    /// Connection from an earlier call, used by the reuse policies
    pub existing_connection: Option<ConnectionHandle>,
}

impl CommandRequest {
    pub fn new(connection_string: impl Into<String>, command_text: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            command_text: command_text.into(),
            command_kind: CommandKind::DirectCommand,
            timeout_seconds: DEFAULT_COMMAND_TIMEOUT_SECONDS,
            bind_by_name: false,
            policy: ConnectionPolicy::CreateAndClose,
            input_parameters: Vec::new(),
            existing_connection: None,
        }
    }

    /// A request calling the stored procedure `name`
    pub fn procedure(connection_string: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(connection_string, name).with_kind(CommandKind::StoredProcedure)
    }

    pub fn with_kind(mut self, kind: CommandKind) -> Self {
        self.command_kind = kind;
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_bind_by_name(mut self, bind_by_name: bool) -> Self {
        self.bind_by_name = bind_by_name;
        self
    }

    pub fn with_policy(mut self, policy: ConnectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_input(mut self, parameter: ParameterSpec) -> Self {
        self.input_parameters.push(parameter);
        self
    }

    pub fn with_existing_connection(mut self, handle: ConnectionHandle) -> Self {
        self.existing_connection = Some(handle);
        self
    }
}

/// Requested output shape and the output parameters to bind
#[derive(Debug, Clone, Default)]
pub struct OutputSpec {
    pub return_shape: ReturnShape,
    pub output_parameters: Vec<ParameterSpec>,
}

impl OutputSpec {
    pub fn new(return_shape: ReturnShape) -> Self {
        Self {
            return_shape,
            output_parameters: Vec::new(),
        }
    }

    pub fn with_output(mut self, parameter: ParameterSpec) -> Self {
        self.output_parameters.push(parameter);
        self
    }
}

/// How failures are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Return every failure as an error instead of an unsuccessful result
    pub throw_on_failure: bool,
    /// Return caller errors (bad arguments, bad parameters, unsupported
    /// shapes) as errors even when `throw_on_failure` is off
    pub propagate_caller_errors: bool,
}

impl ExecutionOptions {
    pub fn throwing() -> Self {
        Self {
            throw_on_failure: true,
            propagate_caller_errors: true,
        }
    }
}

/// Outcome of a call
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    /// Description of the failure when `success` is false
    pub message: Option<String>,
    pub payload: Option<Payload>,
    /// The connection, when the call kept it alive
    pub connection: Option<ConnectionHandle>,
}

impl ExecutionResult {
    pub fn succeeded(payload: Payload, connection: Option<ConnectionHandle>) -> Self {
        Self {
            success: true,
            message: None,
            payload: Some(payload),
            connection,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            payload: None,
            connection: None,
        }
    }
}
