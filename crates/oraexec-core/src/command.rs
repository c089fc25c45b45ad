//! Driver-native command and parameter records

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{ExecError, NativeType, OracleDbType, Result, Value};

/// How the command text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum CommandKind {
    /// SQL or an anonymous PL/SQL block
    #[default]
    DirectCommand = 1,
    /// Name of a stored procedure
    StoredProcedure = 4,
}

/// Direction of a bound parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
}

/// A parameter in the form the driver binds it
#[derive(Debug, Clone, PartialEq)]
pub struct NativeParameter {
    /// Bind name without a leading colon
    pub name: String,
    /// Declared logical type
    pub db_type: OracleDbType,
    /// Wire type the driver binds
    pub native_type: NativeType,
    pub direction: ParameterDirection,
    /// Buffer size for variable-length output
    pub size: Option<u32>,
    /// Input value, or the value written back by the driver for output
    pub value: Value,
}

impl NativeParameter {
    pub fn is_output(&self) -> bool {
        self.direction == ParameterDirection::Output
    }
}

/// A command ready to hand to a driver
#[derive(Debug, Clone)]
pub struct NativeCommand {
    pub text: String,
    pub kind: CommandKind,
    /// Driver-side timeout; 0 means no limit
    pub timeout_seconds: u64,
    /// Bind by name when true, by position otherwise
    pub bind_by_name: bool,
    /// Inputs first, outputs after, in binding order
    pub parameters: Vec<NativeParameter>,
}

impl NativeCommand {
    pub fn new(text: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            text: text.into(),
            kind,
            timeout_seconds: 0,
            bind_by_name: false,
            parameters: Vec::new(),
        }
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_bind_by_name(mut self, bind_by_name: bool) -> Self {
        self.bind_by_name = bind_by_name;
        self
    }

    /// Look up a parameter by bind name (case-insensitive)
    pub fn parameter(&self, name: &str) -> Option<&NativeParameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Output parameters, in binding order
    pub fn output_parameters(&self) -> impl Iterator<Item = &NativeParameter> {
        self.parameters.iter().filter(|p| p.is_output())
    }

    /// Write the value of an output parameter. Used by drivers after execution.
    pub fn set_output(&mut self, name: &str, value: Value) -> Result<()> {
        let param = self
            .parameters
            .iter_mut()
            .find(|p| p.is_output() && p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ExecError::Execution(format!("no output parameter named '{}' is bound", name))
            })?;
        param.value = value;
        Ok(())
    }

    /// Write the value of the output parameter at `position` (0-based over
    /// all parameters). Used by drivers binding by position.
    pub fn set_output_at(&mut self, position: usize, value: Value) -> Result<()> {
        match self.parameters.get_mut(position) {
            Some(param) if param.is_output() => {
                param.value = value;
                Ok(())
            }
            _ => Err(ExecError::Execution(format!(
                "no output parameter is bound at position {}",
                position + 1
            ))),
        }
    }
}
