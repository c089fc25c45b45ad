//! Executor configuration

use oraexec_connection::CacheConfig;
use oraexec_core::{ExecError, Result};
use serde::{Deserialize, Serialize};

/// Seconds a command may run before it is aborted, unless a request says
/// otherwise
pub const DEFAULT_COMMAND_TIMEOUT_SECONDS: u64 = 30;

/// Defaults applied by a [`CommandExecutor`](crate::CommandExecutor) and the
/// configuration of its connection cache.
///
/// Every field is optional in TOML:
///
/// ```toml
/// command_timeout_seconds = 60
/// bind_by_name = true
/// throw_on_failure = false
/// propagate_caller_errors = true
///
/// [cache]
/// max_idle_ms = 300000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Command timeout in seconds; 0 disables the timeout
    pub command_timeout_seconds: u64,
    /// Bind parameters by name instead of by position
    pub bind_by_name: bool,
    /// Return failures as errors instead of unsuccessful results
    pub throw_on_failure: bool,
    /// Return caller errors as errors even when `throw_on_failure` is off
    pub propagate_caller_errors: bool,
    /// Connection cache settings
    pub cache: CacheConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command_timeout_seconds: DEFAULT_COMMAND_TIMEOUT_SECONDS,
            bind_by_name: false,
            throw_on_failure: false,
            propagate_caller_errors: false,
            cache: CacheConfig::default(),
        }
    }
}

impl ExecutorConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| ExecError::InvalidArgument(format!("invalid executor configuration: {}", e)))
    }

    /// Render the configuration as TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| {
            ExecError::ResultProcessing(format!("cannot serialize executor configuration: {}", e))
        })
    }
}
