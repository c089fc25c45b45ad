//! Execution stages

use std::fmt;

/// Where a call is in its lifecycle
///
/// A call moves forward through the stages in order. Any failure moves it
/// to `Failed` and nothing after that point happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStage {
    Idle,
    ConnectionAcquired,
    ParametersBound,
    Executed,
    ResultMaterialized,
    Released,
    Failed,
}

impl ExecutionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStage::Idle => "idle",
            ExecutionStage::ConnectionAcquired => "connection acquired",
            ExecutionStage::ParametersBound => "parameters bound",
            ExecutionStage::Executed => "executed",
            ExecutionStage::ResultMaterialized => "result materialized",
            ExecutionStage::Released => "released",
            ExecutionStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStage::Released | ExecutionStage::Failed)
    }
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records the stage of one call and traces each transition
#[derive(Debug)]
pub(crate) struct StageTracker {
    current: ExecutionStage,
}

impl StageTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: ExecutionStage::Idle,
        }
    }

    pub(crate) fn current(&self) -> ExecutionStage {
        self.current
    }

    pub(crate) fn advance(&mut self, next: ExecutionStage) {
        tracing::trace!(from = %self.current, to = %next, "stage transition");
        self.current = next;
    }

    /// Mark the call failed, returning the stage it failed in
    pub(crate) fn fail(&mut self) -> ExecutionStage {
        let failed_in = self.current;
        self.advance(ExecutionStage::Failed);
        failed_in
    }
}
