//! Connection reuse policy

use serde::{Deserialize, Serialize};

use oraexec_core::ExecError;

/// Whether a call opens its own connection or uses one supplied by the
/// caller, and whether the connection is closed when the call finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionPolicy {
    #[default]
    CreateAndClose,
    CreateAndKeepAlive,
    ReuseExistingAndClose,
    ReuseExistingAndKeepAlive,
}

impl ConnectionPolicy {
    pub const ALL: [ConnectionPolicy; 4] = [
        ConnectionPolicy::CreateAndClose,
        ConnectionPolicy::CreateAndKeepAlive,
        ConnectionPolicy::ReuseExistingAndClose,
        ConnectionPolicy::ReuseExistingAndKeepAlive,
    ];

    /// Caller-facing numeric code
    pub fn code(&self) -> i32 {
        match self {
            ConnectionPolicy::CreateAndClose => 0,
            ConnectionPolicy::CreateAndKeepAlive => 1,
            ConnectionPolicy::ReuseExistingAndClose => 2,
            ConnectionPolicy::ReuseExistingAndKeepAlive => 3,
        }
    }

    /// Whether a brand-new connection is opened for the call
    pub fn creates_new(&self) -> bool {
        matches!(
            self,
            ConnectionPolicy::CreateAndClose | ConnectionPolicy::CreateAndKeepAlive
        )
    }

    /// Whether the connection is closed when the call finishes
    pub fn closes_after(&self) -> bool {
        matches!(
            self,
            ConnectionPolicy::CreateAndClose | ConnectionPolicy::ReuseExistingAndClose
        )
    }
}

impl TryFrom<i32> for ConnectionPolicy {
    type Error = ExecError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        ConnectionPolicy::ALL
            .into_iter()
            .find(|p| p.code() == code)
            .ok_or_else(|| {
                ExecError::InvalidArgument(format!("unknown connection policy code: {}", code))
            })
    }
}
