//! Error types for mcast_inspector
//!
//! Only configuration and contract problems are errors. Anything caused by
//! device output is turned into data (empty sections or findings).

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Vendor outside the command catalog
    #[error("unsupported vendor: {0}")]
    UnsupportedVendor(String),

    /// Check type outside querier/groups/routes
    #[error("unsupported check type: {0}")]
    UnsupportedCheck(String),

    /// A parser was handed a section it does not own
    #[error("internal contract violated: {0}")]
    InternalContract(String),

    /// Transport collaborator could not return output
    #[error("transport error on {device_id} running `{command}`: {reason}")]
    Transport {
        device_id: String,
        command: String,
        reason: String,
    },

    /// Monitor configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn transport(device_id: &str, command: &str, reason: impl ToString) -> Self {
        Error::Transport {
            device_id: device_id.to_string(),
            command: command.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error stems from the device or network rather than the setup
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}
