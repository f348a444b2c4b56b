//! Error types for Stuffing Core
//!
//! Configuration-class errors are surfaced to the direct caller as
//! distinguishable variants and are never silently substituted with a
//! default. Nothing in this crate retries automatically.

use thiserror::Error;

/// Result type alias for Stuffing operations
pub type Result<T> = std::result::Result<T, StuffingError>;

/// Main error type for Stuffing operations
#[derive(Error, Debug)]
pub enum StuffingError {
    #[error("unknown app family: {0}")]
    UnknownFamily(String),

    #[error("app family '{0}' has no default launch target")]
    MissingLaunchTarget(String),

    #[error("switching app families requires a multi-family manager")]
    SwitchingUnsupported,

    #[error("another app family switch is already in progress")]
    SwitchInProgress,

    #[error("dynamic app manager has not been initialized")]
    Uninitialized,

    #[error("identity store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("pre-switch hook failed while switching from '{from}' to '{to}': {reason}")]
    HookFailed {
        from: String,
        to: String,
        reason: String,
    },

    #[error("unknown launch target: {0}")]
    UnknownLaunchTarget(String),

    #[error("no app delegate registered for app family '{0}'")]
    DelegateUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StuffingError {
    /// Whether the error reports a deployment misconfiguration, as opposed
    /// to a transient or environmental failure.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            StuffingError::UnknownFamily(_)
                | StuffingError::MissingLaunchTarget(_)
                | StuffingError::SwitchingUnsupported
                | StuffingError::UnknownLaunchTarget(_)
                | StuffingError::DelegateUnavailable(_)
                | StuffingError::InvalidConfig(_)
        )
    }

    /// Whether the caller may retry after the in-flight operation settles.
    pub fn is_transient(&self) -> bool {
        matches!(self, StuffingError::SwitchInProgress)
    }
}
