use std::time::Duration;
use thiserror::Error;

use crate::toggle::Action;

/// Failures reported by the operating system bindings in [`crate::platform`].
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{0} is only supported on Windows")]
    Unsupported(&'static str),

    #[error("Service control manager error: {0}")]
    Service(String),

    #[error("Gateway discovery failed: {0}")]
    Gateway(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Task scheduler error: {0}")]
    Scheduler(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Failures of a single toggle cycle. Each maps onto a process exit code.
#[derive(Error, Debug)]
pub enum ToggleError {
    #[error("Invalid gateway pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Service check failed: {0}")]
    ServiceCheck(#[source] PlatformError),

    #[error("Failed to {action} {service}: {source}")]
    ServiceControl {
        action: Action,
        service: String,
        #[source]
        source: PlatformError,
    },

    #[error("Timed out after {}s waiting for {service} to {action}", .timeout.as_secs())]
    Timeout {
        action: Action,
        service: String,
        timeout: Duration,
    },

    #[error("Interrupted while waiting for {service} to {action}")]
    Interrupted { action: Action, service: String },
}

impl ToggleError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToggleError::InvalidPattern { .. } => 1,
            ToggleError::ServiceCheck(_) => 2,
            ToggleError::ServiceControl { .. }
            | ToggleError::Timeout { .. }
            | ToggleError::Interrupted { .. } => 3,
        }
    }
}
