//! Caller-facing error taxonomy.
//!
//! Every failure a dispatch can end in is a [`ToolError`], and every
//! `ToolError` maps to exactly one [`ErrorKind`]. Remote faults arrive as
//! `anyhow::Error` and are folded in by [`ToolError::remote`], keeping the
//! full remote message.

use super::ToolName;
use crate::session::{RegistryError, UnknownEnvironment};
use serde::Serialize;
use std::fmt;

/// Stable error kinds, serialized by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ValidationError,
    UnknownTool,
    UnsupportedAction,
    SessionNotFound,
    EnvironmentMismatch,
    InvalidEnvironmentType,
    RemoteProvisionError,
    RemoteOperationError,
    TimeoutError,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::UnknownTool => "UnknownTool",
            ErrorKind::UnsupportedAction => "UnsupportedAction",
            ErrorKind::SessionNotFound => "SessionNotFound",
            ErrorKind::EnvironmentMismatch => "EnvironmentMismatch",
            ErrorKind::InvalidEnvironmentType => "InvalidEnvironmentType",
            ErrorKind::RemoteProvisionError => "RemoteProvisionError",
            ErrorKind::RemoteOperationError => "RemoteOperationError",
            ErrorKind::TimeoutError => "TimeoutError",
            ErrorKind::Cancelled => "Cancelled",
        }
    }

    /// True for failures decided locally, before any remote call.
    pub fn is_local(self) -> bool {
        matches!(
            self,
            ErrorKind::ValidationError
                | ErrorKind::UnknownTool
                | ErrorKind::UnsupportedAction
                | ErrorKind::SessionNotFound
                | ErrorKind::EnvironmentMismatch
                | ErrorKind::InvalidEnvironmentType
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("invalid parameter '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("unsupported action '{action}' for {tool} (supported: {supported})")]
    UnsupportedAction {
        tool: ToolName,
        action: String,
        supported: String,
    },

    #[error("session '{0}' not found or already deleted")]
    SessionNotFound(String),

    #[error("{tool} requires a {required} session, but session '{session_id}' is {actual}")]
    EnvironmentMismatch {
        tool: ToolName,
        session_id: String,
        required: String,
        actual: String,
    },

    #[error("{0}")]
    InvalidEnvironmentType(String),

    #[error("{0}")]
    RemoteProvision(String),

    #[error("{operation} failed: {message}")]
    RemoteOperation { operation: String, message: String },

    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("{operation} timed out: {message}")]
    RemoteTimeout { operation: String, message: String },

    #[error("{0} was cancelled before a result was obtained; remote completion is undetermined")]
    Cancelled(String),
}

impl ToolError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported_action(tool: ToolName, action: &str, supported: &[&str]) -> Self {
        ToolError::UnsupportedAction {
            tool,
            action: action.to_string(),
            supported: supported.join(", "),
        }
    }

    /// Fold a remote fault raised while serving `tool` into the taxonomy.
    /// Transport timeouts are timeouts; other `session_create` failures are
    /// provisioning errors and everything else is an operation error.
    pub fn remote(tool: ToolName, operation: &str, err: anyhow::Error) -> Self {
        let message = format!("{err:#}");
        if is_transport_timeout(&err) {
            return ToolError::RemoteTimeout {
                operation: operation.to_string(),
                message,
            };
        }
        match tool {
            ToolName::SessionCreate => ToolError::RemoteProvision(message),
            _ => ToolError::RemoteOperation {
                operation: operation.to_string(),
                message,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::Validation { .. } => ErrorKind::ValidationError,
            ToolError::UnknownTool(_) => ErrorKind::UnknownTool,
            ToolError::UnsupportedAction { .. } => ErrorKind::UnsupportedAction,
            ToolError::SessionNotFound(_) => ErrorKind::SessionNotFound,
            ToolError::EnvironmentMismatch { .. } => ErrorKind::EnvironmentMismatch,
            ToolError::InvalidEnvironmentType(_) => ErrorKind::InvalidEnvironmentType,
            ToolError::RemoteProvision(_) => ErrorKind::RemoteProvisionError,
            ToolError::RemoteOperation { .. } => ErrorKind::RemoteOperationError,
            ToolError::Timeout { .. } | ToolError::RemoteTimeout { .. } => ErrorKind::TimeoutError,
            ToolError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }
}

/// True when `err` was caused by an HTTP request running out of time.
fn is_transport_timeout(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .any(reqwest::Error::is_timeout)
}

impl From<RegistryError> for ToolError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => ToolError::SessionNotFound(id),
            RegistryError::Provision { ref cause, .. } if is_transport_timeout(cause) => {
                ToolError::RemoteTimeout {
                    operation: "session_create".to_string(),
                    message: err.to_string(),
                }
            }
            RegistryError::Provision { .. } => ToolError::RemoteProvision(err.to_string()),
            RegistryError::Delete { ref id, ref cause } => {
                let operation = format!("session_delete({id})");
                if is_transport_timeout(cause) {
                    ToolError::RemoteTimeout {
                        operation,
                        message: err.to_string(),
                    }
                } else {
                    ToolError::RemoteOperation {
                        operation,
                        message: err.to_string(),
                    }
                }
            }
        }
    }
}

impl From<UnknownEnvironment> for ToolError {
    fn from(err: UnknownEnvironment) -> Self {
        ToolError::InvalidEnvironmentType(err.to_string())
    }
}

/// Error as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ToolError> for ErrorInfo {
    fn from(err: &ToolError) -> Self {
        ErrorInfo {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
