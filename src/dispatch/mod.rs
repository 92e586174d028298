//! Tool dispatch: validation, action routing, remote invocation, and result
//! normalization.
//!
//! Flow: [`ToolDispatcher::dispatch`] parses the tool name, runs
//! [`validate::validate`], checks the session in the registry, then either
//! calls the remote client directly (`command_execute`, `code_execute`) or
//! goes through the [`router::ActionRouter`]. Every outcome is normalized into
//! one [`ActionResult`].

pub mod dispatcher;
pub mod error;
pub mod router;
pub mod validate;

pub use dispatcher::ToolDispatcher;
pub use error::{ErrorInfo, ErrorKind, ToolError};
pub use validate::ToolCall;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The fixed set of tools exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    SessionCreate,
    SessionList,
    SessionDelete,
    CommandExecute,
    CodeExecute,
    FileOperations,
    BrowserAutomation,
    UiOperations,
}

impl ToolName {
    pub const ALL: [ToolName; 8] = [
        ToolName::SessionCreate,
        ToolName::SessionList,
        ToolName::SessionDelete,
        ToolName::CommandExecute,
        ToolName::CodeExecute,
        ToolName::FileOperations,
        ToolName::BrowserAutomation,
        ToolName::UiOperations,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::SessionCreate => "session_create",
            ToolName::SessionList => "session_list",
            ToolName::SessionDelete => "session_delete",
            ToolName::CommandExecute => "command_execute",
            ToolName::CodeExecute => "code_execute",
            ToolName::FileOperations => "file_operations",
            ToolName::BrowserAutomation => "browser_automation",
            ToolName::UiOperations => "ui_operations",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// One tool invocation as received from the host.
///
/// `session_id` and `action` may be given here or inside `parameters`; the
/// top-level value wins.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActionRequest {
    pub tool: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl ActionRequest {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            ..Self::default()
        }
    }

    /// Build a request from a flat argument object, the shape LLM tool calls
    /// arrive in. Non-object arguments are treated as empty.
    pub fn from_args(tool: impl Into<String>, args: Value) -> Self {
        let parameters = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            tool: tool.into(),
            session_id: None,
            action: None,
            parameters,
        }
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    /// Session id from the top level, falling back to the parameter map.
    pub fn effective_session_id(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .or_else(|| self.parameters.get("session_id").and_then(Value::as_str))
    }

    /// Action from the top level, falling back to the parameter map.
    pub fn effective_action(&self) -> Option<&str> {
        self.action
            .as_deref()
            .or_else(|| self.parameters.get("action").and_then(Value::as_str))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Failure,
}

/// Normalized outcome of one dispatch: exactly one of `payload` or `error`.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub request_id: Uuid,
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// Whether re-issuing the same request is safe.
    pub retry_safe: bool,
    pub elapsed_ms: u64,
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
