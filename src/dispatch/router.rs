//! Action routing for the multi-action tools.
//!
//! Each typed action becomes exactly one [`SandboxClient`] call. The raw
//! remote reply is then reshaped into the payload callers see.

use super::{ToolError, ToolName};
use crate::sandbox::{BrowserAction, FileAction, SandboxClient, UiAction};
use crate::session::{EnvironmentType, Session};
use anyhow::Context;
use base64::Engine as _;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_SCREENSHOT_MIME: &str = "image/png";

pub struct ActionRouter {
    client: Arc<dyn SandboxClient>,
}

impl ActionRouter {
    pub fn new(client: Arc<dyn SandboxClient>) -> Self {
        Self { client }
    }

    pub async fn file(&self, session: &Session, action: &FileAction) -> Result<Value, ToolError> {
        let remote = |e| ToolError::remote(ToolName::FileOperations, action.name(), e);

        match action {
            FileAction::Read { file_path } => {
                let content = self
                    .client
                    .read_file(&session.id, file_path)
                    .await
                    .map_err(remote)?;
                Ok(json!({
                    "file_path": file_path,
                    "size": content.len(),
                    "content": content,
                }))
            }
            FileAction::Write { file_path, content } => {
                self.client
                    .write_file(&session.id, file_path, content)
                    .await
                    .map_err(remote)?;
                Ok(json!({ "file_path": file_path, "size": content.len() }))
            }
            FileAction::List { directory_path } => {
                let entries = self
                    .client
                    .list_directory(&session.id, directory_path)
                    .await
                    .map_err(remote)?;
                Ok(json!({
                    "directory_path": directory_path,
                    "count": entries.len(),
                    "entries": entries,
                }))
            }
        }
    }

    /// Browser steps need a `browser` session; the check runs before any
    /// remote call.
    pub async fn browser(
        &self,
        session: &Session,
        action: &BrowserAction,
    ) -> Result<Value, ToolError> {
        require_environment(ToolName::BrowserAutomation, session, EnvironmentType::Browser)?;

        tracing::debug!("browser {} on session {}", action.name(), session.id);
        let remote = |e| ToolError::remote(ToolName::BrowserAutomation, action.name(), e);
        let raw = self
            .client
            .browser_action(&session.id, action)
            .await
            .map_err(remote)?;

        match action {
            BrowserAction::Screenshot { .. } => screenshot_payload(&raw).map_err(remote),
            _ => Ok(passthrough(action.name(), raw)),
        }
    }

    pub async fn ui(&self, session: &Session, action: &UiAction) -> Result<Value, ToolError> {
        tracing::debug!("ui {} on session {}", action.name(), session.id);
        let remote = |e| ToolError::remote(ToolName::UiOperations, action.name(), e);
        let raw = self
            .client
            .ui_action(&session.id, action)
            .await
            .map_err(remote)?;

        match action {
            UiAction::Screenshot => screenshot_payload(&raw).map_err(remote),
            _ => Ok(passthrough(action.name(), raw)),
        }
    }
}

fn require_environment(
    tool: ToolName,
    session: &Session,
    required: EnvironmentType,
) -> Result<(), ToolError> {
    if session.environment_type == required {
        return Ok(());
    }
    tracing::warn!(
        "{tool} rejected: session {} is {}, needs {required}",
        session.id,
        session.environment_type
    );
    Err(ToolError::EnvironmentMismatch {
        tool,
        session_id: session.id.clone(),
        required: required.to_string(),
        actual: session.environment_type.to_string(),
    })
}

fn passthrough(action: &str, raw: Value) -> Value {
    json!({ "action": action, "result": raw })
}

/// Normalize a screenshot reply into `{mime_type, data_base64, size}`.
///
/// The image may arrive under `image`, `data` or `screenshot`, as a bare
/// string, or as a `data:` URL.
fn screenshot_payload(raw: &Value) -> anyhow::Result<Value> {
    let encoded = ["image", "data", "screenshot"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_str))
        .or_else(|| raw.as_str())
        .context("screenshot response carried no image data")?;

    let (url_mime, encoded) = match encoded
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
    {
        Some((mime, data)) => (Some(mime), data),
        None => (None, encoded),
    };
    let encoded = encoded.trim();

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .context("screenshot data is not valid base64")?;

    let mime_type = ["mimeType", "mime_type"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_str))
        .or(url_mime)
        .unwrap_or(DEFAULT_SCREENSHOT_MIME);

    Ok(json!({
        "mime_type": mime_type,
        "data_base64": encoded,
        "size": bytes.len(),
    }))
}
