//! Sandbox abstraction layer.
//!
//! Defines the [`SandboxClient`] trait that the remote cloud-sandbox provider
//! implements, together with the typed request/response shapes its RPCs use.
//! The only production provider is [`agentbay::AgentBayClient`]; tests swap in
//! the recording fake from [`fake`].
//!
//! The client is stateless with respect to sessions: every RPC after creation
//! names its session explicitly. Session bookkeeping lives in
//! [`crate::session::SessionRegistry`].

pub mod actions;
pub mod agentbay;
#[cfg(test)]
pub(crate) mod fake;

pub use actions::{BrowserAction, FileAction, ScrollDirection, UiAction};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A freshly provisioned sandbox as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSession {
    pub session_id: String,
    pub resource_url: Option<String>,
}

/// One entry of the remote session listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSessionInfo {
    pub session_id: String,
    #[serde(default)]
    pub image_id: Option<String>,
}

/// Output from a shell command executed inside a sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

/// Output from a code snippet executed inside a sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A single directory entry inside a sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
}

fn default_entry_kind() -> String {
    "file".to_string()
}

/// Provider-agnostic remote sandbox interface.
///
/// Every method performs exactly one remote request (session listing may page
/// internally). Implementations must be `Send + Sync`: a single client is
/// shared by all concurrent dispatches.
#[async_trait]
pub trait SandboxClient: Send + Sync {
    /// Provision a sandbox from `image_id`, tagged with `labels`.
    async fn create_session(
        &self,
        image_id: &str,
        labels: &HashMap<String, String>,
    ) -> anyhow::Result<RemoteSession>;

    /// Tear down a sandbox. `sync_context` asks the remote side to persist
    /// its context before teardown.
    async fn delete_session(&self, session_id: &str, sync_context: bool) -> anyhow::Result<()>;

    /// List remote sandboxes carrying all of `labels`.
    async fn list_sessions(
        &self,
        labels: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<RemoteSessionInfo>>;

    /// Run a shell command.
    async fn run_command(
        &self,
        session_id: &str,
        command: &str,
        working_directory: Option<&str>,
        timeout_ms: u64,
    ) -> anyhow::Result<CommandOutput>;

    /// Run a code snippet with the given language runtime.
    async fn run_code(
        &self,
        session_id: &str,
        code: &str,
        language: &str,
        working_directory: Option<&str>,
    ) -> anyhow::Result<CodeOutput>;

    /// Read a file and return its content.
    async fn read_file(&self, session_id: &str, path: &str) -> anyhow::Result<String>;

    /// Write `content` to `path`, creating the file if absent.
    async fn write_file(&self, session_id: &str, path: &str, content: &str) -> anyhow::Result<()>;

    /// List entries of a directory, in the order the remote returns them.
    async fn list_directory(&self, session_id: &str, path: &str) -> anyhow::Result<Vec<DirEntry>>;

    /// Perform one browser automation step.
    async fn browser_action(
        &self,
        session_id: &str,
        action: &BrowserAction,
    ) -> anyhow::Result<serde_json::Value>;

    /// Perform one desktop UI step.
    async fn ui_action(
        &self,
        session_id: &str,
        action: &UiAction,
    ) -> anyhow::Result<serde_json::Value>;
}
