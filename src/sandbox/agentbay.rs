//! AgentBay sandbox provider: HTTP client for the AgentBay REST API.
//!
//! Every response is wrapped in an envelope
//! `{"success": bool, "data": ..., "errorMessage": ..., "requestId": ...}`.
//! A non-2xx status or `success: false` becomes an error whose message keeps
//! the remote text verbatim.

use super::{
    BrowserAction, CodeOutput, CommandOutput, DirEntry, RemoteSession, RemoteSessionInfo,
    SandboxClient, UiAction,
};
use crate::config::AgentBayConfig;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Page size used when listing sessions.
const LIST_PAGE_LIMIT: usize = 100;

/// Transport allowance on top of a caller-supplied `timeout_ms`.
const WAIT_TRANSPORT_GRACE_MS: u64 = 2_000;

/// HTTP timeout for a request that makes the remote side wait `timeout_ms`.
/// Overrides the client-wide `request_timeout_secs` for that request.
fn wait_request_timeout(timeout_ms: u64) -> Duration {
    Duration::from_millis(timeout_ms.saturating_add(WAIT_TRANSPORT_GRACE_MS))
}

/// Shared HTTP client for AgentBay API calls.
pub struct AgentBayClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default = "envelope_success_default")]
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

fn envelope_success_default() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSession {
    session_id: String,
    #[serde(default)]
    resource_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionPage {
    #[serde(default)]
    sessions: Vec<RemoteSessionInfo>,
    #[serde(default)]
    total: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandData {
    #[serde(default, alias = "stdout")]
    output: String,
    #[serde(default, alias = "stderr")]
    error: Option<String>,
    #[serde(default, alias = "exit_code")]
    exit_code: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeData {
    #[serde(default, alias = "output", alias = "stdout")]
    result: String,
    #[serde(default, alias = "stderr")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct FileData {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct DirectoryData {
    #[serde(default, alias = "files")]
    entries: Vec<DirEntry>,
}

impl AgentBayClient {
    /// Build a client from immutable connection settings. Fails when no API
    /// key is configured.
    pub fn new(config: &AgentBayConfig) -> anyhow::Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn session_url(&self, session_id: &str, tail: &str) -> String {
        format!(
            "{}/v1/sessions/{}{tail}",
            self.base_url,
            urlencoding::encode(session_id)
        )
    }

    /// Send `request` with auth and unwrap the response envelope into `data`.
    async fn send(&self, op: &str, request: reqwest::RequestBuilder) -> anyhow::Result<Value> {
        let resp = request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| anyhow::Error::new(e).context(format!("AgentBay {op} request failed")))?;

        let status = resp.status();
        let body_text = resp
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable>".to_string());

        anyhow::ensure!(
            status.is_success(),
            "AgentBay API returned {status}: {body_text}"
        );

        if body_text.trim().is_empty() {
            return Ok(Value::Null);
        }

        let envelope: Envelope = serde_json::from_str(&body_text).map_err(|e| {
            anyhow::anyhow!("Failed to parse AgentBay response: {e}\nBody: {body_text}")
        })?;

        if !envelope.success {
            let message = envelope
                .error_message
                .unwrap_or_else(|| format!("AgentBay {op} failed"));
            match envelope.request_id {
                Some(request_id) => anyhow::bail!("{message} (request_id: {request_id})"),
                None => anyhow::bail!("{message}"),
            }
        }

        tracing::debug!(
            "AgentBay {op} ok (request_id: {})",
            envelope.request_id.as_deref().unwrap_or("-")
        );
        Ok(envelope.data)
    }

    async fn send_as<T: serde::de::DeserializeOwned>(
        &self,
        op: &str,
        request: reqwest::RequestBuilder,
    ) -> anyhow::Result<T> {
        let data = self.send(op, request).await?;
        serde_json::from_value(data)
            .map_err(|e| anyhow::anyhow!("Unexpected AgentBay {op} payload: {e}"))
    }
}

/// Quote `value` for a POSIX shell.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// The command actually sent: `cd <dir> && <command>` when a working
/// directory is given.
fn compose_command(command: &str, working_directory: Option<&str>) -> String {
    match working_directory.filter(|dir| !dir.is_empty()) {
        Some(dir) => format!("cd {} && {command}", shell_quote(dir)),
        None => command.to_string(),
    }
}

#[async_trait]
impl SandboxClient for AgentBayClient {
    async fn create_session(
        &self,
        image_id: &str,
        labels: &HashMap<String, String>,
    ) -> anyhow::Result<RemoteSession> {
        let url = format!("{}/v1/sessions", self.base_url);
        let body = json!({ "imageId": image_id, "labels": labels });

        let created: CreatedSession = self
            .send_as("create_session", self.http.post(&url).json(&body))
            .await?;

        anyhow::ensure!(
            !created.session_id.is_empty(),
            "AgentBay returned no sessionId"
        );

        Ok(RemoteSession {
            session_id: created.session_id,
            resource_url: created.resource_url,
        })
    }

    async fn delete_session(&self, session_id: &str, sync_context: bool) -> anyhow::Result<()> {
        let url = self.session_url(session_id, &format!("?syncContext={sync_context}"));
        self.send("delete_session", self.http.delete(&url)).await?;
        Ok(())
    }

    async fn list_sessions(
        &self,
        labels: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<RemoteSessionInfo>> {
        let labels_json = serde_json::to_string(labels)?;
        let mut all = Vec::new();
        let mut page = 1usize;

        loop {
            let url = format!(
                "{}/v1/sessions?labels={}&page={page}&limit={LIST_PAGE_LIMIT}",
                self.base_url,
                urlencoding::encode(&labels_json)
            );
            let batch: SessionPage = self.send_as("list_sessions", self.http.get(&url)).await?;

            let received = batch.sessions.len();
            all.extend(batch.sessions);

            let total = batch.total.unwrap_or(all.len());
            if received == 0 || all.len() >= total {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    async fn run_command(
        &self,
        session_id: &str,
        command: &str,
        working_directory: Option<&str>,
        timeout_ms: u64,
    ) -> anyhow::Result<CommandOutput> {
        let url = self.session_url(session_id, "/command");
        let body = json!({
            "command": compose_command(command, working_directory),
            "timeoutMs": timeout_ms,
        });

        let request = self
            .http
            .post(&url)
            .timeout(wait_request_timeout(timeout_ms))
            .json(&body);
        let data: CommandData = self.send_as("run_command", request).await?;

        Ok(CommandOutput {
            stdout: data.output,
            stderr: data.error.unwrap_or_default(),
            exit_code: data.exit_code,
        })
    }

    async fn run_code(
        &self,
        session_id: &str,
        code: &str,
        language: &str,
        working_directory: Option<&str>,
    ) -> anyhow::Result<CodeOutput> {
        let url = self.session_url(session_id, "/code");
        let mut body = json!({ "code": code, "language": language });
        if let Some(dir) = working_directory {
            body["workingDirectory"] = json!(dir);
        }

        let data: CodeData = self
            .send_as("run_code", self.http.post(&url).json(&body))
            .await?;

        Ok(CodeOutput {
            stdout: data.result,
            stderr: data.error.unwrap_or_default(),
        })
    }

    async fn read_file(&self, session_id: &str, path: &str) -> anyhow::Result<String> {
        let url = self.session_url(
            session_id,
            &format!("/files?path={}", urlencoding::encode(path)),
        );
        let data: FileData = self.send_as("read_file", self.http.get(&url)).await?;
        Ok(data.content)
    }

    async fn write_file(&self, session_id: &str, path: &str, content: &str) -> anyhow::Result<()> {
        let url = self.session_url(session_id, "/files");
        let body = json!({ "path": path, "content": content });
        self.send("write_file", self.http.put(&url).json(&body))
            .await?;
        Ok(())
    }

    async fn list_directory(&self, session_id: &str, path: &str) -> anyhow::Result<Vec<DirEntry>> {
        let url = self.session_url(
            session_id,
            &format!("/directories?path={}", urlencoding::encode(path)),
        );
        let data: DirectoryData = self.send_as("list_directory", self.http.get(&url)).await?;
        Ok(data.entries)
    }

    async fn browser_action(
        &self,
        session_id: &str,
        action: &BrowserAction,
    ) -> anyhow::Result<Value> {
        let url = self.session_url(session_id, "/browser");
        let mut request = self.http.post(&url).json(action);
        if let Some(timeout_ms) = action.timeout_ms() {
            request = request.timeout(wait_request_timeout(timeout_ms));
        }
        self.send("browser_action", request).await
    }

    async fn ui_action(&self, session_id: &str, action: &UiAction) -> anyhow::Result<Value> {
        let url = self.session_url(session_id, "/ui");
        self.send("ui_action", self.http.post(&url).json(action))
            .await
    }
}
