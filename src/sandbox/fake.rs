//! In-memory [`SandboxClient`] for unit tests.
//!
//! Records every RPC as `"<method>:<args>"`, keeps per-session files, and can
//! be told to fail or stall the next calls.

use super::{
    BrowserAction, CodeOutput, CommandOutput, DirEntry, RemoteSession, RemoteSessionInfo,
    SandboxClient, UiAction,
};
use async_trait::async_trait;
use base64::Engine as _;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Bytes returned for every screenshot.
pub(crate) const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

#[derive(Default)]
pub(crate) struct FakeSandboxClient {
    next_id: AtomicUsize,
    calls: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    last_labels: Mutex<HashMap<String, String>>,
    remote_sessions: Mutex<Vec<RemoteSessionInfo>>,
    files: Mutex<BTreeMap<(String, String), String>>,
    code_outputs: Mutex<HashMap<String, String>>,
}

impl FakeSandboxClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Make the next remote call fail with `message`.
    pub(crate) fn fail_next(&self, message: &str) {
        self.failures.lock().push(message.to_string());
    }

    /// Sleep this long inside every subsequent call.
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub(crate) fn last_labels(&self) -> HashMap<String, String> {
        self.last_labels.lock().clone()
    }

    pub(crate) fn set_remote_sessions(&self, sessions: Vec<RemoteSessionInfo>) {
        *self.remote_sessions.lock() = sessions;
    }

    /// Stdout returned when `code` is run.
    pub(crate) fn script_code(&self, code: &str, stdout: &str) {
        self.code_outputs
            .lock()
            .insert(code.to_string(), stdout.to_string());
    }

    async fn enter(&self, call: String) -> anyhow::Result<()> {
        self.calls.lock().push(call);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = {
            let mut failures = self.failures.lock();
            (!failures.is_empty()).then(|| failures.remove(0))
        };
        match failure {
            Some(message) => anyhow::bail!("AgentBay API returned 500: {message}"),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SandboxClient for FakeSandboxClient {
    async fn create_session(
        &self,
        image_id: &str,
        labels: &HashMap<String, String>,
    ) -> anyhow::Result<RemoteSession> {
        *self.last_labels.lock() = labels.clone();
        self.enter(format!("create_session:{image_id}")).await?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RemoteSession {
            session_id: format!("sess-fake-{n:06}"),
            resource_url: Some(format!("https://resource.example/{n}")),
        })
    }

    async fn delete_session(&self, session_id: &str, sync_context: bool) -> anyhow::Result<()> {
        self.enter(format!("delete_session:{session_id}:{sync_context}"))
            .await
    }

    async fn list_sessions(
        &self,
        labels: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<RemoteSessionInfo>> {
        *self.last_labels.lock() = labels.clone();
        self.enter("list_sessions".to_string()).await?;
        Ok(self.remote_sessions.lock().clone())
    }

    async fn run_command(
        &self,
        session_id: &str,
        command: &str,
        working_directory: Option<&str>,
        timeout_ms: u64,
    ) -> anyhow::Result<CommandOutput> {
        self.enter(format!(
            "run_command:{session_id}:{command}:{}:{timeout_ms}",
            working_directory.unwrap_or("-")
        ))
        .await?;
        let stdout = command
            .strip_prefix("echo ")
            .map(|rest| format!("{rest}\n"))
            .unwrap_or_default();
        Ok(CommandOutput {
            stdout,
            stderr: String::new(),
            exit_code: 0,
        })
    }

    async fn run_code(
        &self,
        session_id: &str,
        code: &str,
        language: &str,
        _working_directory: Option<&str>,
    ) -> anyhow::Result<CodeOutput> {
        self.enter(format!("run_code:{session_id}:{language}")).await?;
        let stdout = self.code_outputs.lock().get(code).cloned().unwrap_or_default();
        Ok(CodeOutput {
            stdout,
            stderr: String::new(),
        })
    }

    async fn read_file(&self, session_id: &str, path: &str) -> anyhow::Result<String> {
        self.enter(format!("read_file:{session_id}:{path}")).await?;
        self.files
            .lock()
            .get(&(session_id.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("File not found: {path}"))
    }

    async fn write_file(&self, session_id: &str, path: &str, content: &str) -> anyhow::Result<()> {
        self.enter(format!("write_file:{session_id}:{path}")).await?;
        self.files.lock().insert(
            (session_id.to_string(), path.to_string()),
            content.to_string(),
        );
        Ok(())
    }

    async fn list_directory(&self, session_id: &str, path: &str) -> anyhow::Result<Vec<DirEntry>> {
        self.enter(format!("list_directory:{session_id}:{path}")).await?;
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let files = self.files.lock();
        Ok(files
            .iter()
            .filter(|((sid, file), _)| sid == session_id && file.starts_with(&prefix))
            .map(|((_, file), content)| DirEntry {
                name: file[prefix.len()..].to_string(),
                kind: "file".to_string(),
                size: content.len() as u64,
            })
            .collect())
    }

    async fn browser_action(
        &self,
        session_id: &str,
        action: &BrowserAction,
    ) -> anyhow::Result<serde_json::Value> {
        self.enter(format!("browser_action:{session_id}:{}", action.name()))
            .await?;
        Ok(match action {
            BrowserAction::Screenshot { .. } => screenshot_body(),
            BrowserAction::GetContent => json!({ "html": "<html><body>ok</body></html>" }),
            BrowserAction::Navigate { url, .. } => json!({ "url": url, "title": "Fake Page" }),
            other => json!({ "ok": true, "action": other.name() }),
        })
    }

    async fn ui_action(
        &self,
        session_id: &str,
        action: &UiAction,
    ) -> anyhow::Result<serde_json::Value> {
        self.enter(format!("ui_action:{session_id}:{}", action.name()))
            .await?;
        Ok(match action {
            UiAction::Screenshot => screenshot_body(),
            other => json!({ "ok": true, "action": other.name() }),
        })
    }
}

fn screenshot_body() -> serde_json::Value {
    json!({
        "image": base64::engine::general_purpose::STANDARD.encode(FAKE_PNG),
        "mimeType": "image/png",
    })
}
