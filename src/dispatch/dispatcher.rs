//! Top-level tool entry point.

use super::router::ActionRouter;
use super::validate::{validate, ToolCall};
use super::{ActionRequest, ActionResult, ErrorInfo, ResultStatus, ToolError, ToolName};
use crate::config::DispatchConfig;
use crate::sandbox::SandboxClient;
use crate::session::{ReconcileReport, Session, SessionRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Validates, routes and bounds every tool invocation, and owns the session
/// registry they share. Cheap to share behind an `Arc`; all methods take
/// `&self`.
pub struct ToolDispatcher {
    client: Arc<dyn SandboxClient>,
    registry: SessionRegistry,
    router: ActionRouter,
    config: DispatchConfig,
}

impl ToolDispatcher {
    pub fn new(
        client: Arc<dyn SandboxClient>,
        session_label: impl Into<String>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(client.clone(), session_label),
            router: ActionRouter::new(client.clone()),
            client,
            config,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Align the registry with the remote session listing.
    pub async fn reconcile(&self) -> anyhow::Result<ReconcileReport> {
        self.registry.reconcile().await
    }

    pub async fn dispatch(&self, request: ActionRequest) -> ActionResult {
        self.dispatch_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Dispatch `request`, giving up with `Cancelled` as soon as `cancel`
    /// fires. A cancelled remote call may still complete on the remote side.
    pub async fn dispatch_with_cancel(
        &self,
        request: ActionRequest,
        cancel: &CancellationToken,
    ) -> ActionResult {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            %request_id,
            tool = %request.tool,
            action = tracing::field::Empty,
        );
        self.run(request_id, request, cancel).instrument(span).await
    }

    async fn run(
        &self,
        request_id: Uuid,
        request: ActionRequest,
        cancel: &CancellationToken,
    ) -> ActionResult {
        let started = Instant::now();

        let call = request
            .tool
            .parse::<ToolName>()
            .and_then(|tool| validate(tool, &request, self.config.default_environment));
        let outcome = match &call {
            Ok(call) => {
                if let Some(action) = call.action_name() {
                    tracing::Span::current().record("action", action);
                }
                self.bounded(call, cancel).await
            }
            Err(err) => Err(err.clone()),
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let call = call.ok();
        let action = call
            .as_ref()
            .and_then(ToolCall::action_name)
            .map(String::from)
            .or_else(|| request.effective_action().map(String::from));
        let session_id = call
            .as_ref()
            .and_then(|c| c.session_id().map(String::from))
            .or_else(|| {
                outcome
                    .as_ref()
                    .ok()
                    .and_then(|payload| payload.get("session_id"))
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .or_else(|| request.effective_session_id().map(String::from));
        let idempotent = call.as_ref().is_some_and(ToolCall::is_retry_safe);

        match outcome {
            Ok(payload) => {
                tracing::info!(elapsed_ms, "Dispatch completed");
                ActionResult {
                    request_id,
                    tool: request.tool,
                    action,
                    session_id,
                    status: ResultStatus::Success,
                    payload: Some(payload),
                    error: None,
                    retry_safe: idempotent,
                    elapsed_ms,
                }
            }
            Err(err) => {
                let kind = err.kind();
                tracing::warn!(elapsed_ms, kind = %kind, "Dispatch failed: {err}");
                ActionResult {
                    request_id,
                    tool: request.tool,
                    action,
                    session_id,
                    status: ResultStatus::Failure,
                    payload: None,
                    error: Some(ErrorInfo::from(&err)),
                    // Locally rejected requests never reached the remote side.
                    retry_safe: idempotent || kind.is_local(),
                    elapsed_ms,
                }
            }
        }
    }

    /// Wait bound for `call`: its own timeout plus grace, or the default.
    fn bound_for(&self, call: &ToolCall) -> Duration {
        match call.timeout_ms() {
            Some(ms) => Duration::from_millis(ms.saturating_add(self.config.timeout_grace_ms)),
            None => Duration::from_millis(self.config.default_timeout_ms),
        }
    }

    async fn bounded(&self, call: &ToolCall, cancel: &CancellationToken) -> Result<Value, ToolError> {
        let bound = self.bound_for(call);
        let operation = match call.action_name() {
            Some(action) => format!("{}.{action}", call.tool()),
            None => call.tool().to_string(),
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::info!("{operation} cancelled by caller");
                Err(ToolError::Cancelled(operation))
            }
            outcome = tokio::time::timeout(bound, self.execute(call)) => match outcome {
                Ok(result) => result,
                Err(_) => Err(ToolError::Timeout {
                    operation,
                    timeout_ms: u64::try_from(bound.as_millis()).unwrap_or(u64::MAX),
                }),
            },
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let tool = call.tool();

        match call {
            ToolCall::SessionCreate { environment } => {
                let session = self.registry.create(*environment).await?;
                Ok(session_payload(&session))
            }
            ToolCall::SessionList => {
                let sessions: Vec<Value> = self.registry.list().iter().map(session_payload).collect();
                Ok(json!({ "count": sessions.len(), "sessions": sessions }))
            }
            ToolCall::SessionDelete {
                session_id,
                sync_context,
            } => {
                let session = self.registry.delete(session_id, *sync_context).await?;
                Ok(json!({
                    "session_id": session.id,
                    "deleted": true,
                    "sync_context": sync_context,
                }))
            }
            ToolCall::CommandExecute {
                session_id,
                command,
                working_directory,
                timeout_ms,
            } => {
                self.registry.require_active(session_id)?;
                let output = self
                    .client
                    .run_command(session_id, command, working_directory.as_deref(), *timeout_ms)
                    .await
                    .map_err(|e| ToolError::remote(tool, "run_command", e))?;
                if output.exit_code != 0 {
                    tracing::debug!("Command exited with {} on {session_id}", output.exit_code);
                }
                Ok(json!({
                    "stdout": output.stdout,
                    "stderr": output.stderr,
                    "exit_code": output.exit_code,
                }))
            }
            ToolCall::CodeExecute {
                session_id,
                code,
                language,
                working_directory,
            } => {
                self.registry.require_active(session_id)?;
                let output = self
                    .client
                    .run_code(session_id, code, language, working_directory.as_deref())
                    .await
                    .map_err(|e| ToolError::remote(tool, "run_code", e))?;
                Ok(json!({
                    "language": language,
                    "stdout": output.stdout,
                    "stderr": output.stderr,
                }))
            }
            ToolCall::FileOperations { session_id, action } => {
                let session = self.registry.require_active(session_id)?;
                self.router.file(&session, action).await
            }
            ToolCall::BrowserAutomation { session_id, action } => {
                let session = self.registry.require_active(session_id)?;
                self.router.browser(&session, action).await
            }
            ToolCall::UiOperations { session_id, action } => {
                let session = self.registry.require_active(session_id)?;
                self.router.ui(&session, action).await
            }
        }
    }
}

fn session_payload(session: &Session) -> Value {
    let mut payload = json!({
        "session_id": session.id,
        "environment_type": session.environment_type,
        "status": session.status,
        "created_at": session.created_at,
    });
    if let Some(url) = &session.resource_url {
        payload["resource_url"] = json!(url);
    }
    payload
}
