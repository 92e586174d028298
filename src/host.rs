//! JSON-lines host loop.
//!
//! Each input line is either a call
//! `{"id", "tool", "session_id"?, "action"?, "parameters"?}` or a cancellation
//! `{"cancel": <id>}`. Calls run concurrently; every response is one line
//! holding the [`ActionResult`](crate::dispatch::ActionResult) fields plus the
//! echoed `id`. Responses are written in completion order.

use crate::dispatch::{ActionRequest, ActionResult, ErrorInfo, ErrorKind, ToolDispatcher};
use anyhow::Context;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const OUTBOUND_BUFFER: usize = 128;

#[derive(Debug, Deserialize)]
struct HostCall {
    id: Value,
    tool: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    parameters: Map<String, Value>,
}

#[derive(Debug)]
enum HostMessage {
    Call(HostCall),
    Cancel(Value),
}

type Pending = Arc<Mutex<HashMap<String, CancellationToken>>>;

/// Serve calls read from `reader` until end of input, then wait for the
/// calls still in flight and flush their responses.
pub async fn serve<R, W>(dispatcher: Arc<ToolDispatcher>, reader: R, writer: W) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Value>(OUTBOUND_BUFFER);
    let writer_task = tokio::spawn(async move { write_loop(writer, &mut rx).await });

    let pending: Pending = Arc::default();
    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read host input")?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line) {
            Ok(HostMessage::Cancel(id)) => {
                let key = id_key(&id);
                match pending.lock().get(&key) {
                    Some(token) => {
                        tracing::info!("Cancelling request {key}");
                        token.cancel();
                    }
                    None => tracing::debug!("Cancel for unknown or finished request {key}"),
                }
            }
            Ok(HostMessage::Call(call)) => {
                let key = id_key(&call.id);
                let token = CancellationToken::new();
                let duplicate = {
                    let mut pending = pending.lock();
                    if pending.contains_key(&key) {
                        true
                    } else {
                        pending.insert(key.clone(), token.clone());
                        false
                    }
                };
                if duplicate {
                    let reply = rejection(call.id, format!("request id {key} is already in flight"));
                    if tx.send(reply).await.is_err() {
                        break;
                    }
                    continue;
                }

                let HostCall {
                    id,
                    tool,
                    session_id,
                    action,
                    parameters,
                } = call;
                let request = ActionRequest {
                    tool,
                    session_id,
                    action,
                    parameters,
                };
                let dispatcher = dispatcher.clone();
                let pending = pending.clone();
                let tx = tx.clone();
                in_flight.spawn(async move {
                    let result = dispatcher.dispatch_with_cancel(request, &token).await;
                    pending.lock().remove(&key);
                    let _ = tx.send(response(id, &result)).await;
                });
            }
            Err((id, message)) => {
                tracing::warn!("Rejected host line: {message}");
                if tx.send(rejection(id, message)).await.is_err() {
                    break;
                }
            }
        }

        while let Some(joined) = in_flight.try_join_next() {
            if let Err(e) = joined {
                tracing::error!("Request task failed: {e}");
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Request task failed: {e}");
        }
    }
    drop(tx);
    writer_task.await.context("Host writer task failed")?
}

fn parse_line(line: &str) -> Result<HostMessage, (Value, String)> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| (Value::Null, format!("invalid JSON: {e}")))?;
    if let Some(id) = value.get("cancel") {
        return Ok(HostMessage::Cancel(id.clone()));
    }
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map(HostMessage::Call)
        .map_err(|e| (id, format!("invalid request: {e}")))
}

/// Map key for a request id; `"7"` and `7` address the same request.
fn id_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn response(id: Value, result: &ActionResult) -> Value {
    let mut value = serde_json::to_value(result).unwrap_or_else(|e| {
        json!({
            "status": "failure",
            "error": { "kind": ErrorKind::RemoteOperationError, "message": format!("unserializable result: {e}") },
        })
    });
    value["id"] = id;
    value
}

fn rejection(id: Value, message: String) -> Value {
    json!({
        "id": id,
        "status": "failure",
        "error": ErrorInfo { kind: ErrorKind::ValidationError, message },
        "retry_safe": true,
    })
}

async fn write_loop<W>(mut writer: W, rx: &mut mpsc::Receiver<Value>) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let mut text = serde_json::to_string(&message)?;
        text.push('\n');
        writer
            .write_all(text.as_bytes())
            .await
            .context("Failed to write host response")?;
        writer.flush().await.context("Failed to flush host output")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use crate::sandbox::fake::FakeSandboxClient;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    fn dispatcher() -> (Arc<FakeSandboxClient>, Arc<ToolDispatcher>) {
        let fake = Arc::new(FakeSandboxClient::new());
        let dispatcher = Arc::new(ToolDispatcher::new(
            fake.clone(),
            "agentbay_tools",
            DispatchConfig::default(),
        ));
        (fake, dispatcher)
    }

    /// Run `input` through the loop and return responses keyed by id.
    async fn run(dispatcher: Arc<ToolDispatcher>, input: &str) -> HashMap<String, Value> {
        let (writer, mut output) = tokio::io::duplex(64 * 1024);
        serve(dispatcher, input.as_bytes(), writer).await.unwrap();

        let mut text = String::new();
        output.read_to_string(&mut text).await.unwrap();
        text.lines()
            .map(|line| {
                let value: Value = serde_json::from_str(line).unwrap();
                (id_key(&value["id"]), value)
            })
            .collect()
    }

    #[tokio::test]
    async fn answers_each_call_with_its_id() {
        let (_fake, dispatcher) = dispatcher();
        let input = concat!(
            r#"{"id": "a", "tool": "session_create", "parameters": {"environment_type": "code"}}"#,
            "\n\n",
            r#"{"id": 2, "tool": "session_list"}"#,
            "\n",
        );
        let responses = run(dispatcher, input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses["a"]["status"], "success");
        assert_eq!(responses["a"]["payload"]["environment_type"], "code");
        assert_eq!(responses["2"]["tool"], "session_list");
    }

    #[tokio::test]
    async fn malformed_lines_get_validation_errors() {
        let (_fake, dispatcher) = dispatcher();
        let input = concat!(
            "not json\n",
            r#"{"id": "no-tool"}"#,
            "\n",
            r#"{"id": "bad", "tool": "teleport"}"#,
            "\n",
        );
        let responses = run(dispatcher, input).await;
        assert_eq!(responses["null"]["error"]["kind"], "ValidationError");
        assert_eq!(responses["no-tool"]["error"]["kind"], "ValidationError");
        assert_eq!(responses["bad"]["error"]["kind"], "UnknownTool");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_line_cancels_pending_call() {
        let (fake, dispatcher) = dispatcher();
        fake.set_delay(Duration::from_secs(30));
        let input = concat!(
            r#"{"id": "slow", "tool": "session_create"}"#,
            "\n",
            r#"{"cancel": "slow"}"#,
            "\n",
        );
        let responses = run(dispatcher.clone(), input).await;
        assert_eq!(responses["slow"]["error"]["kind"], "Cancelled");
        assert!(dispatcher.registry().list().is_empty());
    }
}
