//! Host-facing tools.
//!
//! One [`Tool`] per AgentBay tool name. Each is a thin delegator to the shared
//! [`ToolDispatcher`]: it turns the host's flat argument object into an
//! [`ActionRequest`] and serializes the resulting [`ActionResult`] as its
//! output.

pub mod browser;
pub mod exec;
pub mod files;
pub mod session;
pub mod traits;
pub mod ui;

pub use browser::BrowserAutomationTool;
pub use exec::{CodeExecuteTool, CommandExecuteTool};
pub use files::FileOperationsTool;
pub use session::{SessionCreateTool, SessionDeleteTool, SessionListTool};
pub use traits::{Tool, ToolResult, ToolSpec};
pub use ui::UiOperationsTool;

use crate::dispatch::{ActionRequest, ActionResult, ToolDispatcher, ToolName};
use serde_json::{json, Value};
use std::sync::Arc;

/// All eight tools over one shared dispatcher, in their canonical order.
pub fn all_tools(dispatcher: Arc<ToolDispatcher>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(SessionCreateTool::new(dispatcher.clone())),
        Box::new(SessionListTool::new(dispatcher.clone())),
        Box::new(SessionDeleteTool::new(dispatcher.clone())),
        Box::new(CommandExecuteTool::new(dispatcher.clone())),
        Box::new(CodeExecuteTool::new(dispatcher.clone())),
        Box::new(FileOperationsTool::new(dispatcher.clone())),
        Box::new(BrowserAutomationTool::new(dispatcher.clone())),
        Box::new(UiOperationsTool::new(dispatcher)),
    ]
}

/// Dispatch `args` as `tool` and wrap the outcome for the host.
pub(crate) async fn run_tool(
    dispatcher: &ToolDispatcher,
    tool: ToolName,
    args: Value,
) -> anyhow::Result<ToolResult> {
    let result = dispatcher
        .dispatch(ActionRequest::from_args(tool.as_str(), args))
        .await;
    into_tool_result(&result)
}

pub(crate) fn into_tool_result(result: &ActionResult) -> anyhow::Result<ToolResult> {
    let output = serde_json::to_string_pretty(result)?;
    let error = result
        .error
        .as_ref()
        .map(|e| format!("{}: {}", e.kind, e.message));
    Ok(ToolResult {
        success: result.is_success(),
        output,
        error,
    })
}

/// Schema fragment shared by every session-scoped tool.
pub(crate) fn session_id_property() -> Value {
    json!({
        "type": "string",
        "description": "ID of an active session returned by session_create"
    })
}
