//! `ui_operations` tool: desktop screenshot, click, type and key presses.

use super::{run_tool, session_id_property};
use crate::dispatch::{ToolDispatcher, ToolName};
use crate::sandbox::UiAction;
use crate::tools::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct UiOperationsTool {
    dispatcher: Arc<ToolDispatcher>,
}

impl UiOperationsTool {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Tool for UiOperationsTool {
    fn name(&self) -> &str {
        ToolName::UiOperations.as_str()
    }

    fn description(&self) -> &str {
        "Operate the desktop UI of a sandbox session: take a screenshot, click at pixel \
         coordinates, type text, or press a key (e.g. Enter, Tab, Escape)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "action": {
                    "type": "string",
                    "enum": UiAction::NAMES
                },
                "x": { "type": "integer", "minimum": 0, "description": "X coordinate (click)" },
                "y": { "type": "integer", "minimum": 0, "description": "Y coordinate (click)" },
                "text": { "type": "string", "description": "Text to type (type)" },
                "key": { "type": "string", "description": "Key name to press (key)" }
            },
            "required": ["session_id", "action"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        run_tool(&self.dispatcher, ToolName::UiOperations, args).await
    }
}
