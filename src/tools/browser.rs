//! `browser_automation` tool: drive the browser of a `browser` session.

use super::{run_tool, session_id_property};
use crate::dispatch::{ToolDispatcher, ToolName};
use crate::sandbox::BrowserAction;
use crate::tools::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct BrowserAutomationTool {
    dispatcher: Arc<ToolDispatcher>,
}

impl BrowserAutomationTool {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Tool for BrowserAutomationTool {
    fn name(&self) -> &str {
        ToolName::BrowserAutomation.as_str()
    }

    fn description(&self) -> &str {
        "Automate the browser of a session created with environment_type=browser. \
         One step per call: navigate, click, type, scroll, screenshot, get_content, \
         analyze_elements, wait_element or wait. Screenshots come back base64-encoded."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "action": {
                    "type": "string",
                    "enum": BrowserAction::NAMES
                },
                "url": {
                    "type": "string",
                    "description": "Page to open (navigate). https:// is added when no scheme is given"
                },
                "selector": {
                    "type": "string",
                    "description": "CSS selector (click, type, wait_element)"
                },
                "text": {
                    "type": "string",
                    "description": "Text to type (type)"
                },
                "direction": {
                    "type": "string",
                    "enum": ["up", "down", "top", "bottom"],
                    "description": "Scroll direction (scroll). Default: down"
                },
                "distance": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Scroll distance in pixels (scroll). Default: 500"
                },
                "full_page": {
                    "type": "boolean",
                    "description": "Capture the whole page (screenshot). Default: true"
                },
                "timeout_ms": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 300000,
                    "description": "How long to wait (wait_element default 5000, wait default 3000)"
                },
                "wait_time": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Seconds to let the page settle after navigate. Default: 3"
                }
            },
            "required": ["session_id", "action"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        run_tool(&self.dispatcher, ToolName::BrowserAutomation, args).await
    }
}
