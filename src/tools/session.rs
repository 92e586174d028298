//! Session lifecycle tools: `session_create`, `session_list`, `session_delete`.

use super::{run_tool, session_id_property};
use crate::dispatch::{ToolDispatcher, ToolName};
use crate::session::EnvironmentType;
use crate::tools::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

// ── session_create ───────────────────────────────────────────────────────────────

pub struct SessionCreateTool {
    dispatcher: Arc<ToolDispatcher>,
}

impl SessionCreateTool {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Tool for SessionCreateTool {
    fn name(&self) -> &str {
        ToolName::SessionCreate.as_str()
    }

    fn description(&self) -> &str {
        "Create a new AgentBay cloud sandbox session. \
         Pick the environment the later tools need: browser for browser_automation, \
         code for code_execute, linux/windows/mobile for commands and desktop UI. \
         Returns the session_id every other tool takes."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        let environments: Vec<&str> = EnvironmentType::ALL.iter().map(|e| e.as_str()).collect();
        json!({
            "type": "object",
            "properties": {
                "environment_type": {
                    "type": "string",
                    "enum": environments,
                    "description": "Sandbox environment. Default: linux."
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        run_tool(&self.dispatcher, ToolName::SessionCreate, args).await
    }
}

// ── session_list ─────────────────────────────────────────────────────────────────

pub struct SessionListTool {
    dispatcher: Arc<ToolDispatcher>,
}

impl SessionListTool {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Tool for SessionListTool {
    fn name(&self) -> &str {
        ToolName::SessionList.as_str()
    }

    fn description(&self) -> &str {
        "List the active sandbox sessions created by this process, oldest first."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        run_tool(&self.dispatcher, ToolName::SessionList, args).await
    }
}

// ── session_delete ───────────────────────────────────────────────────────────────

pub struct SessionDeleteTool {
    dispatcher: Arc<ToolDispatcher>,
}

impl SessionDeleteTool {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Tool for SessionDeleteTool {
    fn name(&self) -> &str {
        ToolName::SessionDelete.as_str()
    }

    fn description(&self) -> &str {
        "Delete a sandbox session and release its remote resources. \
         The session_id cannot be used afterwards."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "sync_context": {
                    "type": "boolean",
                    "description": "Persist the session context remotely before teardown. Default: false."
                }
            },
            "required": ["session_id"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        run_tool(&self.dispatcher, ToolName::SessionDelete, args).await
    }
}
