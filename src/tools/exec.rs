//! Execution tools: `command_execute` and `code_execute`.

use super::{run_tool, session_id_property};
use crate::dispatch::validate::{
    COMMAND_TIMEOUT_RANGE_MS, DEFAULT_COMMAND_TIMEOUT_MS, SUPPORTED_LANGUAGES,
};
use crate::dispatch::{ToolDispatcher, ToolName};
use crate::tools::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct CommandExecuteTool {
    dispatcher: Arc<ToolDispatcher>,
}

impl CommandExecuteTool {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Tool for CommandExecuteTool {
    fn name(&self) -> &str {
        ToolName::CommandExecute.as_str()
    }

    fn description(&self) -> &str {
        "Run a shell command inside a sandbox session. \
         Returns stdout, stderr and exit_code; a non-zero exit code is still a successful call. \
         Destructive commands (rm -rf /, mkfs, dd, sudo rm, chmod 777, piped downloads) are refused."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "command": {
                    "type": "string",
                    "description": "Shell command to run (e.g. 'ls -la', 'pip install requests')"
                },
                "working_directory": {
                    "type": "string",
                    "description": "Directory to run the command in"
                },
                "timeout_ms": {
                    "type": "integer",
                    "minimum": COMMAND_TIMEOUT_RANGE_MS.start(),
                    "maximum": COMMAND_TIMEOUT_RANGE_MS.end(),
                    "description": format!("Command timeout in milliseconds. Default: {DEFAULT_COMMAND_TIMEOUT_MS}.")
                }
            },
            "required": ["session_id", "command"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        run_tool(&self.dispatcher, ToolName::CommandExecute, args).await
    }
}

pub struct CodeExecuteTool {
    dispatcher: Arc<ToolDispatcher>,
}

impl CodeExecuteTool {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Tool for CodeExecuteTool {
    fn name(&self) -> &str {
        ToolName::CodeExecute.as_str()
    }

    fn description(&self) -> &str {
        "Execute a code snippet inside a sandbox session and return its stdout and stderr. \
         Works best on a session created with environment_type=code."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "code": {
                    "type": "string",
                    "description": "Source code to execute"
                },
                "language": {
                    "type": "string",
                    "enum": SUPPORTED_LANGUAGES,
                    "description": "Runtime to use. Default: python."
                },
                "working_directory": {
                    "type": "string",
                    "description": "Directory to execute in"
                }
            },
            "required": ["session_id", "code"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        run_tool(&self.dispatcher, ToolName::CodeExecute, args).await
    }
}
