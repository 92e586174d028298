//! `file_operations` tool: read, write and list files inside a session.

use super::{run_tool, session_id_property};
use crate::dispatch::{ToolDispatcher, ToolName};
use crate::sandbox::FileAction;
use crate::tools::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct FileOperationsTool {
    dispatcher: Arc<ToolDispatcher>,
}

impl FileOperationsTool {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Tool for FileOperationsTool {
    fn name(&self) -> &str {
        ToolName::FileOperations.as_str()
    }

    fn description(&self) -> &str {
        "Work with files inside a sandbox session. \
         action=read returns the file content, action=write creates or replaces a file, \
         action=list returns the entries of a directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": session_id_property(),
                "action": {
                    "type": "string",
                    "enum": FileAction::NAMES
                },
                "file_path": {
                    "type": "string",
                    "description": "File to read or write (read, write)"
                },
                "content": {
                    "type": "string",
                    "description": "Full content to write (write). Default: empty"
                },
                "directory_path": {
                    "type": "string",
                    "description": "Directory to list (list). Default: current directory"
                }
            },
            "required": ["session_id", "action"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        run_tool(&self.dispatcher, ToolName::FileOperations, args).await
    }
}
