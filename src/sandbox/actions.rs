//! Typed sub-operations of the multi-action tools.
//!
//! Each enum is the closed action set of one tool. The validator builds them
//! from raw parameters; the router and the remote client consume them.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// `file_operations` actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    Read { file_path: String },
    Write { file_path: String, content: String },
    List { directory_path: String },
}

impl FileAction {
    pub const NAMES: &'static [&'static str] = &["read", "write", "list"];

    pub fn name(&self) -> &'static str {
        match self {
            FileAction::Read { .. } => "read",
            FileAction::Write { .. } => "write",
            FileAction::List { .. } => "list",
        }
    }

    pub fn is_read_only(&self) -> bool {
        !matches!(self, FileAction::Write { .. })
    }
}

/// Page scroll direction for [`BrowserAction::Scroll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Top,
    Bottom,
}

impl FromStr for ScrollDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            other => Err(format!(
                "direction must be one of up, down, top, bottom (got '{other}')"
            )),
        }
    }
}

/// `browser_automation` actions. Serializes to the remote request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserAction {
    Navigate { url: String, wait_ms: u64 },
    Click { selector: String },
    Type { selector: String, text: String },
    Scroll { direction: ScrollDirection, distance: u32 },
    Screenshot { full_page: bool },
    GetContent,
    AnalyzeElements,
    WaitElement { selector: String, timeout_ms: u64 },
    Wait { timeout_ms: u64 },
}

impl BrowserAction {
    pub const NAMES: &'static [&'static str] = &[
        "navigate",
        "click",
        "type",
        "scroll",
        "screenshot",
        "get_content",
        "analyze_elements",
        "wait_element",
        "wait",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BrowserAction::Navigate { .. } => "navigate",
            BrowserAction::Click { .. } => "click",
            BrowserAction::Type { .. } => "type",
            BrowserAction::Scroll { .. } => "scroll",
            BrowserAction::Screenshot { .. } => "screenshot",
            BrowserAction::GetContent => "get_content",
            BrowserAction::AnalyzeElements => "analyze_elements",
            BrowserAction::WaitElement { .. } => "wait_element",
            BrowserAction::Wait { .. } => "wait",
        }
    }

    /// Caller-supplied wait bound carried by the action, if any.
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            BrowserAction::WaitElement { timeout_ms, .. } | BrowserAction::Wait { timeout_ms } => {
                Some(*timeout_ms)
            }
            _ => None,
        }
    }

    /// Read-style actions that are safe to re-issue.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            BrowserAction::Screenshot { .. }
                | BrowserAction::GetContent
                | BrowserAction::AnalyzeElements
                | BrowserAction::WaitElement { .. }
                | BrowserAction::Wait { .. }
        )
    }
}

/// `ui_operations` actions. Serializes to the remote request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UiAction {
    Screenshot,
    Click { x: u32, y: u32 },
    Type { text: String },
    Key { key: String },
}

impl UiAction {
    pub const NAMES: &'static [&'static str] = &["screenshot", "click", "type", "key"];

    pub fn is_read_only(&self) -> bool {
        matches!(self, UiAction::Screenshot)
    }

    pub fn name(&self) -> &'static str {
        match self {
            UiAction::Screenshot => "screenshot",
            UiAction::Click { .. } => "click",
            UiAction::Type { .. } => "type",
            UiAction::Key { .. } => "key",
        }
    }
}

impl fmt::Display for BrowserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for UiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
