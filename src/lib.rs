//! Tool dispatch and session lifecycle for AgentBay cloud sandboxes.
//!
//! A host hands a tool name plus parameters to [`dispatch::ToolDispatcher`],
//! which validates them, checks the session in the
//! [`session::SessionRegistry`], calls the remote service through a
//! [`sandbox::SandboxClient`] and returns one normalized
//! [`dispatch::ActionResult`].

pub mod config;
pub mod dispatch;
pub mod host;
pub mod sandbox;
pub mod session;
pub mod tools;

pub use config::Config;
pub use dispatch::{ActionRequest, ActionResult, ErrorKind, ToolDispatcher};
pub use sandbox::agentbay::AgentBayClient;
