//! Roles module - Pluggable behavior strategies run by agents
//!
//! A role is the only part of an agent that knows what the agent *does*.
//! Lifecycle, heartbeats, metrics and the failure policy all live in the
//! [`Agent`](crate::agent::Agent) orchestrator; a role only implements the
//! [`Role`] trait and gets registered under a tag in a [`RoleProvider`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ create_role(tag) ┌──────────────┐
//! │    Agent     │─────────────────>│ RoleProvider │
//! │ (lifecycle,  │<─────────────────│ tag -> ctor  │
//! │  breaker)    │  Box<dyn Role>   └──────────────┘
//! └──────┬───────┘
//!        │ initialize / process_message / cleanup
//!        ▼
//! ┌──────────────┐
//! │  dyn Role    │  echo, coordinator, risk_analyst, ...
//! └──────────────┘
//! ```
//!
//! # Implementing a New Role
//!
//! ```
//! use async_trait::async_trait;
//! use roleplex::bus::Message;
//! use roleplex::error::Result;
//! use roleplex::roles::{AgentContext, Role, RoleProvider};
//!
//! #[derive(Default)]
//! struct Counter {
//!     seen: u64,
//! }
//!
//! #[async_trait]
//! impl Role for Counter {
//!     async fn initialize(&mut self, _ctx: &AgentContext) -> Result<bool> {
//!         Ok(true)
//!     }
//!
//!     async fn process_message(&mut self, _msg: &Message, _ctx: &AgentContext) -> Result<bool> {
//!         self.seen += 1;
//!         Ok(true)
//!     }
//!
//!     async fn cleanup(&mut self) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let mut provider = RoleProvider::new();
//! provider.register_default::<Counter>("counter");
//! assert!(provider.create_role("counter").is_some());
//! ```

pub mod echo;
mod registry;

pub use echo::EchoRole;
pub use registry::{RoleFactory, RoleProvider};

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bus::{Message, SharedQueue};
use crate::error::Result;

/// One entry of a role's tool table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

impl ToolInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// The `Role` trait defines the capability interface of a behavior strategy.
///
/// The orchestrator calls `initialize` once per start, `process_message` for
/// every accepted message, and `cleanup` exactly once when the role is
/// released. Errors and panics from any of these are caught by the agent and
/// turned into status changes; they never reach the agent's caller.
///
/// `get_state` and `get_tools` return owned snapshots so that monitors cannot
/// reach into role internals.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Role: Send + Sync {
    /// Prepares the role for work. `Ok(false)` rejects the start.
    async fn initialize(&mut self, ctx: &AgentContext) -> Result<bool>;

    /// Handles one message. `Ok(false)` means "not handled" and is counted as
    /// a failed message; `Err` is a fault that feeds the circuit breaker.
    async fn process_message(&mut self, message: &Message, ctx: &AgentContext) -> Result<bool>;

    /// Releases files, sockets, model handles, etc.
    async fn cleanup(&mut self) -> Result<()>;

    /// Snapshot of the role's internal state.
    fn get_state(&self) -> Value {
        Value::Null
    }

    /// Tools this role exposes.
    fn get_tools(&self) -> Vec<ToolInfo> {
        Vec::new()
    }
}

/// What a role sees of the agent that runs it.
///
/// Carries the agent's identity and role settings plus a handle to the shared
/// queue, so a role can talk to other agents without holding the agent itself.
#[derive(Clone)]
pub struct AgentContext {
    agent_id: String,
    agent_name: String,
    role_type: String,
    settings: HashMap<String, Value>,
    queue: SharedQueue,
}

impl AgentContext {
    pub fn new(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        role_type: impl Into<String>,
        settings: HashMap<String, Value>,
        queue: SharedQueue,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            role_type: role_type.into(),
            settings,
            queue,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn role_type(&self) -> &str {
        &self.role_type
    }

    /// Role-specific settings from the agent's config.
    pub fn settings(&self) -> &HashMap<String, Value> {
        &self.settings
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn queue(&self) -> &SharedQueue {
        &self.queue
    }

    /// Sends `message_type` with `content` to `target`, stamped with this
    /// agent's id. Fire-and-forget: no acknowledgement, no retry.
    pub fn send_message(
        &self,
        target: &str,
        message_type: &str,
        content: HashMap<String, Value>,
    ) -> Result<()> {
        let message = Message::new(message_type, self.agent_id.as_str())
            .to(target)
            .with_content(content);
        self.queue.put(message)
    }

    /// Sends a response correlated with `request` back to its sender.
    pub fn reply(
        &self,
        request: &Message,
        message_type: &str,
        content: HashMap<String, Value>,
    ) -> Result<()> {
        let message =
            Message::reply(request, message_type, self.agent_id.as_str()).with_content(content);
        self.queue.put(message)
    }
}

impl std::fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentContext")
            .field("agent_id", &self.agent_id)
            .field("agent_name", &self.agent_name)
            .field("role_type", &self.role_type)
            .field("settings", &self.settings)
            .field("queue_len", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryQueue;
    use serde_json::json;
    use std::sync::Arc;

    fn context(queue: Arc<InMemoryQueue>) -> AgentContext {
        let mut settings = HashMap::new();
        settings.insert("threshold".to_string(), json!(0.5));
        AgentContext::new("a1", "Agent One", "echo", settings, queue)
    }

    #[test]
    fn test_context_accessors() {
        let ctx = context(Arc::new(InMemoryQueue::new()));
        assert_eq!(ctx.agent_id(), "a1");
        assert_eq!(ctx.agent_name(), "Agent One");
        assert_eq!(ctx.role_type(), "echo");
        assert_eq!(ctx.setting("threshold"), Some(&json!(0.5)));
        assert!(ctx.setting("missing").is_none());
    }

    #[test]
    fn test_context_send_message_stamps_sender() {
        let queue = Arc::new(InMemoryQueue::new());
        let ctx = context(Arc::clone(&queue));

        let mut content = HashMap::new();
        content.insert("score".to_string(), json!(7));
        ctx.send_message("b2", "RESULT", content).unwrap();

        let sent = queue.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sender_id(), "a1");
        assert_eq!(sent[0].recipient_id(), Some("b2"));
        assert_eq!(sent[0].message_type(), "RESULT");
        assert_eq!(sent[0].field("score"), Some(&json!(7)));
    }

    #[test]
    fn test_context_reply_correlates() {
        let queue = Arc::new(InMemoryQueue::new());
        let ctx = context(Arc::clone(&queue));
        let request = Message::new("ASK", "b2").with_correlation("c-9");

        ctx.reply(&request, "ANSWER", HashMap::new()).unwrap();

        let sent = queue.drain();
        assert_eq!(sent[0].recipient_id(), Some("b2"));
        assert_eq!(sent[0].correlation_id(), Some("c-9"));
    }

    #[test]
    fn test_context_send_on_closed_queue_errors() {
        let queue = Arc::new(InMemoryQueue::new());
        queue.close();
        let ctx = context(queue);
        assert!(ctx.send_message("b2", "X", HashMap::new()).is_err());
    }

    #[test]
    fn test_tool_info() {
        let tool = ToolInfo::new("echo", "Repeat a message");
        assert_eq!(tool.name, "echo");
        assert_eq!(tool.description, "Repeat a message");
    }
}
