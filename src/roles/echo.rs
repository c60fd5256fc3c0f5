//! Built-in echo role.
//!
//! Replies to requests with an `ECHO` message carrying the request's content.
//! Useful as a smoke-test role for the runtime and the `roleplex` binary.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::bus::Message;
use crate::error::Result;

use super::{AgentContext, Role, ToolInfo};

/// Message type of echo replies.
pub const ECHO: &str = "ECHO";

/// Role that mirrors requests back to their sender.
///
/// A message is treated as a request when it carries a correlation id or a
/// truthy `reply` content field. Every message counts as handled.
#[derive(Debug, Default)]
pub struct EchoRole {
    initialized: bool,
    handled: u64,
    replies_sent: u64,
    last_type: Option<String>,
}

impl EchoRole {
    /// Registry tag of this role.
    pub const TAG: &'static str = "echo";

    pub fn new() -> Self {
        Self::default()
    }

    fn wants_reply(message: &Message) -> bool {
        if message.message_type() == ECHO {
            return false;
        }
        message.correlation_id().is_some()
            || message
                .field("reply")
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }
}

#[async_trait]
impl Role for EchoRole {
    async fn initialize(&mut self, ctx: &AgentContext) -> Result<bool> {
        debug!(agent_id = %ctx.agent_id(), "Echo role initialized");
        self.initialized = true;
        Ok(true)
    }

    async fn process_message(&mut self, message: &Message, ctx: &AgentContext) -> Result<bool> {
        self.handled += 1;
        self.last_type = Some(message.message_type().to_string());

        if Self::wants_reply(message) {
            let content: HashMap<String, Value> = message.content().clone();
            ctx.reply(message, ECHO, content)?;
            self.replies_sent += 1;
        }
        Ok(true)
    }

    async fn cleanup(&mut self) -> Result<()> {
        self.initialized = false;
        Ok(())
    }

    fn get_state(&self) -> Value {
        json!({
            "initialized": self.initialized,
            "handled": self.handled,
            "replies_sent": self.replies_sent,
            "last_type": self.last_type,
        })
    }

    fn get_tools(&self) -> Vec<ToolInfo> {
        vec![ToolInfo::new(
            "echo",
            "Send the request content back to its sender",
        )]
    }
}
