//! Message types for the Roleplex message queue
//!
//! This module defines the single value type exchanged between agents, their
//! roles, and any external dispatcher or supervisor.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Message type tag of the periodic liveness pulse every running agent emits.
pub const HEARTBEAT: &str = "HEARTBEAT";

/// Sender id used when a message is built without one.
pub const SYSTEM_SENDER: &str = "system";

/// Delivery priority of a message.
///
/// Serialized as an integer (`1` = low, `2` = normal, `3` = high).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => 1,
            Priority::Normal => 2,
            Priority::High => 3,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Normal),
            3 => Ok(Priority::High),
            other => Err(format!("invalid priority {} (expected 1, 2 or 3)", other)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// One unit of inter-agent communication.
///
/// A `Message` is a plain value: builders consume `self` while it is being
/// assembled, and after that it is only read. Fields are private so a message
/// handed to a role or pulled from a queue cannot be edited in place; clone it
/// and build a new one instead.
///
/// # Example
/// ```
/// use roleplex::bus::{Message, Priority};
/// use serde_json::json;
///
/// let msg = Message::new("analyze", "coordinator")
///     .to("risk-1")
///     .with_field("symbol", json!("ACME"))
///     .with_priority(Priority::High);
/// assert_eq!(msg.sender_id(), "coordinator");
/// assert_eq!(msg.recipient_id(), Some("risk-1"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    #[serde(rename = "type")]
    message_type: String,
    #[serde(rename = "sender", deserialize_with = "non_empty_sender")]
    sender_id: String,
    #[serde(rename = "recipient", default)]
    recipient_id: Option<String>,
    #[serde(default)]
    content: HashMap<String, Value>,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    correlation_id: Option<String>,
}

fn non_empty_sender<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let sender = String::deserialize(deserializer)?;
    if sender.trim().is_empty() {
        return Err(serde::de::Error::custom("message sender must not be empty"));
    }
    Ok(sender)
}

impl Message {
    /// Creates a message of the given type from `sender_id`, stamped now.
    ///
    /// An empty sender is replaced with [`SYSTEM_SENDER`] so that every
    /// message has a populated sender.
    pub fn new(message_type: impl Into<String>, sender_id: impl Into<String>) -> Self {
        let sender_id = sender_id.into();
        let sender_id = if sender_id.trim().is_empty() {
            SYSTEM_SENDER.to_string()
        } else {
            sender_id
        };
        Self {
            id: Uuid::new_v4(),
            message_type: message_type.into(),
            sender_id,
            recipient_id: None,
            content: HashMap::new(),
            timestamp: Utc::now(),
            priority: Priority::Normal,
            correlation_id: None,
        }
    }

    /// Builds a response to `request`, addressed to its sender.
    ///
    /// The correlation id is carried over; when the request has none, the
    /// request's own id becomes the correlation id.
    pub fn reply(request: &Message, message_type: impl Into<String>, sender_id: impl Into<String>) -> Self {
        let correlation = request
            .correlation_id
            .clone()
            .unwrap_or_else(|| request.id.to_string());
        Self::new(message_type, sender_id)
            .to(request.sender_id.clone())
            .with_correlation(correlation)
    }

    /// Sets the recipient (builder pattern).
    pub fn to(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = Some(recipient_id.into());
        self
    }

    /// Replaces the whole content map (builder pattern).
    pub fn with_content(mut self, content: HashMap<String, Value>) -> Self {
        self.content = content;
        self
    }

    /// Adds one content entry (builder pattern).
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.content.insert(key.into(), value);
        self
    }

    /// Sets the priority (builder pattern).
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the correlation id (builder pattern).
    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn recipient_id(&self) -> Option<&str> {
        self.recipient_id.as_deref()
    }

    pub fn content(&self) -> &HashMap<String, Value> {
        &self.content
    }

    /// Looks up a single content entry.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns `true` for liveness pulses.
    pub fn is_heartbeat(&self) -> bool {
        self.message_type == HEARTBEAT
    }
}
