//! Roleplex - Role-driven agent runtime
//!
//! Agents are generic orchestrators; what an agent *does* is a [`Role`]
//! plugged in at start time through a [`RoleProvider`]. Agents talk to each
//! other, and report liveness, over a shared [`MessageQueue`].

pub mod agent;
pub mod bus;
pub mod config;
pub mod error;
pub mod roles;
pub mod utils;

pub use agent::{Agent, AgentStatus, ErrorRecord, StatusReport};
pub use bus::{InMemoryQueue, Message, MessageQueue, Priority, SharedQueue};
pub use config::{AgentConfig, RuntimeConfig};
pub use error::{Result, RuntimeError};
pub use roles::{AgentContext, EchoRole, Role, RoleProvider, ToolInfo};
pub use utils::metrics::MetricsSnapshot;
