//! Agent module - Lifecycle orchestration around a pluggable role
//!
//! An [`Agent`] is the unit of deployment: it owns one role instance and
//! supplies everything the role should not have to care about:
//!
//! - Start/stop lifecycle with a validated state machine
//! - Periodic `HEARTBEAT` messages on the shared queue
//! - Message counters and a running mean of processing time
//! - A circuit breaker that shuts the agent down after `max_errors` faults
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐ process_message ┌─────────────┐   delegate   ┌─────────────┐
//! │   Caller    │────────────────>│    Agent    │─────────────>│  dyn Role   │
//! └─────────────┘                 │ (state,     │              └─────────────┘
//!                                 │  breaker)   │
//!                                 └──────┬──────┘
//!                                        │ heartbeat / send_message
//!                                        ▼
//!                                 ┌─────────────┐
//!                                 │ SharedQueue │
//!                                 └─────────────┘
//! ```

mod heartbeat;
mod runtime;
mod status;

pub use heartbeat::METRICS_INTERVAL;
pub use runtime::{Agent, ERROR_HISTORY_LIMIT};
pub use status::{AgentStatus, ErrorRecord, StatusReport};
