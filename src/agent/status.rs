//! Agent lifecycle states and monitoring snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::metrics::MetricsSnapshot;

/// Lifecycle state of an agent. Only the agent itself changes it.
///
/// ```text
/// IDLE --start--> INITIALIZING --ok--> RUNNING --stop--> STOPPING --> STOPPED
///                      |                  |
///                      +--fail--> ERROR <-+-- error_count >= max_errors
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Initializing,
    Running,
    Stopping,
    Stopped,
    Error,
    /// Reserved for operator-driven pauses; the orchestrator never enters it.
    Maintenance,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Initializing => "initializing",
            AgentStatus::Running => "running",
            AgentStatus::Stopping => "stopping",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Error => "error",
            AgentStatus::Maintenance => "maintenance",
        }
    }

    /// Returns `true` for states from which `start()` may begin a new run.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            AgentStatus::Idle | AgentStatus::Stopped | AgentStatus::Error
        )
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an agent's bounded error history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

/// Copy of an agent's identity, state and counters for external monitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub agent_id: String,
    pub agent_name: String,
    pub role_type: String,
    pub status: AgentStatus,
    pub running: bool,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub metrics: MetricsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(AgentStatus::Idle.to_string(), "idle");
        assert_eq!(AgentStatus::Running.as_str(), "running");
        assert_eq!(AgentStatus::Error.to_string(), "error");
        assert_eq!(
            serde_json::to_value(AgentStatus::Maintenance).unwrap(),
            serde_json::json!("maintenance")
        );
    }

    #[test]
    fn test_can_start() {
        assert!(AgentStatus::Idle.can_start());
        assert!(AgentStatus::Stopped.can_start());
        assert!(AgentStatus::Error.can_start());
        assert!(!AgentStatus::Running.can_start());
        assert!(!AgentStatus::Initializing.can_start());
        assert!(!AgentStatus::Stopping.can_start());
        assert!(!AgentStatus::Maintenance.can_start());
    }

    #[test]
    fn test_status_report_serializes() {
        let report = StatusReport {
            agent_id: "a1".into(),
            agent_name: "Agent One".into(),
            role_type: "echo".into(),
            status: AgentStatus::Error,
            running: false,
            error_count: 3,
            last_error: Some("boom".into()),
            start_time: None,
            metrics: MetricsSnapshot::default(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], serde_json::json!("error"));
        assert_eq!(value["running"], serde_json::json!(false));
        assert_eq!(value["metrics"]["errors"], serde_json::json!(0));
    }
}
