//! Configuration type definitions for Roleplex
//!
//! This module defines the configuration structs used by the runtime.
//! All types implement serde traits for JSON serialization and have sensible
//! defaults. [`AgentConfig`] is validated when it is built or deserialized, so
//! an invalid agent never reaches `Agent::start`.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RuntimeError};

/// Default seconds between heartbeat messages.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;
/// Default circuit-breaker threshold.
pub const DEFAULT_MAX_ERRORS: u32 = 10;
/// Default reserved restart delay in seconds.
pub const DEFAULT_RESTART_DELAY_SECS: u64 = 5;
/// Default per-agent log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log levels accepted in `log_level` fields.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration file model for the `roleplex` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Global logging configuration
    pub logging: LoggingConfig,
    /// Shared queue configuration
    pub queue: QueueConfig,
    /// Agents to start, one per entry
    pub agents: Vec<AgentConfig>,
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Output format of the global tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, coloured
    Pretty,
    /// Compact single-line output with targets
    #[default]
    Component,
    /// JSON lines for log aggregators
    Json,
}

/// Global logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Optional file to append log lines to (JSON format only)
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

// ============================================================================
// Queue Configuration
// ============================================================================

/// Shared queue configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum pending messages; `None` means unbounded.
    pub capacity: Option<usize>,
}

// ============================================================================
// Agent Configuration
// ============================================================================

/// Static configuration of one agent instance.
///
/// Immutable once built: fields are only reachable through accessors, and
/// both [`AgentConfig::builder`] and deserialization validate the values.
///
/// # Example
/// ```
/// use roleplex::config::AgentConfig;
///
/// let config = AgentConfig::builder("a1", "echo")
///     .max_errors(3)
///     .heartbeat_interval(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.agent_name(), "a1");
/// assert_eq!(config.max_errors(), 3);
///
/// assert!(AgentConfig::builder("a2", "echo").max_errors(0).build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AgentConfigBuilder")]
pub struct AgentConfig {
    agent_id: String,
    agent_name: String,
    role_type: String,
    config: HashMap<String, Value>,
    heartbeat_interval: u64,
    max_errors: u32,
    restart_delay: u64,
    enable_metrics: bool,
    log_level: String,
}

impl AgentConfig {
    /// Builds a config with every optional field at its default.
    pub fn new(agent_id: impl Into<String>, role_type: impl Into<String>) -> Result<Self> {
        Self::builder(agent_id, role_type).build()
    }

    /// Starts a builder for `agent_id` running `role_type`.
    pub fn builder(agent_id: impl Into<String>, role_type: impl Into<String>) -> AgentConfigBuilder {
        AgentConfigBuilder {
            agent_id: agent_id.into(),
            role_type: role_type.into(),
            ..AgentConfigBuilder::default()
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Display label; defaults to the agent id.
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn role_type(&self) -> &str {
        &self.role_type
    }

    /// Free-form settings handed to the role.
    pub fn config(&self) -> &HashMap<String, Value> {
        &self.config
    }

    /// Seconds between heartbeats.
    pub fn heartbeat_interval(&self) -> u64 {
        self.heartbeat_interval
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval)
    }

    /// Circuit-breaker threshold.
    pub fn max_errors(&self) -> u32 {
        self.max_errors
    }

    /// Reserved for automatic restart; the runtime does not act on it.
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay)
    }

    pub fn enable_metrics(&self) -> bool {
        self.enable_metrics
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Builder and deserialization model for [`AgentConfig`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfigBuilder {
    agent_id: String,
    agent_name: Option<String>,
    role_type: String,
    config: HashMap<String, Value>,
    heartbeat_interval: u64,
    max_errors: u32,
    restart_delay: u64,
    enable_metrics: bool,
    log_level: String,
}

impl Default for AgentConfigBuilder {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            agent_name: None,
            role_type: String::new(),
            config: HashMap::new(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            max_errors: DEFAULT_MAX_ERRORS,
            restart_delay: DEFAULT_RESTART_DELAY_SECS,
            enable_metrics: true,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AgentConfigBuilder {
    pub fn agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = Some(name.into());
        self
    }

    /// Replaces the role settings map.
    pub fn config(mut self, config: HashMap<String, Value>) -> Self {
        self.config = config;
        self
    }

    /// Adds one role setting.
    pub fn setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    pub fn heartbeat_interval(mut self, secs: u64) -> Self {
        self.heartbeat_interval = secs;
        self
    }

    pub fn max_errors(mut self, max_errors: u32) -> Self {
        self.max_errors = max_errors;
        self
    }

    pub fn restart_delay(mut self, secs: u64) -> Self {
        self.restart_delay = secs;
        self
    }

    pub fn enable_metrics(mut self, enabled: bool) -> Self {
        self.enable_metrics = enabled;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// # Errors
    /// `RuntimeError::Config` for an empty id or role type, a zero heartbeat
    /// interval, a zero error threshold, or an unknown log level.
    pub fn build(self) -> Result<AgentConfig> {
        if self.agent_id.trim().is_empty() {
            return Err(RuntimeError::Config("agent_id must not be empty".into()));
        }
        if self.role_type.trim().is_empty() {
            return Err(RuntimeError::Config(format!(
                "agent '{}': role_type must not be empty",
                self.agent_id
            )));
        }
        if self.heartbeat_interval == 0 {
            return Err(RuntimeError::Config(format!(
                "agent '{}': heartbeat_interval must be greater than zero",
                self.agent_id
            )));
        }
        if self.max_errors == 0 {
            return Err(RuntimeError::Config(format!(
                "agent '{}': max_errors must be greater than zero",
                self.agent_id
            )));
        }
        let log_level = self.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(RuntimeError::Config(format!(
                "agent '{}': unknown log_level '{}'",
                self.agent_id, self.log_level
            )));
        }

        let agent_name = self
            .agent_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.agent_id.clone());

        Ok(AgentConfig {
            agent_id: self.agent_id,
            agent_name,
            role_type: self.role_type,
            config: self.config,
            heartbeat_interval: self.heartbeat_interval,
            max_errors: self.max_errors,
            restart_delay: self.restart_delay,
            enable_metrics: self.enable_metrics,
            log_level,
        })
    }
}

impl TryFrom<AgentConfigBuilder> for AgentConfig {
    type Error = RuntimeError;

    fn try_from(builder: AgentConfigBuilder) -> Result<Self> {
        builder.build()
    }
}
