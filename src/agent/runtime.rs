//! The agent orchestrator.
//!
//! An [`Agent`] owns one role instance and wraps it with lifecycle control,
//! periodic heartbeats, metrics and a circuit breaker. Every role call goes
//! through `catch_unwind`, so a misbehaving role changes the agent's status
//! instead of taking the caller down.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn, Level};

use crate::bus::{Message, SharedQueue};
use crate::config::AgentConfig;
use crate::error::RuntimeError;
use crate::log_component;
use crate::roles::{AgentContext, Role, RoleProvider, ToolInfo};
use crate::utils::logging::parse_level;
use crate::utils::metrics::{AgentMetrics, MetricsSnapshot};

use super::heartbeat::{metrics_loop, HeartbeatTask};
use super::status::{AgentStatus, ErrorRecord, StatusReport};

/// Maximum number of entries kept in an agent's error history.
pub const ERROR_HISTORY_LIMIT: usize = 100;

/// Mutable bookkeeping of one agent.
#[derive(Debug)]
pub(crate) struct AgentState {
    pub status: AgentStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub started_at: Option<Instant>,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub error_history: VecDeque<ErrorRecord>,
    pub metrics: AgentMetrics,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            status: AgentStatus::Idle,
            start_time: None,
            started_at: None,
            error_count: 0,
            last_error: None,
            error_history: VecDeque::new(),
            metrics: AgentMetrics::new(),
        }
    }
}

impl AgentState {
    fn push_error(&mut self, description: &str) {
        if self.error_history.len() == ERROR_HISTORY_LIMIT {
            self.error_history.pop_front();
        }
        self.error_history.push_back(ErrorRecord {
            timestamp: Utc::now(),
            description: description.to_string(),
        });
        self.last_error = Some(description.to_string());
    }

    fn refresh_uptime(&mut self) {
        if let Some(started) = self.started_at {
            self.metrics.set_uptime(started.elapsed());
        }
    }
}

/// State shared between the agent and its background loops.
///
/// Never held across an `.await`.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    inner: Mutex<AgentState>,
}

impl SharedState {
    pub fn lock(&self) -> MutexGuard<'_, AgentState> {
        // Every update is a handful of field writes; a poisoned guard is
        // still consistent enough to read and keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handles of the loops spawned by the current run.
#[derive(Default)]
struct Lifecycle {
    cancel: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

/// An autonomous unit running one role.
///
/// All methods take `&self`; wrap the agent in an `Arc` to share it between
/// a supervisor and the tasks feeding it messages.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use roleplex::agent::{Agent, AgentStatus};
/// use roleplex::bus::{InMemoryQueue, Message};
/// use roleplex::config::AgentConfig;
/// use roleplex::roles::RoleProvider;
///
/// # tokio_test::block_on(async {
/// let config = AgentConfig::new("echo-1", "echo").unwrap();
/// let provider = Arc::new(RoleProvider::with_builtin_roles());
/// let agent = Agent::new(config, provider, InMemoryQueue::shared());
///
/// assert!(agent.start().await);
/// assert!(agent.process_message(Message::new("PING", "tester")).await);
/// agent.stop().await;
/// assert_eq!(agent.status(), AgentStatus::Stopped);
/// # });
/// ```
pub struct Agent {
    config: AgentConfig,
    provider: Arc<RoleProvider>,
    queue: SharedQueue,
    context: AgentContext,
    verbosity: Level,
    state: Arc<SharedState>,
    role: tokio::sync::Mutex<Option<Box<dyn Role>>>,
    lifecycle: tokio::sync::Mutex<Lifecycle>,
}

impl Agent {
    /// Creates an IDLE agent. No role is instantiated until [`start`](Self::start).
    ///
    /// Agents that should see each other's messages must be given the same
    /// queue handle.
    pub fn new(config: AgentConfig, provider: Arc<RoleProvider>, queue: SharedQueue) -> Self {
        let context = AgentContext::new(
            config.agent_id(),
            config.agent_name(),
            config.role_type(),
            config.config().clone(),
            Arc::clone(&queue),
        );
        let verbosity = parse_level(config.log_level());

        Self {
            config,
            provider,
            queue,
            context,
            verbosity,
            state: Arc::new(SharedState::default()),
            role: tokio::sync::Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(Lifecycle::default()),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn agent_id(&self) -> &str {
        self.config.agent_id()
    }

    pub fn queue(&self) -> &SharedQueue {
        &self.queue
    }

    /// Current lifecycle state.
    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    /// `true` only while RUNNING.
    pub fn is_running(&self) -> bool {
        self.status() == AgentStatus::Running
    }

    /// Instantiates the role, initializes it and launches the background loops.
    ///
    /// Returns `true` once the agent is RUNNING. Calling `start` on a RUNNING
    /// agent is a no-op that returns `true`; a start racing another start, a
    /// stop or a breaker teardown returns `false`. Any failure leaves the agent in ERROR with
    /// `last_error` set and the role already cleaned up.
    pub async fn start(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock().await;

        // A tripped breaker sets ERROR before its teardown owns the lifecycle;
        // the old role is still in its slot until that teardown runs.
        if !self.is_running() && self.role.lock().await.is_some() {
            warn!(agent_id = %self.agent_id(), "Agent teardown pending, cannot start now");
            return false;
        }

        {
            let mut state = self.state.lock();
            match state.status {
                AgentStatus::Running => {
                    warn!(agent_id = %self.agent_id(), "Agent already running");
                    return true;
                }
                status if !status.can_start() => {
                    warn!(agent_id = %self.agent_id(), %status, "Agent cannot start now");
                    return false;
                }
                _ => state.status = AgentStatus::Initializing,
            }
        }

        let mut role = match self.provider.resolve(self.config.role_type()) {
            Ok(role) => role,
            Err(e) => {
                self.fail_start(&e.to_string());
                return false;
            }
        };

        let outcome = AssertUnwindSafe(role.initialize(&self.context))
            .catch_unwind()
            .await;
        let failure = match outcome {
            Ok(Ok(true)) => None,
            Ok(Ok(false)) => Some(
                RuntimeError::Initialization(format!(
                    "role '{}' refused to initialize",
                    self.config.role_type()
                ))
                .to_string(),
            ),
            Ok(Err(e)) => Some(describe(e, RuntimeError::Initialization)),
            Err(panic) => Some(
                RuntimeError::Initialization(format!(
                    "role panicked: {}",
                    panic_message(&*panic)
                ))
                .to_string(),
            ),
        };
        if let Some(description) = failure {
            self.release_role(role).await;
            self.fail_start(&description);
            return false;
        }

        *self.role.lock().await = Some(role);
        {
            let mut state = self.state.lock();
            state.status = AgentStatus::Running;
            state.start_time = Some(Utc::now());
            state.started_at = Some(Instant::now());
            state.error_count = 0;
            state.metrics.set_uptime(Duration::ZERO);
        }

        let token = CancellationToken::new();
        lifecycle.tasks.push(tokio::spawn(
            HeartbeatTask {
                agent_id: self.agent_id().to_string(),
                agent_name: self.config.agent_name().to_string(),
                period: self.config.heartbeat_period(),
                state: Arc::clone(&self.state),
                queue: Arc::clone(&self.queue),
            }
            .run(token.child_token()),
        ));
        if self.config.enable_metrics() {
            lifecycle.tasks.push(tokio::spawn(metrics_loop(
                self.agent_id().to_string(),
                Arc::clone(&self.state),
                token.child_token(),
            )));
        }
        lifecycle.cancel = Some(token);

        log_component!(
            info,
            "agent",
            "Agent started",
            agent_id = self.agent_id(),
            role_type = self.config.role_type(),
            heartbeat_secs = self.config.heartbeat_interval()
        );
        true
    }

    /// Stops the background loops, cleans up the role and ends in STOPPED.
    ///
    /// Safe to call in any state, any number of times.
    pub async fn stop(&self) {
        self.shutdown(AgentStatus::Stopped).await;
        log_component!(info, "agent", "Agent stopped", agent_id = self.agent_id());
    }

    /// Delegates `message` to the role.
    ///
    /// Returns `true` only when the role reports the message as handled.
    /// Messages arriving while the agent is not RUNNING are rejected without
    /// reaching the role. Role errors and panics are recorded as faults; once
    /// `max_errors` faults have accumulated the agent shuts itself down into
    /// ERROR.
    pub async fn process_message(&self, message: Message) -> bool {
        if !self.admit() {
            self.reject(&message, "agent not running");
            return false;
        }

        let mut slot = self.role.lock().await;
        // A stop or a tripped breaker may have won the race for the role.
        let role = match slot.as_mut() {
            Some(role) if self.is_running() => role,
            _ => {
                self.reject(&message, "agent left running state");
                return false;
            }
        };

        let started = Instant::now();
        let outcome = AssertUnwindSafe(role.process_message(&message, &self.context))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed();
        drop(slot);

        match outcome {
            Ok(Ok(handled)) => {
                self.state.lock().metrics.record_call(elapsed, handled);
                if self.verbosity >= Level::DEBUG {
                    debug!(
                        agent_id = %self.agent_id(),
                        message_type = %message.message_type(),
                        handled,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Message processed"
                    );
                }
                handled
            }
            Ok(Err(e)) => {
                self.record_fault(elapsed, &describe(e, RuntimeError::Processing))
                    .await;
                false
            }
            Err(panic) => {
                let description = RuntimeError::Processing(format!(
                    "role panicked: {}",
                    panic_message(&*panic)
                ))
                .to_string();
                self.record_fault(elapsed, &description).await;
                false
            }
        }
    }

    /// Puts a message from this agent to `target` on the queue.
    ///
    /// Fire-and-forget; returns `false` only when the queue refuses it.
    pub fn send_message(
        &self,
        target: &str,
        message_type: &str,
        content: HashMap<String, Value>,
    ) -> bool {
        match self.context.send_message(target, message_type, content) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    agent_id = %self.agent_id(),
                    target,
                    message_type,
                    error = %e,
                    "Failed to send message"
                );
                false
            }
        }
    }

    /// Snapshot of identity, state and counters.
    pub fn get_status(&self) -> StatusReport {
        let state = self.state.lock();
        StatusReport {
            agent_id: self.config.agent_id().to_string(),
            agent_name: self.config.agent_name().to_string(),
            role_type: self.config.role_type().to_string(),
            status: state.status,
            running: state.status == AgentStatus::Running,
            error_count: state.error_count,
            last_error: state.last_error.clone(),
            start_time: state.start_time,
            metrics: state.metrics.snapshot(),
        }
    }

    /// Snapshot of the message counters. Uptime is as of the last metrics tick.
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.state.lock().metrics.snapshot()
    }

    /// Recorded faults, oldest first.
    pub fn error_history(&self) -> Vec<ErrorRecord> {
        self.state.lock().error_history.iter().cloned().collect()
    }

    /// The role's own state, or `None` when no role is loaded.
    pub async fn role_state(&self) -> Option<Value> {
        self.role.lock().await.as_ref().map(|role| role.get_state())
    }

    /// The role's tool table; empty when no role is loaded.
    pub async fn role_tools(&self) -> Vec<ToolInfo> {
        self.role
            .lock()
            .await
            .as_ref()
            .map(|role| role.get_tools())
            .unwrap_or_default()
    }

    fn admit(&self) -> bool {
        let mut state = self.state.lock();
        if state.status != AgentStatus::Running {
            return false;
        }
        state.metrics.record_received();
        true
    }

    fn reject(&self, message: &Message, reason: &str) {
        self.state.lock().metrics.record_rejected();
        if self.verbosity >= Level::DEBUG {
            debug!(
                agent_id = %self.agent_id(),
                message_type = %message.message_type(),
                reason,
                "Message rejected"
            );
        }
    }

    fn fail_start(&self, description: &str) {
        {
            let mut state = self.state.lock();
            state.status = AgentStatus::Error;
            state.push_error(description);
        }
        error!(agent_id = %self.agent_id(), error = %description, "Agent failed to start");
    }

    async fn record_fault(&self, elapsed: Duration, description: &str) {
        let (error_count, tripped) = {
            let mut state = self.state.lock();
            state.metrics.record_call(elapsed, false);
            state.metrics.record_error();
            state.error_count += 1;
            state.push_error(description);
            let tripped = state.error_count >= self.config.max_errors()
                && state.status == AgentStatus::Running;
            if tripped {
                state.status = AgentStatus::Error;
            }
            (state.error_count, tripped)
        };

        if self.verbosity >= Level::WARN {
            warn!(
                agent_id = %self.agent_id(),
                error_count,
                max_errors = self.config.max_errors(),
                error = %description,
                "Role fault"
            );
        }

        if tripped {
            let fatal = RuntimeError::Fatal(format!(
                "{} faults reached the limit of {}",
                error_count,
                self.config.max_errors()
            ));
            error!(agent_id = %self.agent_id(), error = %fatal, "Circuit breaker tripped, stopping agent");
            self.shutdown(AgentStatus::Error).await;
        }
    }

    /// Tears down the current run and settles in `final_status`.
    async fn shutdown(&self, final_status: AgentStatus) {
        let mut lifecycle = self.lifecycle.lock().await;

        {
            let mut state = self.state.lock();
            if final_status == AgentStatus::Stopped {
                state.status = AgentStatus::Stopping;
            }
        }

        if let Some(token) = lifecycle.cancel.take() {
            token.cancel();
        }
        for handle in lifecycle.tasks.drain(..) {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    warn!(agent_id = %self.agent_id(), "Background loop panicked");
                }
            }
        }

        let role = self.role.lock().await.take();
        if let Some(role) = role {
            self.release_role(role).await;
        }

        let mut state = self.state.lock();
        state.refresh_uptime();
        state.status = final_status;
    }

    /// Runs the role's cleanup; this is the only place a role is dropped.
    async fn release_role(&self, mut role: Box<dyn Role>) {
        let outcome = AssertUnwindSafe(role.cleanup()).catch_unwind().await;
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("role panicked: {}", panic_message(&*panic)),
        };
        warn!(agent_id = %self.agent_id(), error = %failure, "Role cleanup failed");
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("agent_id", &self.config.agent_id())
            .field("role_type", &self.config.role_type())
            .field("status", &self.status())
            .finish()
    }
}

/// Renders a role error, tagging it with `kind` unless it is already tagged.
fn describe(e: RuntimeError, kind: fn(String) -> RuntimeError) -> String {
    match e {
        RuntimeError::Initialization(_) | RuntimeError::Processing(_) => e.to_string(),
        other => kind(other.to_string()).to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
