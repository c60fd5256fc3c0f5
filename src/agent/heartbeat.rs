//! Background loops owned by a running agent.
//!
//! Both loops share the agent's state through [`SharedState`] and exit when
//! their cancellation token fires or the agent leaves RUNNING, whichever
//! comes first. A failed tick is logged and the loop carries on.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bus::{Message, SharedQueue, HEARTBEAT};
use crate::error::{Result, RuntimeError};
use crate::log_component;

use super::runtime::SharedState;
use super::status::AgentStatus;

/// Cadence of the uptime refresh.
pub const METRICS_INTERVAL: Duration = Duration::from_secs(60);

/// Consecutive undelivered heartbeats before the loop warns louder.
const FAILURE_ALERT_THRESHOLD: u32 = 3;

/// Stand-in deadline for periods too long to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Instant of the first tick, one `period` from now.
///
/// Periods that overflow the clock saturate to a deadline decades away, so
/// the loop idles instead of panicking.
fn first_tick(period: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(period).unwrap_or(now + FAR_FUTURE)
}

/// Everything the heartbeat loop needs, detached from the agent itself.
pub(crate) struct HeartbeatTask {
    pub agent_id: String,
    pub agent_name: String,
    pub period: Duration,
    pub state: Arc<SharedState>,
    pub queue: SharedQueue,
}

impl HeartbeatTask {
    /// Publishes one heartbeat every `period` until cancelled.
    ///
    /// The first beat goes out one full period after start, so a run of
    /// length `T` produces `floor(T / period)` beats.
    pub async fn run(self, token: CancellationToken) {
        let mut ticker = interval_at(first_tick(self.period), self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures = 0u32;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(message) = self.build() else {
                debug!(agent_id = %self.agent_id, "Heartbeat loop exiting, agent not running");
                break;
            };

            match self.publish(message) {
                Ok(()) => consecutive_failures = 0,
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= FAILURE_ALERT_THRESHOLD {
                        warn!(
                            agent_id = %self.agent_id,
                            consecutive_failures,
                            "Heartbeat: {} consecutive failures, monitors may mark agent as dead",
                            consecutive_failures
                        );
                    } else {
                        warn!(agent_id = %self.agent_id, error = %e, "Heartbeat not delivered");
                    }
                }
            }
        }
    }

    /// Snapshots the counters into a heartbeat, or `None` once the agent
    /// has left RUNNING.
    fn build(&self) -> Option<Message> {
        let (status, processed, error_count) = {
            let state = self.state.lock();
            if state.status != AgentStatus::Running {
                return None;
            }
            (
                state.status,
                state.metrics.messages_processed(),
                state.error_count,
            )
        };

        Some(
            Message::new(HEARTBEAT, self.agent_id.as_str())
                .with_field("name", json!(self.agent_name))
                .with_field("status", json!(status.as_str()))
                .with_field("messages_processed", json!(processed))
                .with_field("error_count", json!(error_count)),
        )
    }

    fn publish(&self, message: Message) -> Result<()> {
        self.queue
            .put(message)
            .map_err(|e| RuntimeError::Background(format!("heartbeat not delivered: {}", e)))
    }
}

/// Refreshes the agent's uptime figure every [`METRICS_INTERVAL`].
pub(crate) async fn metrics_loop(agent_id: String, state: Arc<SharedState>, token: CancellationToken) {
    let mut ticker = interval_at(first_tick(METRICS_INTERVAL), METRICS_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let mut guard = state.lock();
        if guard.status != AgentStatus::Running {
            break;
        }
        let Some(started) = guard.started_at else {
            continue;
        };
        let uptime = started.elapsed();
        guard.metrics.set_uptime(uptime);
        log_component!(
            debug,
            "metrics",
            "Uptime refreshed",
            agent_id = agent_id.as_str(),
            uptime_secs = uptime.as_secs()
        );
    }
}
