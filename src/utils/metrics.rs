//! Per-agent message metrics.
//!
//! [`AgentMetrics`] is the mutable counter set owned by one agent; it has no
//! locking of its own and lives inside the agent's state lock.
//! [`MetricsSnapshot`] is the copy handed to monitors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Copy of an agent's counters, as returned by `Agent::get_metrics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Messages accepted while running.
    pub messages_received: u64,
    /// Messages the role handled.
    pub messages_processed: u64,
    /// Messages rejected, not handled, or faulted.
    pub messages_failed: u64,
    /// Role faults counted toward the circuit breaker.
    pub errors: u64,
    /// Seconds since start, as of the last metrics tick.
    pub uptime_seconds: f64,
    /// Running mean of role call duration.
    pub avg_processing_time_ms: f64,
}

/// Message counters of one agent.
#[derive(Debug, Clone, Default)]
pub struct AgentMetrics {
    messages_received: u64,
    messages_processed: u64,
    messages_failed: u64,
    errors: u64,
    timed_calls: u64,
    avg_processing_time_ms: f64,
    uptime: Duration,
}

impl AgentMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a message accepted for delegation to the role.
    pub fn record_received(&mut self) {
        self.messages_received += 1;
    }

    /// Counts a message turned away without reaching the role.
    pub fn record_rejected(&mut self) {
        self.messages_failed += 1;
    }

    /// Counts one completed role call and folds its duration into the mean.
    ///
    /// Uses `avg' = (avg * (n - 1) + elapsed) / n` with `n` the number of
    /// timed calls so far, so the mean covers exactly the delegated calls.
    pub fn record_call(&mut self, elapsed: Duration, handled: bool) {
        if handled {
            self.messages_processed += 1;
        } else {
            self.messages_failed += 1;
        }
        self.timed_calls += 1;
        let n = self.timed_calls as f64;
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        self.avg_processing_time_ms = (self.avg_processing_time_ms * (n - 1.0) + elapsed_ms) / n;
    }

    /// Counts a role fault.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn set_uptime(&mut self, uptime: Duration) {
        self.uptime = uptime;
    }

    pub fn messages_processed(&self) -> u64 {
        self.messages_processed
    }

    pub fn messages_failed(&self) -> u64 {
        self.messages_failed
    }

    pub fn avg_processing_time_ms(&self) -> f64 {
        self.avg_processing_time_ms
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received,
            messages_processed: self.messages_processed,
            messages_failed: self.messages_failed,
            errors: self.errors,
            uptime_seconds: self.uptime.as_secs_f64(),
            avg_processing_time_ms: self.avg_processing_time_ms,
        }
    }
}

/// Formats a duration in a human-friendly way.
///
/// - Under 1ms: shows microseconds (e.g. "500us")
/// - Under 1s: shows milliseconds (e.g. "200ms")
/// - 1s or more: shows seconds with one decimal (e.g. "1.2s")
pub fn format_duration(d: Duration) -> String {
    let micros = d.as_micros();
    if micros < 1_000 {
        format!("{}us", micros)
    } else if micros < 1_000_000 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}
