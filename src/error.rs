//! Error types for Roleplex
//!
//! This module defines the error taxonomy of the agent runtime. Uses
//! `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! Most of these errors never cross the public [`Agent`](crate::agent::Agent)
//! surface: the orchestrator converts them into a boolean result plus a
//! populated `last_error` in its status report. They are still typed so that
//! roles, queues and the config loader can propagate them with `?`.

use thiserror::Error;

/// The primary error type for Roleplex operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Invalid configuration (zero heartbeat interval, empty agent id, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No constructor registered for the requested role tag
    #[error("Unknown role type: {0}")]
    UnknownRole(String),

    /// Role setup failed during `Agent::start`
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// A single role call failed; recovered locally and counted
    #[error("Processing error: {0}")]
    Processing(String),

    /// The circuit breaker tripped and the agent stopped itself
    #[error("Fatal error: {0}")]
    Fatal(String),

    /// Fault inside a heartbeat or metrics loop; logged and swallowed
    #[error("Background task error: {0}")]
    Background(String),

    /// Message queue closed; no further messages are accepted
    #[error("Queue error: queue closed")]
    QueueClosed,

    /// Bounded message queue is at capacity
    #[error("Queue error: queue full (capacity {0})")]
    QueueFull(usize),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for Roleplex operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::Config("max_errors must be greater than zero".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: max_errors must be greater than zero"
        );
    }

    #[test]
    fn test_unknown_role_display() {
        let err = RuntimeError::UnknownRole("does-not-exist".into());
        assert_eq!(err.to_string(), "Unknown role type: does-not-exist");
    }

    #[test]
    fn test_queue_full_display() {
        let err = RuntimeError::QueueFull(8);
        assert_eq!(err.to_string(), "Queue error: queue full (capacity 8)");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RuntimeError = io_err.into();
        assert!(matches!(err, RuntimeError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: RuntimeError = json_err.into();
        assert!(matches!(err, RuntimeError::Json(_)));
    }

    #[test]
    fn test_result_type() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
