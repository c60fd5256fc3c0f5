//! Configuration management for Roleplex
//!
//! This module provides configuration loading for the `roleplex` binary.
//! Configuration is loaded from `~/.roleplex/config.json` with environment
//! variable overrides. The library itself never reads files or the
//! environment; callers build [`AgentConfig`] values and hand them to agents.

mod types;
pub mod validate;

pub use types::*;

use std::path::{Path, PathBuf};

use crate::error::{Result, RuntimeError};

impl RuntimeConfig {
    /// Returns the Roleplex configuration directory path (~/.roleplex)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".roleplex")
    }

    /// Returns the path to the config file (~/.roleplex/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            RuntimeConfig::default()
        };

        config.apply_env_overrides();
        config.check_unique_ids()?;

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables follow the pattern: ROLEPLEX_SECTION_KEY
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ROLEPLEX_LOGGING_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("ROLEPLEX_LOGGING_FORMAT") {
            match val.to_lowercase().as_str() {
                "pretty" => self.logging.format = LogFormat::Pretty,
                "component" => self.logging.format = LogFormat::Component,
                "json" => self.logging.format = LogFormat::Json,
                other => tracing::warn!("Ignoring unknown ROLEPLEX_LOGGING_FORMAT '{}'", other),
            }
        }
        if let Ok(val) = std::env::var("ROLEPLEX_QUEUE_CAPACITY") {
            match val.parse() {
                Ok(v) => self.queue.capacity = Some(v),
                Err(_) => tracing::warn!("Ignoring non-numeric ROLEPLEX_QUEUE_CAPACITY '{}'", val),
            }
        }
    }

    fn check_unique_ids(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.agent_id()) {
                return Err(RuntimeError::Config(format!(
                    "duplicate agent_id '{}'",
                    agent.agent_id()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, MutexGuard};

    /// Serializes tests that read or write `ROLEPLEX_*` variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    const OVERRIDE_VARS: [&str; 3] = [
        "ROLEPLEX_LOGGING_LEVEL",
        "ROLEPLEX_LOGGING_FORMAT",
        "ROLEPLEX_QUEUE_CAPACITY",
    ];

    fn clear_overrides() {
        for var in OVERRIDE_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_config_path_under_dir() {
        let path = RuntimeConfig::path();
        assert!(path.ends_with(".roleplex/config.json"));
        assert!(path.starts_with(RuntimeConfig::dir()));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let _env = env_guard();
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert!(config.agents.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let _env = env_guard();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "logging": {"format": "json"},
                "agents": [
                    {"agent_id": "a1", "role_type": "echo", "max_errors": 3},
                    {"agent_id": "a2", "role_type": "echo", "agent_name": "Second"}
                ]
            }"#,
        )
        .unwrap();

        let config = RuntimeConfig::load_from_path(&path).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.agents.len(), 2);
        assert_eq!(config.agents[0].max_errors(), 3);
        assert_eq!(config.agents[1].agent_name(), "Second");
    }

    #[test]
    fn test_load_rejects_duplicate_ids() {
        let _env = env_guard();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"agents": [
                {"agent_id": "a1", "role_type": "echo"},
                {"agent_id": "a1", "role_type": "echo"}
            ]}"#,
        )
        .unwrap();

        let err = RuntimeConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate agent_id"));
    }

    #[test]
    fn test_load_rejects_invalid_agent() {
        let _env = env_guard();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"agents": [{"agent_id": "a1", "role_type": "echo", "max_errors": 0}]}"#,
        )
        .unwrap();

        assert!(matches!(
            RuntimeConfig::load_from_path(&path),
            Err(RuntimeError::Json(_))
        ));
    }

    #[test]
    fn test_env_override() {
        let _env = env_guard();
        env::set_var("ROLEPLEX_LOGGING_LEVEL", "debug");
        env::set_var("ROLEPLEX_LOGGING_FORMAT", "JSON");
        env::set_var("ROLEPLEX_QUEUE_CAPACITY", "64");

        let mut config = RuntimeConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.queue.capacity, Some(64));

        clear_overrides();
    }

    #[test]
    fn test_env_override_applies_on_load() {
        let _env = env_guard();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"logging": {"level": "warn", "format": "pretty"}, "queue": {"capacity": 8}}"#,
        )
        .unwrap();
        env::set_var("ROLEPLEX_LOGGING_FORMAT", "component");
        env::set_var("ROLEPLEX_QUEUE_CAPACITY", "128");

        let config = RuntimeConfig::load_from_path(&path).unwrap();
        clear_overrides();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Component);
        assert_eq!(config.queue.capacity, Some(128));
    }

    #[test]
    fn test_env_override_ignores_bad_values() {
        let _env = env_guard();
        env::set_var("ROLEPLEX_LOGGING_FORMAT", "xml");
        env::set_var("ROLEPLEX_QUEUE_CAPACITY", "lots");

        let mut config = RuntimeConfig::default();
        config.logging.format = LogFormat::Json;
        config.queue.capacity = Some(4);
        config.apply_env_overrides();
        clear_overrides();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.queue.capacity, Some(4));
    }
}
