//! `roleplex config check`: report problems in the config file.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use roleplex::config::validate::{validate_config, DiagnosticLevel};
use roleplex::roles::RoleProvider;

use super::ConfigAction;

/// One line per configured agent, flagging role types no built-in provides.
fn agent_lines(raw: &Value, provider: &RoleProvider) -> Vec<String> {
    let Some(agents) = raw.get("agents").and_then(Value::as_array) else {
        return Vec::new();
    };
    agents
        .iter()
        .enumerate()
        .map(|(i, agent)| {
            let id = agent.get("agent_id").and_then(Value::as_str).unwrap_or("?");
            let role = agent.get("role_type").and_then(Value::as_str).unwrap_or("?");
            let mark = if provider.has(role) { "OK" } else { "WARN" };
            let mut line = format!("[{}] agents[{}]: {} ({})", mark, i, id, role);
            if mark == "WARN" {
                line.push_str(" - no built-in role of this type; start will fail");
            }
            line
        })
        .collect()
}

/// Validate configuration file.
pub(crate) fn cmd_config(action: ConfigAction, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Check => {
            println!("Config file: {}", config_path.display());

            if !config_path.exists() {
                println!("[OK] No config file found (using defaults, no agents)");
                return Ok(());
            }

            let content =
                std::fs::read_to_string(config_path).context("Failed to read config file")?;

            let raw: Value = match serde_json::from_str(&content) {
                Ok(v) => v,
                Err(e) => {
                    println!("[ERROR] Invalid JSON: {}", e);
                    return Ok(());
                }
            };

            let diagnostics = validate_config(&raw);
            for diag in &diagnostics {
                println!("{}", diag);
            }

            let agents = agent_lines(&raw, &RoleProvider::with_builtin_roles());
            println!("\nAgents checked: {}", agents.len());
            for line in &agents {
                println!("  {}", line);
            }

            let errors = diagnostics
                .iter()
                .filter(|d| d.level == DiagnosticLevel::Error)
                .count();
            let warnings = diagnostics
                .iter()
                .filter(|d| d.level == DiagnosticLevel::Warn)
                .count()
                + agents.iter().filter(|l| l.starts_with("[WARN]")).count();

            if errors == 0 && warnings == 0 {
                println!("\nConfiguration looks good!");
            } else {
                println!("\nFound {} error(s), {} warning(s)", errors, warnings);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_lines_flags_unknown_roles() {
        let raw = json!({"agents": [
            {"agent_id": "a1", "role_type": "echo"},
            {"agent_id": "a2", "role_type": "planner"}
        ]});
        let lines = agent_lines(&raw, &RoleProvider::with_builtin_roles());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "[OK] agents[0]: a1 (echo)");
        assert!(lines[1].starts_with("[WARN] agents[1]: a2 (planner)"));
    }

    #[test]
    fn test_agent_lines_without_agents() {
        assert!(agent_lines(&json!({}), &RoleProvider::new()).is_empty());
        assert!(agent_lines(&json!({"agents": "nope"}), &RoleProvider::new()).is_empty());
    }
}
