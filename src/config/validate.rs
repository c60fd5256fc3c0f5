//! Configuration validation with unknown field detection.

use serde_json::Value;
use std::collections::HashSet;

use super::AgentConfig;

/// Known top-level config field names.
const KNOWN_TOP_LEVEL: &[&str] = &["logging", "queue", "agents"];

const KNOWN_LOGGING: &[&str] = &["format", "level", "file"];

const KNOWN_QUEUE: &[&str] = &["capacity"];

/// Known fields of one `agents[]` entry.
const KNOWN_AGENT: &[&str] = &[
    "agent_id",
    "agent_name",
    "role_type",
    "config",
    "heartbeat_interval",
    "max_errors",
    "restart_delay",
    "enable_metrics",
    "log_level",
];

/// A validation diagnostic.
#[derive(Debug)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: String,
    pub message: String,
}

#[derive(Debug, PartialEq)]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
}

impl Diagnostic {
    fn new(level: DiagnosticLevel, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            DiagnosticLevel::Ok => "[OK]",
            DiagnosticLevel::Warn => "[WARN]",
            DiagnosticLevel::Error => "[ERROR]",
        };
        if self.path.is_empty() {
            write!(f, "{} {}", prefix, self.message)
        } else {
            write!(f, "{} {}: {}", prefix, self.path, self.message)
        }
    }
}

/// Simple Levenshtein distance for "did you mean?" suggestions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in matrix[0].iter_mut().enumerate() {
        *val = j;
    }

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            matrix[i + 1][j + 1] = std::cmp::min(
                std::cmp::min(matrix[i][j + 1] + 1, matrix[i + 1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }
    matrix[a.len()][b.len()]
}

/// Suggest the closest known field name (if distance <= 3).
pub fn suggest_field(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| format!("did you mean '{}'?", k))
}

fn check_keys(
    obj: &serde_json::Map<String, Value>,
    known: &[&str],
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let known_set: HashSet<&str> = known.iter().copied().collect();
    let mut has_unknown = false;
    for key in obj.keys() {
        if known_set.contains(key.as_str()) {
            continue;
        }
        has_unknown = true;
        let msg = match suggest_field(key, known) {
            Some(suggestion) => format!("Unknown field '{}', {}", key, suggestion),
            None => format!("Unknown field '{}'", key),
        };
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        diagnostics.push(Diagnostic::new(DiagnosticLevel::Error, path, msg));
    }
    has_unknown
}

/// Validate a raw JSON config value against known field names and agent rules.
pub fn validate_config(raw: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match raw.as_object() {
        Some(o) => o,
        None => {
            diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Error,
                "",
                "Config must be a JSON object",
            ));
            return diagnostics;
        }
    };

    diagnostics.push(Diagnostic::new(DiagnosticLevel::Ok, "", "Valid JSON"));

    let mut has_unknown = check_keys(obj, KNOWN_TOP_LEVEL, "", &mut diagnostics);

    if let Some(logging) = obj.get("logging").and_then(|v| v.as_object()) {
        has_unknown |= check_keys(logging, KNOWN_LOGGING, "logging", &mut diagnostics);
    }
    if let Some(queue) = obj.get("queue").and_then(|v| v.as_object()) {
        has_unknown |= check_keys(queue, KNOWN_QUEUE, "queue", &mut diagnostics);
        if queue.get("capacity").and_then(|v| v.as_u64()) == Some(0) {
            diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Warn,
                "queue.capacity",
                "capacity 0 rejects every message",
            ));
        }
    }

    let mut invalid_agents = false;
    if let Some(agents) = obj.get("agents").and_then(|v| v.as_array()) {
        let mut seen_ids = HashSet::new();
        for (index, entry) in agents.iter().enumerate() {
            let path = format!("agents[{}]", index);
            let Some(agent_obj) = entry.as_object() else {
                invalid_agents = true;
                diagnostics.push(Diagnostic::new(
                    DiagnosticLevel::Error,
                    path,
                    "Agent entry must be a JSON object",
                ));
                continue;
            };
            has_unknown |= check_keys(agent_obj, KNOWN_AGENT, &path, &mut diagnostics);

            match serde_json::from_value::<AgentConfig>(entry.clone()) {
                Ok(agent) => {
                    if !seen_ids.insert(agent.agent_id().to_string()) {
                        invalid_agents = true;
                        diagnostics.push(Diagnostic::new(
                            DiagnosticLevel::Error,
                            format!("{}.agent_id", path),
                            format!("Duplicate agent_id '{}'", agent.agent_id()),
                        ));
                    }
                }
                Err(e) => {
                    invalid_agents = true;
                    diagnostics.push(Diagnostic::new(DiagnosticLevel::Error, path, e.to_string()));
                }
            }
        }
        if agents.is_empty() {
            diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Warn,
                "agents",
                "No agents configured",
            ));
        }
    }

    if !has_unknown {
        diagnostics.push(Diagnostic::new(
            DiagnosticLevel::Ok,
            "",
            "All fields recognized",
        ));
    }
    if !invalid_agents {
        diagnostics.push(Diagnostic::new(DiagnosticLevel::Ok, "", "Agent entries valid"));
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors(diags: &[Diagnostic]) -> Vec<&Diagnostic> {
        diags
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .collect()
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("agents", "agents"), 0);
        assert_eq!(levenshtein("agent", "agents"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_suggest_field() {
        assert_eq!(
            suggest_field("max_error", KNOWN_AGENT),
            Some("did you mean 'max_errors'?".to_string())
        );
        assert_eq!(suggest_field("zzzzzzzzzz", KNOWN_AGENT), None);
    }

    #[test]
    fn test_valid_config() {
        let raw = json!({
            "logging": {"level": "debug"},
            "agents": [{"agent_id": "a1", "role_type": "echo"}]
        });
        let diags = validate_config(&raw);
        assert!(errors(&diags).is_empty());
        assert!(diags.iter().any(|d| d.message == "All fields recognized"));
    }

    #[test]
    fn test_non_object_config() {
        let diags = validate_config(&json!([1, 2]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].level, DiagnosticLevel::Error);
    }

    #[test]
    fn test_unknown_agent_field_with_suggestion() {
        let raw = json!({"agents": [{"agent_id": "a1", "role_type": "echo", "max_error": 3}]});
        let diags = validate_config(&raw);
        let errs = errors(&diags);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "agents[0].max_error");
        assert!(errs[0].message.contains("did you mean"));
    }

    #[test]
    fn test_invalid_agent_values() {
        let raw = json!({"agents": [{"agent_id": "a1", "role_type": "echo", "max_errors": 0}]});
        let diags = validate_config(&raw);
        let errs = errors(&diags);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("max_errors"));
    }

    #[test]
    fn test_duplicate_agent_ids() {
        let raw = json!({"agents": [
            {"agent_id": "a1", "role_type": "echo"},
            {"agent_id": "a1", "role_type": "echo"}
        ]});
        let diags = validate_config(&raw);
        assert!(errors(&diags)
            .iter()
            .any(|d| d.message.contains("Duplicate agent_id")));
    }

    #[test]
    fn test_zero_capacity_warns() {
        let diags = validate_config(&json!({"queue": {"capacity": 0}}));
        assert!(diags
            .iter()
            .any(|d| d.level == DiagnosticLevel::Warn && d.path == "queue.capacity"));
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::new(DiagnosticLevel::Warn, "agents", "No agents configured");
        assert_eq!(d.to_string(), "[WARN] agents: No agents configured");
        let d = Diagnostic::new(DiagnosticLevel::Ok, "", "Valid JSON");
        assert_eq!(d.to_string(), "[OK] Valid JSON");
    }
}
