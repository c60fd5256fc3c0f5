//! CLI module - command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod config;
pub mod roles;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};

use roleplex::config::RuntimeConfig;

#[derive(Parser)]
#[command(name = "roleplex")]
#[command(version)]
#[command(about = "Run role-driven agents on a shared message queue", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.roleplex/config.json
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every configured agent and route queue traffic until Ctrl-C
    Run {
        /// Stop automatically after this many seconds
        #[arg(long, value_name = "SECS")]
        duration: Option<u64>,
    },
    /// List the role types agents can be configured with
    Roles,
    /// Inspect the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report problems
    Check,
}

/// Path of the config file in effect.
fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(RuntimeConfig::path)
}

fn load_config(path: &Path) -> Result<RuntimeConfig> {
    RuntimeConfig::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Entry point for the `roleplex` binary.
pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let path = config_path(cli.config.as_deref());

    // Load config early so we can respect the logging settings; fall back to
    // defaults if the config file is missing or unreadable.
    let logging_cfg = RuntimeConfig::load_from_path(&path)
        .map(|c| c.logging)
        .unwrap_or_default();
    roleplex::utils::logging::init_logging(&logging_cfg)
        .context("Failed to initialize logging")?;

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Run { duration }) => {
            let config = load_config(&path)?;
            run::cmd_run(config, duration).await?;
        }
        Some(Commands::Roles) => {
            roles::cmd_roles();
        }
        Some(Commands::Config { action }) => {
            config::cmd_config(action, &path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_global_config() {
        let cli = Cli::parse_from(["roleplex", "run", "--duration", "5", "--config", "/tmp/c.json"]);
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/c.json")));
        assert!(matches!(cli.command, Some(Commands::Run { duration: Some(5) })));
    }

    #[test]
    fn test_parse_config_check() {
        let cli = Cli::parse_from(["roleplex", "config", "check"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Check
            })
        ));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_config_path_prefers_explicit() {
        let explicit = Path::new("/etc/roleplex.json");
        assert_eq!(config_path(Some(explicit)), explicit.to_path_buf());
        assert_eq!(config_path(None), RuntimeConfig::path());
    }
}
