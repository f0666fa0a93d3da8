//! CLI bootstrap - the composition root.
//!
//! The only place where the supervisor is wired to real adapters: the tokio
//! process launcher, the system port registry, and a broadcast event sink the
//! terminal renders from.

use std::path::PathBuf;
use std::sync::Arc;

use devlaunch_core::{LogEvent, SupervisorConfig};
use devlaunch_runtime::{BroadcastEventSink, ProcessSupervisor};
use tokio::sync::broadcast;

use crate::error::CliError;
use crate::parser::Cli;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Project root containing package.json.
    pub project_root: PathBuf,
    /// Backend directory override; relative paths are taken from the project root.
    pub backend_dir: Option<PathBuf>,
    /// Liveness sweep interval override.
    pub sweep_interval_ms: Option<u64>,
}

impl CliConfig {
    /// Resolve global arguments, defaulting the project root to the current directory.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let project_root = match &cli.project_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        Ok(Self {
            project_root,
            backend_dir: cli.backend_dir.clone(),
            sweep_interval_ms: cli.sweep_interval_ms,
        })
    }

    /// Supervisor configuration for this project.
    pub fn supervisor_config(&self) -> SupervisorConfig {
        let mut config = match &self.backend_dir {
            Some(dir) => {
                SupervisorConfig::with_dirs(&self.project_root, self.project_root.join(dir))
            }
            None => SupervisorConfig::for_project(&self.project_root),
        };
        if let Some(ms) = self.sweep_interval_ms {
            config.liveness_interval_ms = ms;
        }
        config
    }
}

/// Fully composed context for command handlers.
pub struct CliContext {
    supervisor: ProcessSupervisor,
    events: Arc<BroadcastEventSink>,
}

impl CliContext {
    pub const fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Subscribe to supervisor events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.events.subscribe()
    }
}

/// Build the supervisor for `config`.
///
/// # Errors
///
/// Fails if the project directory does not exist or the configuration is invalid.
pub fn bootstrap(config: &CliConfig) -> Result<CliContext, CliError> {
    if !config.project_root.is_dir() {
        return Err(CliError::Config(format!(
            "project directory not found: {}",
            config.project_root.display()
        )));
    }

    let events = Arc::new(BroadcastEventSink::new());
    let supervisor = ProcessSupervisor::with_system(config.supervisor_config(), events.clone())?;

    Ok(CliContext { supervisor, events })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(root: PathBuf) -> CliConfig {
        CliConfig {
            project_root: root,
            backend_dir: None,
            sweep_interval_ms: None,
        }
    }

    #[test]
    fn test_backend_dir_is_relative_to_project() {
        let mut cli_config = config(PathBuf::from("/work/app"));
        cli_config.backend_dir = Some(PathBuf::from("server"));
        cli_config.sweep_interval_ms = Some(750);

        let config = cli_config.supervisor_config();

        assert_eq!(config.backend.working_dir, PathBuf::from("/work/app/server"));
        assert_eq!(config.frontend.working_dir, PathBuf::from("/work/app"));
        assert_eq!(config.liveness_interval_ms, 750);
    }

    #[test]
    fn test_default_backend_dir() {
        let config = config(PathBuf::from("/work/app")).supervisor_config();
        assert_eq!(config.backend.working_dir, PathBuf::from("/work/app/backend"));
    }

    #[test]
    fn test_bootstrap_rejects_missing_project() {
        let dir = TempDir::new().unwrap();
        let result = bootstrap(&config(dir.path().join("missing")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_bootstrap_rejects_zero_sweep_interval() {
        let dir = TempDir::new().unwrap();
        let mut cli_config = config(dir.path().to_path_buf());
        cli_config.sweep_interval_ms = Some(0);
        assert!(matches!(bootstrap(&cli_config), Err(CliError::Config(_))));
    }
}
