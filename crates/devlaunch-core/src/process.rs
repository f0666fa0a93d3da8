//! Process lifecycle types shared between the runtime and its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a managed process.
///
/// `NotStarted → Starting → Running → Stopping → {Stopped, Failed}`, with
/// `Stopped`/`Failed → Starting` on restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Never launched in this supervisor session.
    NotStarted,
    /// Launch in progress.
    Starting,
    /// Spawn succeeded. Readiness is signalled separately by a detected port.
    Running,
    /// Termination protocol in progress.
    Stopping,
    /// Exit confirmed.
    Stopped,
    /// Spawn failed, or forced termination could not be confirmed.
    Failed,
}

impl ProcessState {
    /// States that imply a live OS process handle.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stopping)
    }

    /// Lowercase label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of the termination protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TerminationOutcome {
    /// Nothing was running; no OS calls were made.
    AlreadyStopped,
    /// The process exited within the grace period after the terminate signal.
    GracefulExit,
    /// The process had to be killed.
    ForcedExit,
    /// Even the forced kill could not be confirmed.
    TerminationFailed {
        /// Why the kill failed or timed out.
        cause: String,
    },
}

impl TerminationOutcome {
    /// Whether the process is confirmed gone (or was never there).
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        !matches!(self, Self::TerminationFailed { .. })
    }

    /// Whether an exit was actually observed by this call.
    #[must_use]
    pub const fn confirmed_exit(&self) -> bool {
        matches!(self, Self::GracefulExit | Self::ForcedExit)
    }
}

impl fmt::Display for TerminationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyStopped => f.write_str("already stopped"),
            Self::GracefulExit => f.write_str("exited gracefully"),
            Self::ForcedExit => f.write_str("killed"),
            Self::TerminationFailed { cause } => write!(f, "termination failed: {cause}"),
        }
    }
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    /// A new process was spawned.
    Started {
        /// OS process id, when the platform reports one.
        pid: Option<u32>,
    },
    /// The role already had a live process; nothing was spawned.
    AlreadyRunning,
}

/// How to launch one role's process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Executable to run (resolved through `PATH`).
    pub program: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Working directory for the process.
    pub working_dir: PathBuf,
}

impl LaunchSpec {
    /// Create a launch spec.
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: working_dir.into(),
        }
    }

    /// The command line as a single string, for log messages.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Point-in-time view of one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStatus {
    /// Lifecycle state.
    pub state: ProcessState,
    /// OS process id while a process is held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Port detected from the process output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Advisory liveness from the most recent port sweep.
    pub live: bool,
    /// When the current process was spawned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}
