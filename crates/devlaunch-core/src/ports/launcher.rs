//! Process launcher port.
//!
//! Separates "start this command and hand me its output" from the supervisor's
//! bookkeeping so lifecycle logic can be exercised without real processes.

use crate::ports::ProcessError;
use crate::process::{LaunchSpec, TerminationOutcome};
use crate::role::Role;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncRead;

/// One readable output pipe of a child process.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// A freshly launched process.
pub struct LaunchedProcess {
    /// Exclusive handle to the OS process.
    pub handle: Box<dyn ChildHandle>,
    /// Output pipes to attach a monitor to (stdout, stderr).
    pub outputs: Vec<OutputStream>,
}

impl std::fmt::Debug for LaunchedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedProcess")
            .field("pid", &self.handle.pid())
            .field("outputs", &self.outputs.len())
            .finish()
    }
}

/// Exit information for a process whose exit has been confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// Exit code; `None` when the process was ended by a signal.
    pub code: Option<i32>,
}

/// Starts OS processes.
pub trait ProcessLauncher: Send + Sync {
    /// Launch `spec` for `role`, detached from any interactive console.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::SpawnFailed`] when the OS rejects the launch.
    fn launch(&self, role: Role, spec: &LaunchSpec) -> Result<LaunchedProcess, ProcessError>;
}

/// Exclusive handle to one launched OS process.
#[async_trait]
pub trait ChildHandle: Send {
    /// OS process id, if the platform still reports one.
    fn pid(&self) -> Option<u32>;

    /// Non-blocking check for a confirmed exit.
    fn try_exit(&mut self) -> Option<ExitInfo>;

    /// Run the termination protocol.
    ///
    /// Sends a graceful terminate signal and waits up to `grace`; if the process is
    /// still alive, kills it and waits up to `confirm` for the exit. A zero `grace`
    /// skips straight to the kill. Never waits longer than `grace + confirm`.
    async fn terminate(&mut self, grace: Duration, confirm: Duration) -> TerminationOutcome;
}
