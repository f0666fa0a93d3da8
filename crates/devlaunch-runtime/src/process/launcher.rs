//! `tokio::process` implementation of the launcher port.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use devlaunch_core::{
    ChildHandle, ExitInfo, LaunchSpec, LaunchedProcess, OutputStream, ProcessError,
    ProcessLauncher, Role, TerminationOutcome,
};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::shutdown::shutdown_child;

/// Suppresses the console window of children on Windows.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Launches role commands as background OS processes.
///
/// Children get null stdin and piped stdout/stderr. On Unix each child leads a new
/// process group so termination reaches the whole tree; on Windows no console
/// window is created.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl TokioLauncher {
    /// Create a new launcher.
    pub const fn new() -> Self {
        Self
    }

    fn build_command(spec: &LaunchSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        #[cfg(windows)]
        {
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd
    }
}

impl ProcessLauncher for TokioLauncher {
    fn launch(&self, role: Role, spec: &LaunchSpec) -> Result<LaunchedProcess, ProcessError> {
        if !spec.working_dir.is_dir() {
            return Err(ProcessError::SpawnFailed {
                role,
                cause: format!(
                    "working directory not found: {}",
                    spec.working_dir.display()
                ),
            });
        }

        let mut child = Self::build_command(spec)
            .spawn()
            .map_err(|e| ProcessError::SpawnFailed {
                role,
                cause: format!("{}: {e}", spec.program),
            })?;

        debug!(
            role = %role,
            pid = ?child.id(),
            command = %spec.command_line(),
            cwd = %spec.working_dir.display(),
            "Spawned child process"
        );

        let mut outputs: Vec<OutputStream> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            outputs.push(Box::new(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            outputs.push(Box::new(stderr));
        }

        Ok(LaunchedProcess {
            handle: Box::new(TokioChild::new(child)),
            outputs,
        })
    }
}

/// [`ChildHandle`] over a `tokio::process::Child`.
#[derive(Debug)]
pub struct TokioChild {
    child: Child,
}

impl TokioChild {
    /// Wrap a spawned child.
    pub const fn new(child: Child) -> Self {
        Self { child }
    }
}

#[async_trait]
impl ChildHandle for TokioChild {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_exit(&mut self) -> Option<ExitInfo> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(ExitInfo {
                code: status.code(),
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Error checking process");
                None
            }
        }
    }

    async fn terminate(&mut self, grace: Duration, confirm: Duration) -> TerminationOutcome {
        shutdown_child(&mut self.child, grace, confirm).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_working_dir_is_spawn_failure() {
        let spec = LaunchSpec::new("npm", ["run", "dev"], "/definitely/not/here");
        let err = TokioLauncher::new()
            .launch(Role::Backend, &spec)
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessError::SpawnFailed {
                role: Role::Backend,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let spec = LaunchSpec::new("devlaunch-no-such-binary", Vec::<String>::new(), dir.path());
        let err = TokioLauncher::new()
            .launch(Role::Frontend, &spec)
            .unwrap_err();
        assert!(err.to_string().contains("devlaunch-no-such-binary"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_launch_pipes_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let spec = LaunchSpec::new("sh", ["-c", "exit 3"], dir.path());
        let mut launched = TokioLauncher::new().launch(Role::Backend, &spec).unwrap();
        assert_eq!(launched.outputs.len(), 2);
        assert!(launched.handle.pid().is_some());

        let mut exit = None;
        for _ in 0..50 {
            exit = launched.handle.try_exit();
            if exit.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(exit, Some(ExitInfo { code: Some(3) }));
    }
}
