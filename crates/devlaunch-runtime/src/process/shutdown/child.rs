//! Graceful shutdown for `tokio::process::Child` with SIGTERM → SIGKILL escalation.

use std::time::Duration;

use devlaunch_core::TerminationOutcome;
use tokio::process::Child;
use tokio::time::timeout;
use tracing::debug;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Shut down a child process, escalating from a graceful signal to a kill.
///
/// # Strategy
/// 1. If the child already exited, report `GracefulExit` without signalling
/// 2. Send SIGTERM to the child's process group and wait up to `grace`
/// 3. If still running (or `grace` is zero), send SIGKILL to the group and the child
/// 4. Wait up to `confirm` for reaping
///
/// # Platform behavior
/// - Unix: signals go to the process group so wrapper scripts and the real
///   server exit together (children are launched as group leaders)
/// - Windows: no graceful signal exists, the child is killed immediately
pub async fn shutdown_child(
    child: &mut Child,
    grace: Duration,
    confirm: Duration,
) -> TerminationOutcome {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(?status, "Child already exited before termination");
            return TerminationOutcome::GracefulExit;
        }
        Ok(None) => {}
        Err(e) => debug!(error = %e, "try_wait failed, continuing with termination"),
    }

    #[cfg(unix)]
    {
        if !grace.is_zero() && request_graceful_exit(child, grace).await {
            return TerminationOutcome::GracefulExit;
        }
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
    }

    force_kill(child, confirm).await
}

/// Phase 1: SIGTERM to the group, then wait up to `grace`.
///
/// Returns `true` once the child has been reaped.
#[cfg(unix)]
async fn request_graceful_exit(child: &mut Child, grace: Duration) -> bool {
    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        // Already reaped
        return true;
    };

    match signal_group(pid, Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => {
            debug!(pid = %pid, error = %e, "SIGTERM failed, escalating");
            return false;
        }
    }

    match timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            debug!(pid = %pid, ?status, "Child exited after SIGTERM");
            true
        }
        Ok(Err(e)) => {
            debug!(pid = %pid, error = %e, "wait failed after SIGTERM, escalating");
            false
        }
        Err(_) => {
            debug!(pid = %pid, grace_ms = %grace.as_millis(), "Grace period elapsed, escalating");
            false
        }
    }
}

/// Phase 2: SIGKILL, then wait up to `confirm` for reaping.
async fn force_kill(child: &mut Child, confirm: Duration) -> TerminationOutcome {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
            if let Err(e) = signal_group(pid, Signal::SIGKILL) {
                if e != Errno::ESRCH {
                    debug!(pid = %pid, error = %e, "group SIGKILL failed, killing child only");
                }
            }
        }
    }

    // Fails harmlessly when the group kill already ended the child; only a
    // failed wait below is fatal.
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "start_kill failed");
    }

    match timeout(confirm, child.wait()).await {
        Ok(Ok(_)) => TerminationOutcome::ForcedExit,
        Ok(Err(e)) => TerminationOutcome::TerminationFailed {
            cause: e.to_string(),
        },
        Err(_) => TerminationOutcome::TerminationFailed {
            cause: format!(
                "process did not exit within {}ms after kill",
                confirm.as_millis()
            ),
        },
    }
}

/// Signal the process group led by `pid`, falling back to the process itself
/// when it is not a group leader.
#[cfg(unix)]
fn signal_group(pid: i32, sig: Signal) -> Result<(), Errno> {
    match signal::killpg(Pid::from_raw(pid), sig) {
        Err(Errno::ESRCH) => signal::kill(Pid::from_raw(pid), sig),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::process::Command;
    use tokio::time::sleep;

    const CONFIRM: Duration = Duration::from_secs(2);

    #[tokio::test]
    #[cfg(unix)]
    async fn shutdown_responds_to_sigterm() {
        let mut child = Command::new("sleep")
            .arg("30")
            .process_group(0)
            .spawn()
            .expect("failed to spawn sleep");

        let outcome = shutdown_child(&mut child, Duration::from_secs(5), CONFIRM).await;
        assert_eq!(outcome, TerminationOutcome::GracefulExit);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn shutdown_escalates_when_sigterm_is_ignored() {
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; sleep 30"])
            .process_group(0)
            .spawn()
            .expect("failed to spawn sh");
        // Let the shell install its trap
        sleep(Duration::from_millis(200)).await;

        let outcome = shutdown_child(&mut child, Duration::from_millis(200), CONFIRM).await;
        assert_eq!(outcome, TerminationOutcome::ForcedExit);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn zero_grace_always_forces() {
        let mut child = Command::new("sleep")
            .arg("30")
            .process_group(0)
            .spawn()
            .expect("failed to spawn sleep");

        let outcome = shutdown_child(&mut child, Duration::ZERO, CONFIRM).await;
        assert_eq!(outcome, TerminationOutcome::ForcedExit);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn shutdown_handles_already_exited() {
        let mut child = Command::new("echo")
            .arg("test")
            .spawn()
            .expect("failed to spawn echo");

        // Give it time to exit
        sleep(Duration::from_millis(100)).await;

        let outcome = shutdown_child(&mut child, Duration::from_secs(1), CONFIRM).await;
        assert_eq!(outcome, TerminationOutcome::GracefulExit);
    }
}
