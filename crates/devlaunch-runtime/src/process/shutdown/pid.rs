//! Terminate processes by PID without reaping (no Child handle available).

use std::io;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Send a single graceful terminate signal to `pid`.
///
/// Used for stray listeners left by an earlier session: the supervisor does not own
/// them, so it asks once and does not escalate.
///
/// # Returns
/// - `Ok(())` if the signal was delivered
/// - `Err` with `NotFound` if no such process exists, `PermissionDenied` if it
///   belongs to another user
pub fn terminate_pid(pid: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        terminate_pid_unix(pid)
    }

    #[cfg(not(unix))]
    {
        terminate_pid_sysinfo(pid)
    }
}

#[cfg(unix)]
fn terminate_pid_unix(pid: u32) -> io::Result<()> {
    let raw = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid pid {pid}")))?;

    match signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(nix::errno::Errno::ESRCH) => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such process {pid}"),
        )),
        Err(nix::errno::Errno::EPERM) => Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("access denied to process {pid}"),
        )),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(not(unix))]
fn terminate_pid_sysinfo(pid: u32) -> io::Result<()> {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    let Some(process) = system.process(pid) else {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such process {pid}"),
        ));
    };

    if process.kill() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("access denied to process {pid}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::process::Command;

    #[test]
    #[cfg(unix)]
    fn terminate_pid_reports_missing_process() {
        // Use a PID that's very unlikely to exist
        let err = terminate_pid(999_999).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn terminate_pid_stops_process() {
        let mut child = Command::new("sleep")
            .arg("60")
            .spawn()
            .expect("failed to spawn sleep");
        let pid = child.id().expect("no PID");

        terminate_pid(pid).expect("terminate failed");

        // Reap the child to clean up the zombie
        let status = child.wait().await.expect("wait failed");
        assert!(!status.success());
    }
}
