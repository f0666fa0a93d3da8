//! Shared startup and shutdown for the long-running commands.

use devlaunch_runtime::StartAllReport;
use tracing::debug;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::EventPrinter;

/// A running `up`/`console` session.
pub struct Session {
    printer: EventPrinter,
}

/// Start printing events, start all servers, and begin the liveness sweep.
///
/// # Errors
///
/// Fails (after cleaning up) if no server could be started at all.
pub async fn open(ctx: &CliContext) -> Result<Session, CliError> {
    let printer = EventPrinter::spawn(ctx.subscribe());
    let supervisor = ctx.supervisor();

    let report = supervisor.start_all().await;
    debug!(?report, "start all finished");

    if !report.any_started() {
        printer.finish().await;
        return Err(CliError::Process("no server could be started".to_string()));
    }

    if let Some(note) = fallback_note(&report) {
        println!("{note}");
    }

    supervisor.start_liveness_sweep();
    Ok(Session { printer })
}

/// One-line note when the servers were started individually.
fn fallback_note(report: &StartAllReport) -> Option<String> {
    if !report.used_fallback() {
        return None;
    }

    let failed: Vec<&str> = report
        .fallback
        .iter()
        .filter(|(_, result)| result.is_err())
        .map(|(role, _)| role.as_str())
        .collect();

    Some(if failed.is_empty() {
        "Combined launch unavailable; servers were started individually.".to_string()
    } else {
        format!(
            "Combined launch unavailable; could not start: {}",
            failed.join(", ")
        )
    })
}

/// Stop everything and flush the event log.
pub async fn close(ctx: &CliContext, session: Session) {
    let supervisor = ctx.supervisor();
    supervisor.shutdown().await;
    supervisor.stop_all().await;
    session.printer.finish().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlaunch_core::{ProcessError, Role, StartOutcome};

    fn spawn_failed(role: Role) -> ProcessError {
        ProcessError::SpawnFailed {
            role,
            cause: "npm: No such file or directory".to_string(),
        }
    }

    #[test]
    fn test_no_note_for_combined_launch() {
        let report = StartAllReport {
            combined: Ok(StartOutcome::Started { pid: Some(42) }),
            fallback: Vec::new(),
        };
        assert_eq!(fallback_note(&report), None);
    }

    #[test]
    fn test_note_when_fallback_succeeded() {
        let report = StartAllReport {
            combined: Err(spawn_failed(Role::Combined)),
            fallback: vec![
                (Role::Frontend, Ok(StartOutcome::Started { pid: Some(1) })),
                (Role::Backend, Ok(StartOutcome::Started { pid: Some(2) })),
            ],
        };
        let note = fallback_note(&report).unwrap();
        assert!(note.contains("started individually"));
    }

    #[test]
    fn test_note_names_failed_roles() {
        let report = StartAllReport {
            combined: Err(spawn_failed(Role::Combined)),
            fallback: vec![
                (Role::Frontend, Ok(StartOutcome::Started { pid: Some(1) })),
                (Role::Backend, Err(spawn_failed(Role::Backend))),
            ],
        };
        assert_eq!(
            fallback_note(&report).unwrap(),
            "Combined launch unavailable; could not start: backend"
        );
    }
}
