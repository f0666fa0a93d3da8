//! Leveled log events produced by the supervisor.
//!
//! Every observable thing the supervisor does is reported as a [`LogEvent`]. The
//! human-readable `text` is what a log panel shows; `kind` carries the structured
//! payload for callers that react to specific events (port detection, conflicts).

use crate::process::ProcessState;
use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source name used for events not tied to a single role.
pub const SUPERVISOR_SOURCE: &str = "supervisor";

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Routine progress.
    Info,
    /// A step completed as intended.
    Success,
    /// Something unexpected that did not stop the operation.
    Warning,
    /// An operation failed.
    Error,
}

/// Structured payload of a log event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    /// Free-form supervisor message.
    Message,
    /// One line of child output.
    LineLogged {
        /// Process that wrote the line.
        role: Role,
    },
    /// A new port was recorded for a role.
    PortDetected {
        /// Role whose port changed.
        role: Role,
        /// The recorded port.
        port: u16,
    },
    /// Child output reported a bind conflict.
    ConflictDetected {
        /// Process whose output contained the conflict marker.
        role: Role,
    },
    /// A managed process changed lifecycle state.
    StateChanged {
        /// Role that changed.
        role: Role,
        /// New state.
        state: ProcessState,
    },
    /// The liveness sweep saw a role come up or go down.
    LivenessChanged {
        /// Role that changed.
        role: Role,
        /// Whether any of its ports is listening.
        live: bool,
    },
    /// A managed process exited without being asked to.
    ProcessExited {
        /// Role whose process exited.
        role: Role,
        /// Exit code when the platform reports one.
        code: Option<i32>,
    },
}

/// A timestamped, leveled event for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
    /// Role name or [`SUPERVISOR_SOURCE`].
    pub source: String,
    /// Severity.
    pub level: LogLevel,
    /// Display text.
    pub text: String,
    /// Structured payload.
    pub kind: EventKind,
}

impl LogEvent {
    fn new(source: impl Into<String>, level: LogLevel, text: String, kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            level,
            text,
            kind,
        }
    }

    /// A free-form message from the supervisor itself.
    pub fn message(level: LogLevel, text: impl Into<String>) -> Self {
        Self::new(SUPERVISOR_SOURCE, level, text.into(), EventKind::Message)
    }

    /// A free-form message about one role.
    pub fn for_role(role: Role, level: LogLevel, text: impl Into<String>) -> Self {
        Self::new(role.as_str(), level, text.into(), EventKind::Message)
    }

    /// A line of child output, prefixed with the source name.
    pub fn line_logged(role: Role, line: &str) -> Self {
        Self::new(
            role.as_str(),
            LogLevel::Info,
            format!("[{}] {line}", role.display_name()),
            EventKind::LineLogged { role },
        )
    }

    /// A newly recorded port.
    pub fn port_detected(role: Role, port: u16) -> Self {
        Self::new(
            role.as_str(),
            LogLevel::Success,
            format!("Detected {role} port: {port}"),
            EventKind::PortDetected { role, port },
        )
    }

    /// A bind conflict reported in a process's output.
    pub fn conflict_detected(role: Role) -> Self {
        Self::new(
            role.as_str(),
            LogLevel::Error,
            format!("Port conflict detected in {}", role.display_name()),
            EventKind::ConflictDetected { role },
        )
    }

    /// A lifecycle transition.
    pub fn state_changed(role: Role, state: ProcessState) -> Self {
        let level = match state {
            ProcessState::Failed => LogLevel::Error,
            ProcessState::Running | ProcessState::Stopped => LogLevel::Success,
            _ => LogLevel::Info,
        };
        let name = role.display_name();
        let text = match state {
            ProcessState::Starting => format!("Starting {role} server..."),
            ProcessState::Running => format!("{name} server started successfully"),
            ProcessState::Stopping => format!("Stopping {role} server..."),
            ProcessState::Stopped => format!("{name} server process stopped"),
            ProcessState::NotStarted | ProcessState::Failed => format!("{name} server {state}"),
        };
        Self::new(
            role.as_str(),
            level,
            text,
            EventKind::StateChanged { role, state },
        )
    }

    /// A liveness flip from the sweep.
    pub fn liveness_changed(role: Role, live: bool) -> Self {
        let (level, word) = if live {
            (LogLevel::Success, "up")
        } else {
            (LogLevel::Warning, "down")
        };
        Self::new(
            role.as_str(),
            level,
            format!("{} is {word}", role.display_name()),
            EventKind::LivenessChanged { role, live },
        )
    }

    /// An unrequested exit.
    pub fn process_exited(role: Role, code: Option<i32>) -> Self {
        let text = code.map_or_else(
            || format!("{} server exited unexpectedly", role.display_name()),
            |code| {
                format!(
                    "{} server exited unexpectedly (code {code})",
                    role.display_name()
                )
            },
        );
        Self::new(
            role.as_str(),
            LogLevel::Warning,
            text,
            EventKind::ProcessExited { role, code },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_logged_is_prefixed_with_source() {
        let event = LogEvent::line_logged(Role::Frontend, "VITE ready");
        assert_eq!(event.text, "[Frontend] VITE ready");
        assert_eq!(event.level, LogLevel::Info);
        assert_eq!(event.source, "frontend");
    }

    #[test]
    fn test_conflict_is_error_level() {
        let event = LogEvent::conflict_detected(Role::Backend);
        assert_eq!(event.level, LogLevel::Error);
        assert_eq!(event.kind, EventKind::ConflictDetected { role: Role::Backend });
    }

    #[test]
    fn test_state_change_wording() {
        let starting = LogEvent::state_changed(Role::Frontend, ProcessState::Starting);
        assert_eq!(starting.text, "Starting frontend server...");
        assert_eq!(starting.level, LogLevel::Info);

        let running = LogEvent::state_changed(Role::Backend, ProcessState::Running);
        assert_eq!(running.text, "Backend server started successfully");
        assert_eq!(running.level, LogLevel::Success);

        let stopped = LogEvent::state_changed(Role::Combined, ProcessState::Stopped);
        assert_eq!(stopped.text, "Combined server process stopped");

        let failed = LogEvent::state_changed(Role::Frontend, ProcessState::Failed);
        assert_eq!(failed.level, LogLevel::Error);
    }

    #[test]
    fn test_event_serialization() {
        let event = LogEvent::port_detected(Role::Frontend, 5175);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"portDetected\""));
        assert!(json.contains("\"port\":5175"));
        assert!(json.contains("\"level\":\"success\""));
    }
}
