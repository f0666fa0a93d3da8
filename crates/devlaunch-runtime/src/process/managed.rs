//! One supervised OS process and its lifecycle record.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use devlaunch_core::{
    ChildHandle, DetectedPortStore, EventSink, ExitInfo, LaunchSpec, LogEvent, PortPolicy,
    ProcessError, ProcessLauncher, ProcessState, Role, RoleStatus, TerminationOutcome,
};
use tracing::{debug, info, warn};

use super::monitor::{MonitorHandle, OutputMonitor};
use super::rules::OutputRules;

/// How long a stopped process's output monitor may take to drain.
pub const MONITOR_JOIN_BOUND: Duration = Duration::from_secs(1);

/// What a newly spawned process's output monitor reports into.
#[derive(Clone)]
pub struct MonitorContext {
    pub rules: Arc<OutputRules>,
    pub store: Arc<dyn DetectedPortStore>,
    pub sink: Arc<dyn EventSink>,
}

/// Lifecycle record for one role.
///
/// Owns the OS process handle exclusively: a record holds at most one handle, and
/// the handle is only released once an exit has been confirmed. State changes
/// are reported to the event sink as they happen.
pub struct ManagedProcess {
    role: Role,
    spec: LaunchSpec,
    state: ProcessState,
    pid: Option<u32>,
    detected_port: Option<u16>,
    started_at: Option<DateTime<Utc>>,
    live: bool,
    handle: Option<Box<dyn ChildHandle>>,
    monitor: Option<MonitorHandle>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("pid", &self.pid)
            .field("detected_port", &self.detected_port)
            .field("has_handle", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

impl ManagedProcess {
    /// Create a record in `NotStarted`.
    pub fn new(role: Role, spec: LaunchSpec, sink: Arc<dyn EventSink>) -> Self {
        Self {
            role,
            spec,
            state: ProcessState::NotStarted,
            pid: None,
            detected_port: None,
            started_at: None,
            live: false,
            handle: None,
            monitor: None,
            sink,
        }
    }

    pub const fn role(&self) -> Role {
        self.role
    }

    pub const fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    pub const fn state(&self) -> ProcessState {
        self.state
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub const fn detected_port(&self) -> Option<u16> {
        self.detected_port
    }

    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub const fn is_live(&self) -> bool {
        self.live
    }

    /// Whether an OS process handle is currently held.
    pub const fn has_process(&self) -> bool {
        self.handle.is_some()
    }

    /// Snapshot for callers.
    pub fn status(&self) -> RoleStatus {
        RoleStatus {
            state: self.state,
            pid: self.pid,
            port: self.detected_port,
            live: self.live,
            started_at: self.started_at,
        }
    }

    /// Record `port` if `policy` allows it to replace the current value.
    pub fn offer_port(&mut self, port: u16, policy: PortPolicy) -> bool {
        if policy.should_replace(self.detected_port, port) {
            self.detected_port = Some(port);
            true
        } else {
            false
        }
    }

    pub fn clear_detected_port(&mut self) {
        self.detected_port = None;
    }

    /// Update the advisory liveness flag. Returns `true` if it changed.
    pub fn set_live(&mut self, live: bool) -> bool {
        let changed = self.live != live;
        self.live = live;
        changed
    }

    fn transition(&mut self, state: ProcessState) {
        if self.state != state {
            debug!(role = %self.role, from = %self.state, to = %state, "state transition");
            self.state = state;
            self.sink.emit(LogEvent::state_changed(self.role, state));
        }
    }

    /// Launch the process and attach an output monitor.
    ///
    /// A previously crashed child is reaped first, so only a live handle blocks a
    /// new launch.
    ///
    /// # Errors
    ///
    /// [`ProcessError::AlreadyRunning`] if a process is held or being stopped, or
    /// [`ProcessError::SpawnFailed`] if the OS rejects the launch (state becomes
    /// `Failed`).
    pub fn spawn(
        &mut self,
        launcher: &dyn ProcessLauncher,
        context: &MonitorContext,
    ) -> Result<Option<u32>, ProcessError> {
        self.reap_if_exited();

        if self.handle.is_some() || self.state == ProcessState::Stopping {
            return Err(ProcessError::AlreadyRunning(self.role));
        }

        self.transition(ProcessState::Starting);

        let launched = match launcher.launch(self.role, &self.spec) {
            Ok(launched) => launched,
            Err(e) => {
                warn!(role = %self.role, error = %e, "spawn failed");
                self.transition(ProcessState::Failed);
                return Err(e);
            }
        };

        let pid = launched.handle.pid();
        self.pid = pid;
        self.detected_port = None;
        self.started_at = Some(Utc::now());
        self.handle = Some(launched.handle);

        let monitor = OutputMonitor::new(
            self.role,
            Arc::clone(&context.rules),
            Arc::clone(&context.store),
            Arc::clone(&context.sink),
        );
        self.monitor = Some(monitor.start(launched.outputs));

        info!(role = %self.role, pid = ?pid, "process started");
        self.transition(ProcessState::Running);
        Ok(pid)
    }

    /// Release the handle if the child has exited on its own.
    ///
    /// Returns the exit information when an exit was observed.
    pub fn reap_if_exited(&mut self) -> Option<ExitInfo> {
        let exit = self.handle.as_mut()?.try_exit()?;

        warn!(role = %self.role, pid = ?self.pid, code = ?exit.code, "process exited");
        self.handle = None;
        // Dropping the handle detaches the task; it ends at EOF.
        self.monitor = None;
        self.pid = None;
        self.detected_port = None;
        self.sink.emit(LogEvent::process_exited(self.role, exit.code));
        self.transition(ProcessState::Stopped);
        Some(exit)
    }

    /// Take the handle out for termination and move to `Stopping`.
    ///
    /// Returns `None` (no OS calls needed) when no process is held.
    pub fn begin_termination(&mut self) -> Option<PendingTermination> {
        let handle = self.handle.take()?;
        let monitor = self.monitor.take();
        self.transition(ProcessState::Stopping);
        Some(PendingTermination { handle, monitor })
    }

    /// Apply the outcome of a termination started with [`Self::begin_termination`].
    ///
    /// A confirmed exit clears pid and port and lands in `Stopped`. A failed
    /// termination keeps the handle so the process is still owned, in `Failed`.
    pub fn finish_termination(
        &mut self,
        pending: PendingTermination,
        outcome: &TerminationOutcome,
    ) {
        if outcome.is_stopped() {
            self.pid = None;
            self.detected_port = None;
            self.transition(ProcessState::Stopped);
        } else {
            warn!(role = %self.role, pid = ?self.pid, outcome = %outcome, "termination not confirmed");
            self.handle = Some(pending.handle);
            self.monitor = pending.monitor;
            self.transition(ProcessState::Failed);
        }
    }

    /// Run the whole termination protocol on an exclusively owned record.
    pub async fn terminate(&mut self, grace: Duration, confirm: Duration) -> TerminationOutcome {
        let Some(mut pending) = self.begin_termination() else {
            return TerminationOutcome::AlreadyStopped;
        };
        let outcome = pending.run(grace, confirm).await;
        self.finish_termination(pending, &outcome);
        outcome
    }
}

/// A process handle taken out of its record while the termination protocol runs.
///
/// Lets the caller drop the record's lock across the bounded waits.
pub struct PendingTermination {
    handle: Box<dyn ChildHandle>,
    monitor: Option<MonitorHandle>,
}

impl PendingTermination {
    pub fn pid(&self) -> Option<u32> {
        self.handle.pid()
    }

    /// Terminate the process, then give its monitor a bounded chance to drain.
    pub async fn run(&mut self, grace: Duration, confirm: Duration) -> TerminationOutcome {
        let outcome = self.handle.terminate(grace, confirm).await;
        if outcome.confirmed_exit() {
            if let Some(monitor) = self.monitor.take() {
                monitor.join(MONITOR_JOIN_BOUND).await;
            }
        }
        outcome
    }
}
