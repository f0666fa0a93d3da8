//! The process supervisor: owns the role table and drives every command.
//!
//! All role records live behind one lock. The lock is never held across an
//! await: termination takes the process handle out of its record, runs the
//! bounded waits unlocked, then writes the outcome back.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use devlaunch_core::{
    CleanupReport, DetectedPortStore, EventSink, LogEvent, LogLevel, PortPolicy,
    PortRegistryPort, ProcessError, ProcessLauncher, Role, RoleStatus, StartOutcome,
    SupervisorConfig, SupervisorError, TerminationOutcome,
};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::liveness::{LivenessCheck, LivenessMonitor, LivenessSnapshot, probe_any};
use crate::process::{ManagedProcess, MonitorContext, OutputRules, TokioLauncher};
use crate::registry::SystemPortRegistry;

/// How long shutdown waits for the liveness sweep task.
const SWEEP_JOIN_BOUND: Duration = Duration::from_secs(1);

/// The fixed set of role records.
struct ProcessTable {
    combined: ManagedProcess,
    frontend: ManagedProcess,
    backend: ManagedProcess,
}

impl ProcessTable {
    const fn get(&self, role: Role) -> &ManagedProcess {
        match role {
            Role::Combined => &self.combined,
            Role::Frontend => &self.frontend,
            Role::Backend => &self.backend,
        }
    }

    const fn get_mut(&mut self, role: Role) -> &mut ManagedProcess {
        match role {
            Role::Combined => &mut self.combined,
            Role::Frontend => &mut self.frontend,
            Role::Backend => &mut self.backend,
        }
    }

    /// Forget ports the combined launcher reported on behalf of roles that have
    /// no process of their own.
    fn clear_routed_ports(&mut self) {
        for role in [Role::Frontend, Role::Backend] {
            let record = self.get_mut(role);
            if !record.has_process() {
                record.clear_detected_port();
            }
        }
    }
}

/// State shared with output monitors and the liveness sweep.
struct SupervisorShared {
    table: Mutex<ProcessTable>,
}

impl SupervisorShared {
    fn lock(&self) -> MutexGuard<'_, ProcessTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DetectedPortStore for SupervisorShared {
    fn offer_port(&self, source: Role, role: Role, port: u16, policy: PortPolicy) -> bool {
        let mut table = self.lock();
        // A reaped process's monitor may still be draining its pipe.
        if !table.get(source).has_process() {
            return false;
        }
        table.get_mut(role).offer_port(port, policy)
    }

    fn detected_port(&self, role: Role) -> Option<u16> {
        self.lock().get(role).detected_port()
    }
}

/// Result of [`ProcessSupervisor::start_all`].
#[derive(Debug)]
pub struct StartAllReport {
    /// Outcome of the combined launch.
    pub combined: Result<StartOutcome, ProcessError>,
    /// Per-role outcomes when the combined launch could not be spawned.
    pub fallback: Vec<(Role, Result<StartOutcome, ProcessError>)>,
}

impl StartAllReport {
    /// Whether roles were started individually.
    pub fn used_fallback(&self) -> bool {
        !self.fallback.is_empty()
    }

    /// Whether at least one launch produced (or already had) a process.
    pub fn any_started(&self) -> bool {
        if self.used_fallback() {
            self.fallback.iter().any(|(_, result)| result.is_ok())
        } else {
            self.combined.is_ok()
        }
    }

    /// Whether every attempted launch produced (or already had) a process.
    pub fn all_succeeded(&self) -> bool {
        if self.used_fallback() {
            self.fallback.iter().all(|(_, result)| result.is_ok())
        } else {
            self.combined.is_ok()
        }
    }
}

/// Result of [`ProcessSupervisor::stop_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopAllReport {
    /// One entry per role, in stop order.
    pub outcomes: Vec<(Role, TerminationOutcome)>,
    /// The stray listener sweep run afterwards.
    pub cleanup: CleanupReport,
}

impl StopAllReport {
    pub fn all_stopped(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_stopped())
    }
}

/// Result of [`ProcessSupervisor::restart_all`].
#[derive(Debug)]
pub struct RestartReport {
    pub stopped: StopAllReport,
    pub started: StartAllReport,
}

struct SweepHandle {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the frontend, backend and combined process records.
///
/// Construct once and pass it to whatever drives it (CLI, UI, tests).
pub struct ProcessSupervisor {
    shared: Arc<SupervisorShared>,
    launcher: Arc<dyn ProcessLauncher>,
    registry: Arc<dyn PortRegistryPort>,
    sink: Arc<dyn EventSink>,
    rules: Arc<OutputRules>,
    config: SupervisorConfig,
    sweep: Mutex<Option<SweepHandle>>,
}

impl ProcessSupervisor {
    /// Create a supervisor over the given adapters.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Config`] if `config` fails validation.
    pub fn new(
        config: SupervisorConfig,
        launcher: Arc<dyn ProcessLauncher>,
        registry: Arc<dyn PortRegistryPort>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, SupervisorError> {
        config.validate()?;

        let record = |role: Role| {
            ManagedProcess::new(role, config.launch_spec(role).clone(), Arc::clone(&sink))
        };
        let table = ProcessTable {
            combined: record(Role::Combined),
            frontend: record(Role::Frontend),
            backend: record(Role::Backend),
        };

        Ok(Self {
            shared: Arc::new(SupervisorShared {
                table: Mutex::new(table),
            }),
            launcher,
            registry,
            rules: Arc::new(OutputRules::new(config.frontend_canonical_ports)),
            sink,
            config,
            sweep: Mutex::new(None),
        })
    }

    /// Create a supervisor that launches real processes and probes real sockets.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Config`] if `config` fails validation.
    pub fn with_system(
        config: SupervisorConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, SupervisorError> {
        let registry = SystemPortRegistry::new(config.probe_timeout());
        Self::new(
            config,
            Arc::new(TokioLauncher::new()),
            Arc::new(registry),
            sink,
        )
    }

    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    fn monitor_context(&self) -> MonitorContext {
        MonitorContext {
            rules: Arc::clone(&self.rules),
            store: Arc::clone(&self.shared) as Arc<dyn DetectedPortStore>,
            sink: Arc::clone(&self.sink),
        }
    }

    /// Start one role's process.
    ///
    /// A role that already holds a process is reported as
    /// [`StartOutcome::AlreadyRunning`] with a warning event, not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::SpawnFailed`] if the OS rejects the launch.
    pub fn start(&self, role: Role) -> Result<StartOutcome, ProcessError> {
        let context = self.monitor_context();
        let result = self
            .shared
            .lock()
            .get_mut(role)
            .spawn(self.launcher.as_ref(), &context);

        match result {
            Ok(pid) => Ok(StartOutcome::Started { pid }),
            Err(ProcessError::AlreadyRunning(_)) => {
                info!(role = %role, "start ignored, already running");
                self.sink.emit(LogEvent::for_role(
                    role,
                    LogLevel::Warning,
                    format!("{} server is already running", role.display_name()),
                ));
                Ok(StartOutcome::AlreadyRunning)
            }
            Err(e) => {
                self.sink
                    .emit(LogEvent::for_role(role, LogLevel::Error, e.to_string()));
                Err(e)
            }
        }
    }

    /// Stop one role's process with its grace period.
    ///
    /// Stopping a role without a process returns
    /// [`TerminationOutcome::AlreadyStopped`] and makes no OS calls.
    pub async fn stop(&self, role: Role) -> TerminationOutcome {
        let pending = self.shared.lock().get_mut(role).begin_termination();

        let Some(mut pending) = pending else {
            debug!(role = %role, "stop ignored, not running");
            self.sink.emit(LogEvent::for_role(
                role,
                LogLevel::Info,
                format!("{} server is not running", role.display_name()),
            ));
            return TerminationOutcome::AlreadyStopped;
        };

        info!(role = %role, pid = ?pending.pid(), "stopping process");
        let outcome = pending
            .run(self.config.grace_period(role), self.config.kill_confirm())
            .await;

        {
            let mut table = self.shared.lock();
            table.get_mut(role).finish_termination(pending, &outcome);
            if role == Role::Combined && outcome.is_stopped() {
                table.clear_routed_ports();
            }
        }

        match &outcome {
            TerminationOutcome::ForcedExit => self.sink.emit(LogEvent::for_role(
                role,
                LogLevel::Warning,
                format!("{} server did not exit in time and was killed", role.display_name()),
            )),
            TerminationOutcome::TerminationFailed { cause } => {
                self.sink.emit(LogEvent::for_role(
                    role,
                    LogLevel::Error,
                    format!("Failed to stop {} server: {cause}", role.display_name()),
                ));
            }
            TerminationOutcome::AlreadyStopped | TerminationOutcome::GracefulExit => {}
        }

        outcome
    }

    /// Start everything: one combined launch, or each role individually if the
    /// combined launch cannot be spawned.
    ///
    /// Only a spawn failure triggers the fallback; a combined process that is
    /// already running, or that fails later, does not.
    pub async fn start_all(&self) -> StartAllReport {
        self.sink
            .emit(LogEvent::message(LogLevel::Info, "Starting all servers..."));

        let combined = self.start(Role::Combined);
        if !matches!(combined, Err(ProcessError::SpawnFailed { .. })) {
            return StartAllReport {
                combined,
                fallback: Vec::new(),
            };
        }

        warn!("combined launch failed, starting roles individually");
        self.sink.emit(LogEvent::message(
            LogLevel::Warning,
            "Combined launch failed, starting servers individually...",
        ));

        let frontend = self.start(Role::Frontend);
        tokio::time::sleep(self.config.fallback_stagger()).await;
        let backend = self.start(Role::Backend);

        StartAllReport {
            combined,
            fallback: vec![(Role::Frontend, frontend), (Role::Backend, backend)],
        }
    }

    /// Stop every role, then sweep the well-known ports for stray listeners.
    ///
    /// Every role is attempted regardless of how earlier ones went.
    pub async fn stop_all(&self) -> StopAllReport {
        self.sink
            .emit(LogEvent::message(LogLevel::Info, "Stopping all servers..."));

        let mut outcomes = Vec::with_capacity(Role::ALL.len());
        for role in Role::ALL {
            let outcome = self.stop(role).await;
            outcomes.push((role, outcome));
        }

        let cleanup = self.clean_stray_listeners().await;

        let report = StopAllReport { outcomes, cleanup };
        if report.all_stopped() {
            self.sink
                .emit(LogEvent::message(LogLevel::Success, "All servers stopped"));
        }
        report
    }

    /// Stop everything, wait for the OS to release ports, start everything.
    pub async fn restart_all(&self) -> RestartReport {
        self.sink
            .emit(LogEvent::message(LogLevel::Info, "Restarting all servers..."));

        let stopped = self.stop_all().await;
        tokio::time::sleep(self.config.restart_settle()).await;
        let started = self.start_all().await;

        RestartReport { stopped, started }
    }

    /// Snapshot of every role.
    pub fn status(&self) -> BTreeMap<Role, RoleStatus> {
        let table = self.shared.lock();
        Role::ALL
            .into_iter()
            .map(|role| (role, table.get(role).status()))
            .collect()
    }

    pub fn status_of(&self, role: Role) -> RoleStatus {
        self.shared.lock().get(role).status()
    }

    /// The combined launcher serves the frontend's URL.
    const fn url_role(role: Role) -> Role {
        match role {
            Role::Combined | Role::Frontend => Role::Frontend,
            Role::Backend => Role::Backend,
        }
    }

    /// Detected port for `role`, if it is trusted without probing.
    fn authoritative_port(&self, role: Role) -> Option<u16> {
        let port = self.shared.lock().get(role).detected_port()?;
        self.config
            .port_policy(role)
            .is_authoritative(port)
            .then_some(port)
    }

    /// Whether a process that could still report `role`'s port is held.
    fn may_report_port(&self, role: Role) -> bool {
        let table = self.shared.lock();
        table.get(role).has_process() || table.get(Role::Combined).has_process()
    }

    /// Port for `role`'s URL.
    ///
    /// Tries, in order: a trusted detected port (re-checked once after a short
    /// delay while a process may still be announcing it), the role's canonical
    /// ports, the secondary development ports, and the role's default.
    pub async fn resolve_port(&self, role: Role) -> u16 {
        let role = Self::url_role(role);

        if let Some(port) = self.authoritative_port(role) {
            return port;
        }

        if self.may_report_port(role) {
            tokio::time::sleep(self.config.url_recheck()).await;
            if let Some(port) = self.authoritative_port(role) {
                return port;
            }
        }

        for port in self.config.canonical_ports(role) {
            if self.registry.is_port_in_use(port).await {
                debug!(role = %role, port = %port, "resolved from canonical probe");
                return port;
            }
        }

        for &port in &self.config.secondary_ports {
            if self.registry.is_port_in_use(port).await {
                debug!(role = %role, port = %port, "resolved from secondary probe");
                return port;
            }
        }

        self.config.default_port(role)
    }

    /// `http://localhost:<port>` for `role`.
    pub async fn resolve_url(&self, role: Role) -> String {
        format!("http://localhost:{}", self.resolve_port(role).await)
    }

    /// Best-effort termination of known dev-runtime processes left listening on
    /// the well-known ports.
    pub async fn clean_stray_listeners(&self) -> CleanupReport {
        self.sink
            .emit(LogEvent::message(LogLevel::Info, "Cleaning up stray processes..."));

        let report = self
            .registry
            .clean_stray_listeners(&self.config.cleanup_ports, &self.config.stray_process_names)
            .await;

        for listener in &report.terminated {
            self.sink.emit(LogEvent::message(
                LogLevel::Success,
                format!("Cleaned up process on port {}", listener.port),
            ));
        }
        for warning in &report.warnings {
            self.sink
                .emit(LogEvent::message(LogLevel::Warning, warning.clone()));
        }

        report
    }

    /// One sweep round: reap exited children, then probe each role's ports.
    pub async fn check_liveness(&self) -> LivenessSnapshot {
        self.sweep_check().check().await
    }

    fn sweep_check(&self) -> Arc<SweepCheck> {
        Arc::new(SweepCheck {
            shared: Arc::clone(&self.shared),
            registry: Arc::clone(&self.registry),
            frontend_ports: self.config.canonical_ports(Role::Frontend),
            backend_ports: self.config.canonical_ports(Role::Backend),
        })
    }

    /// Start the periodic liveness sweep. Does nothing if it is already running.
    pub fn start_liveness_sweep(&self) {
        let mut sweep = self.sweep.lock().unwrap_or_else(PoisonError::into_inner);
        if sweep.is_some() {
            return;
        }

        let cancel_token = CancellationToken::new();
        let stream = LivenessMonitor::new(self.config.liveness_interval(), cancel_token.clone())
            .monitor(self.sweep_check());
        let shared = Arc::clone(&self.shared);
        let sink = Arc::clone(&self.sink);

        let task = tokio::spawn(async move {
            tokio::pin!(stream);
            while let Some(snapshot) = stream.next().await {
                let changed: Vec<(Role, bool)> = {
                    let mut table = shared.lock();
                    snapshot
                        .into_iter()
                        .filter(|&(role, live)| table.get_mut(role).set_live(live))
                        .collect()
                };
                for (role, live) in changed {
                    sink.emit(LogEvent::liveness_changed(role, live));
                }
            }
        });

        *sweep = Some(SweepHandle { cancel_token, task });
    }

    /// Cancel the liveness sweep and wait (bounded) for it to finish.
    ///
    /// Does not stop any process; call [`Self::stop_all`] for that.
    pub async fn shutdown(&self) {
        let handle = self
            .sweep
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(SweepHandle { cancel_token, task }) = handle {
            cancel_token.cancel();
            if tokio::time::timeout(SWEEP_JOIN_BOUND, task).await.is_err() {
                warn!("liveness sweep did not stop in time");
            }
        }
    }
}

/// The supervisor's liveness check.
struct SweepCheck {
    shared: Arc<SupervisorShared>,
    registry: Arc<dyn PortRegistryPort>,
    frontend_ports: Vec<u16>,
    backend_ports: Vec<u16>,
}

impl SweepCheck {
    /// Detected port first, then the role's well-known ports.
    fn targets(detected: Option<u16>, defaults: &[u16]) -> Vec<u16> {
        let mut ports: Vec<u16> = detected.into_iter().collect();
        ports.extend(defaults.iter().copied().filter(|p| Some(*p) != detected));
        ports
    }
}

#[async_trait]
impl LivenessCheck for SweepCheck {
    async fn check(&self) -> LivenessSnapshot {
        let (frontend_ports, backend_ports) = {
            let mut table = self.shared.lock();
            for role in Role::ALL {
                let reaped = table.get_mut(role).reap_if_exited();
                if reaped.is_some() && role == Role::Combined {
                    table.clear_routed_ports();
                }
            }
            (
                Self::targets(table.frontend.detected_port(), &self.frontend_ports),
                Self::targets(table.backend.detected_port(), &self.backend_ports),
            )
        };

        let frontend = probe_any(self.registry.as_ref(), &frontend_ports).await;
        let backend = probe_any(self.registry.as_ref(), &backend_ports).await;

        BTreeMap::from([
            (Role::Combined, frontend || backend),
            (Role::Frontend, frontend),
            (Role::Backend, backend),
        ])
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        if let Some(sweep) = self
            .sweep
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            sweep.cancel_token.cancel();
        }
    }
}
