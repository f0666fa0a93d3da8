//! Core domain types and port definitions for devlaunch.
//!
//! This crate has no process or socket code. It defines the vocabulary shared by the
//! runtime (which spawns and probes) and adapters such as the CLI (which render events
//! and issue commands).

#![deny(unsafe_code)]

pub mod events;
pub mod ports;
pub mod process;
pub mod role;
pub mod settings;

// Re-export commonly used types for convenience
pub use events::{EventKind, LogEvent, LogLevel};
pub use ports::{
    ChildHandle, CleanupReport, DetectedPortStore, EventSink, ExitInfo, LaunchedProcess,
    NoopEventSink, OutputStream, PortRegistryPort, ProbeError, ProcessError, ProcessLauncher,
    StrayListener, SupervisorError,
};
pub use process::{LaunchSpec, ProcessState, RoleStatus, StartOutcome, TerminationOutcome};
pub use role::{ParseRoleError, PortPolicy, PortRange, Role};
pub use settings::{
    BACKEND_DEFAULT_PORT, CLEANUP_PORTS, ConfigError, FRONTEND_CANONICAL_PORTS,
    SECONDARY_DEV_PORTS, SupervisorConfig,
};
