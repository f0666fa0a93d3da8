//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the supervisor expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `tokio::process` types in any signature
//! - No socket enumeration details
//! - Intent-based methods (launch, terminate, probe) rather than raw syscalls

pub mod event_sink;
pub mod launcher;
pub mod port_registry;
pub mod port_store;

use crate::role::{ParseRoleError, Role};
use crate::settings::ConfigError;
use thiserror::Error;

pub use event_sink::{EventSink, NoopEventSink};
pub use launcher::{ChildHandle, ExitInfo, LaunchedProcess, OutputStream, ProcessLauncher};
pub use port_registry::{CleanupReport, PortRegistryPort, StrayListener};
pub use port_store::DetectedPortStore;

/// Errors from launching a managed process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The OS rejected the launch (missing executable, bad working directory,
    /// permission denied).
    #[error("Failed to start {role}: {cause}")]
    SpawnFailed {
        /// Role that failed to start.
        role: Role,
        /// OS-level reason.
        cause: String,
    },

    /// The role already holds a live process.
    #[error("{0} is already running")]
    AlreadyRunning(Role),
}

/// Errors from probing listening sockets.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Listening sockets could not be enumerated (usually a permission failure).
    #[error("Failed to enumerate listening sockets: {0}")]
    Enumeration(String),

    /// The connect-based fallback failed for a reason other than "nothing listening".
    #[error("Connect probe on port {port} failed: {cause}")]
    Connect {
        /// Probed port.
        port: u16,
        /// Socket error.
        cause: String,
    },
}

/// Error type for supervisor commands.
///
/// Adapters map this to their own error types (CLI exit codes, UI dialogs).
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Process operation failed.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A command named a role that does not exist.
    #[error(transparent)]
    UnknownRole(#[from] ParseRoleError),
}
