//! Port liveness probing and stray listener cleanup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A listening process found on a well-known port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrayListener {
    /// Port the process listens on.
    pub port: u16,
    /// Process id.
    pub pid: u32,
    /// Executable name as reported by the OS.
    pub process_name: String,
}

/// Result of a best-effort cleanup sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Listeners that were sent a terminate signal.
    pub terminated: Vec<StrayListener>,
    /// Per-port problems that were swallowed.
    pub warnings: Vec<String>,
}

impl CleanupReport {
    /// Whether the sweep neither terminated anything nor hit a problem.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terminated.is_empty() && self.warnings.is_empty()
    }
}

/// Stateless port capability.
#[async_trait]
pub trait PortRegistryPort: Send + Sync {
    /// Whether something is listening on `port` on loopback.
    ///
    /// Never blocks longer than the probe timeout; has no side effects.
    async fn is_port_in_use(&self, port: u16) -> bool;

    /// Send a terminate signal to every listener on `ports` whose executable name
    /// contains one of `name_filter` (case-insensitive).
    ///
    /// Failures are collected as warnings, never returned as errors.
    async fn clean_stray_listeners(&self, ports: &[u16], name_filter: &[String]) -> CleanupReport;
}
