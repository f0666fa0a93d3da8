//! Port liveness probing and stray listener cleanup against the local OS.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use devlaunch_core::{CleanupReport, PortRegistryPort, ProbeError, StrayListener};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::process::terminate_pid;

/// A listening socket as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SocketOwner {
    addr: SocketAddr,
    pid: u32,
    name: String,
}

/// [`PortRegistryPort`] backed by OS socket enumeration.
///
/// Probes consult the listening-socket table first. When that is unavailable, or
/// shows nothing on the port, a TCP connect to loopback with a short timeout
/// decides.
#[derive(Debug, Clone, Copy)]
pub struct SystemPortRegistry {
    probe_timeout: Duration,
}

impl Default for SystemPortRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl SystemPortRegistry {
    pub const fn new(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }

    /// Enumerate listening sockets on any of `ports`.
    async fn listeners_on(ports: &[u16]) -> Result<Vec<SocketOwner>, ProbeError> {
        let wanted: BTreeSet<u16> = ports.iter().copied().collect();
        tokio::task::spawn_blocking(move || -> Result<Vec<SocketOwner>, ProbeError> {
            let all = listeners::get_all().map_err(|e| ProbeError::Enumeration(e.to_string()))?;
            Ok(all
                .into_iter()
                .filter(|l| wanted.contains(&l.socket.port()))
                .map(|l| SocketOwner {
                    addr: l.socket,
                    pid: l.process.pid,
                    name: l.process.name,
                })
                .collect())
        })
        .await
        .map_err(|e| ProbeError::Enumeration(e.to_string()))?
    }

    /// Connect-based probe. Refused or timed out means nothing is listening.
    async fn connect_probe(&self, port: u16) -> Result<bool, ProbeError> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        match tokio::time::timeout(self.probe_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => Ok(false),
            Ok(Err(e)) => Err(ProbeError::Connect {
                port,
                cause: e.to_string(),
            }),
            Err(_) => Ok(false),
        }
    }
}

/// Whether `name` contains any of `filter`, ignoring case.
fn name_matches(name: &str, filter: &[String]) -> bool {
    let name = name.to_lowercase();
    filter
        .iter()
        .any(|f| !f.is_empty() && name.contains(&f.to_lowercase()))
}

#[async_trait]
impl PortRegistryPort for SystemPortRegistry {
    async fn is_port_in_use(&self, port: u16) -> bool {
        match Self::listeners_on(&[port]).await {
            Ok(found) => {
                if found
                    .iter()
                    .any(|s| s.addr.ip().is_loopback() || s.addr.ip().is_unspecified())
                {
                    return true;
                }
            }
            Err(e) => debug!(port = %port, error = %e, "socket enumeration unavailable"),
        }

        match self.connect_probe(port).await {
            Ok(in_use) => in_use,
            Err(e) => {
                warn!(port = %port, error = %e, "port probe failed");
                false
            }
        }
    }

    async fn clean_stray_listeners(&self, ports: &[u16], name_filter: &[String]) -> CleanupReport {
        let mut report = CleanupReport::default();

        let owners = match Self::listeners_on(ports).await {
            Ok(owners) => owners,
            Err(e) => {
                warn!(error = %e, "stray listener cleanup skipped");
                report.warnings.push(e.to_string());
                return report;
            }
        };

        let own_pid = std::process::id();
        let mut seen = BTreeSet::new();

        for port in ports {
            for owner in owners.iter().filter(|o| o.addr.port() == *port) {
                if owner.pid == own_pid || !name_matches(&owner.name, name_filter) {
                    continue;
                }
                // One process often listens on both IPv4 and IPv6.
                if !seen.insert(owner.pid) {
                    continue;
                }

                let listener = StrayListener {
                    port: *port,
                    pid: owner.pid,
                    process_name: owner.name.clone(),
                };

                match terminate_pid(owner.pid) {
                    Ok(()) => {
                        info!(port = %port, pid = %owner.pid, name = %owner.name, "Cleaned up stray listener");
                        report.terminated.push(listener);
                    }
                    Err(e) => {
                        let message = match e.kind() {
                            ErrorKind::NotFound => {
                                format!("Port {port}: process {} already exited", owner.pid)
                            }
                            ErrorKind::PermissionDenied => {
                                format!("Port {port}: access denied to process {}", owner.pid)
                            }
                            _ => format!("Port {port}: could not stop process {}: {e}", owner.pid),
                        };
                        warn!(port = %port, pid = %owner.pid, error = %e, "stray listener not stopped");
                        report.warnings.push(message);
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_filter_is_case_insensitive_substring() {
        let filter = vec!["node".to_string(), "npm".to_string()];
        assert!(name_matches("node", &filter));
        assert!(name_matches("Node.exe", &filter));
        assert!(name_matches("npm-cli", &filter));
        assert!(!name_matches("python3", &filter));
        assert!(!name_matches("node", &[]));
        assert!(!name_matches("node", &[String::new()]));
    }

    #[tokio::test]
    async fn test_bound_port_is_in_use() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let registry = SystemPortRegistry::new(Duration::from_millis(500));

        assert!(registry.is_port_in_use(port).await);
    }

    #[tokio::test]
    async fn test_released_port_is_free() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let registry = SystemPortRegistry::new(Duration::from_millis(500));

        assert!(!registry.is_port_in_use(port).await);
    }

    #[tokio::test]
    async fn test_cleanup_never_touches_unfiltered_processes() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let registry = SystemPortRegistry::default();

        let report = registry
            .clean_stray_listeners(&[port], &["no-such-runtime-name".to_string()])
            .await;

        assert!(report.terminated.is_empty());
        // Still listening: our own socket was left alone.
        assert!(registry.is_port_in_use(port).await);
    }

    #[tokio::test]
    async fn test_cleanup_skips_own_process() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let registry = SystemPortRegistry::default();

        // Matches any process name.
        let everything: Vec<String> = ('a'..='z').map(String::from).collect();
        let report = registry.clean_stray_listeners(&[port], &everything).await;

        assert!(report.terminated.iter().all(|l| l.pid != std::process::id()));
        assert!(registry.is_port_in_use(port).await);
    }
}
