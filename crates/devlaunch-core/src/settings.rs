//! Supervisor configuration and validation.
//!
//! Port sets and timings default to what the JavaScript tooling in a typical
//! Vite + Node project does out of the box.

use crate::process::LaunchSpec;
use crate::role::{PortPolicy, PortRange, Role};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Ports Vite binds to by default, walking upwards when one is taken.
pub const FRONTEND_CANONICAL_PORTS: PortRange = PortRange::new(5173, 5177);

/// Default backend port.
pub const BACKEND_DEFAULT_PORT: u16 = 5000;

/// Generic development ports probed when nothing canonical answers.
pub const SECONDARY_DEV_PORTS: [u16; 4] = [3000, 3001, 4000, 8080];

/// Ports swept by stray listener cleanup.
pub const CLEANUP_PORTS: [u16; 7] = [5000, 5173, 5174, 5175, 5176, 5177, 3000];

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A launch spec has no program.
    #[error("Launch command for {0} is empty")]
    EmptyCommand(Role),

    /// The frontend canonical range holds no ports.
    #[error("Frontend canonical port range {start}..={end} is empty")]
    EmptyCanonicalRange {
        /// Configured start.
        start: u16,
        /// Configured end.
        end: u16,
    },

    /// A default port is zero.
    #[error("Default port for {0} must be non-zero")]
    ZeroDefaultPort(Role),

    /// The liveness interval is zero.
    #[error("Liveness interval must be greater than zero")]
    ZeroLivenessInterval,
}

/// Complete supervisor configuration.
///
/// All durations are stored as milliseconds so the struct round-trips through
/// any serde format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Project root; the combined and frontend commands run here.
    pub project_root: PathBuf,
    /// Launch spec for the combined task-runner script.
    pub combined: LaunchSpec,
    /// Launch spec for the frontend dev server.
    pub frontend: LaunchSpec,
    /// Launch spec for the backend server.
    pub backend: LaunchSpec,
    /// Ports the frontend tooling binds by default.
    pub frontend_canonical_ports: PortRange,
    /// Port the backend binds by default.
    pub backend_default_port: u16,
    /// Generic dev ports probed during URL resolution.
    pub secondary_ports: Vec<u16>,
    /// Ports swept by stray listener cleanup.
    pub cleanup_ports: Vec<u16>,
    /// Case-insensitive substrings of executable names cleanup may terminate.
    pub stray_process_names: Vec<String>,
    /// Grace period before the combined process is killed.
    pub combined_grace_ms: u64,
    /// Grace period before an individual role's process is killed.
    pub role_grace_ms: u64,
    /// How long to wait for a killed process to be reaped.
    pub kill_confirm_ms: u64,
    /// Liveness sweep interval.
    pub liveness_interval_ms: u64,
    /// Delay between `StopAll` and `StartAll` during a restart.
    pub restart_settle_ms: u64,
    /// Delay between the frontend and backend launches on the fallback path.
    pub fallback_stagger_ms: u64,
    /// Delay before URL resolution re-checks a just-started process.
    pub url_recheck_ms: u64,
    /// Connect timeout of the fallback port probe.
    pub probe_timeout_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::for_project(".")
    }
}

impl SupervisorConfig {
    /// Default configuration for a project rooted at `root` with the backend in
    /// `<root>/backend`.
    pub fn for_project(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let backend_dir = root.join("backend");
        Self::with_dirs(root, backend_dir)
    }

    /// Default configuration with an explicit backend directory.
    pub fn with_dirs(root: impl Into<PathBuf>, backend_dir: impl AsRef<Path>) -> Self {
        let root = root.into();
        Self {
            combined: npm_script(&root, "dev"),
            frontend: npm_script(&root, "dev:frontend"),
            backend: npm_script(backend_dir.as_ref(), "dev"),
            project_root: root,
            frontend_canonical_ports: FRONTEND_CANONICAL_PORTS,
            backend_default_port: BACKEND_DEFAULT_PORT,
            secondary_ports: SECONDARY_DEV_PORTS.to_vec(),
            cleanup_ports: CLEANUP_PORTS.to_vec(),
            stray_process_names: vec!["node".to_string(), "npm".to_string()],
            combined_grace_ms: 5_000,
            role_grace_ms: 3_000,
            kill_confirm_ms: 2_000,
            liveness_interval_ms: 2_000,
            restart_settle_ms: 2_000,
            fallback_stagger_ms: 1_000,
            url_recheck_ms: 500,
            probe_timeout_ms: 1_000,
        }
    }

    /// Check the configuration for values the supervisor cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for role in Role::ALL {
            if self.launch_spec(role).program.trim().is_empty() {
                return Err(ConfigError::EmptyCommand(role));
            }
        }
        if self.frontend_canonical_ports.is_empty() {
            return Err(ConfigError::EmptyCanonicalRange {
                start: self.frontend_canonical_ports.start,
                end: self.frontend_canonical_ports.end,
            });
        }
        if self.frontend_canonical_ports.start == 0 {
            return Err(ConfigError::ZeroDefaultPort(Role::Frontend));
        }
        if self.backend_default_port == 0 {
            return Err(ConfigError::ZeroDefaultPort(Role::Backend));
        }
        if self.liveness_interval_ms == 0 {
            return Err(ConfigError::ZeroLivenessInterval);
        }
        Ok(())
    }

    /// Launch spec for `role`.
    #[must_use]
    pub const fn launch_spec(&self, role: Role) -> &LaunchSpec {
        match role {
            Role::Frontend => &self.frontend,
            Role::Backend => &self.backend,
            Role::Combined => &self.combined,
        }
    }

    /// Port-replacement policy for detections attributed to `role`.
    #[must_use]
    pub const fn port_policy(&self, role: Role) -> PortPolicy {
        match role {
            Role::Frontend | Role::Combined => {
                PortPolicy::CanonicalPriority(self.frontend_canonical_ports)
            }
            Role::Backend => PortPolicy::LatestWins,
        }
    }

    /// Canonical ports probed for `role`, ascending.
    #[must_use]
    pub fn canonical_ports(&self, role: Role) -> Vec<u16> {
        match role {
            Role::Frontend | Role::Combined => self.frontend_canonical_ports.iter().collect(),
            Role::Backend => vec![self.backend_default_port],
        }
    }

    /// Port assumed when nothing is detected or listening.
    #[must_use]
    pub const fn default_port(&self, role: Role) -> u16 {
        match role {
            Role::Frontend | Role::Combined => self.frontend_canonical_ports.start,
            Role::Backend => self.backend_default_port,
        }
    }

    /// Grace period for `role`'s termination.
    #[must_use]
    pub const fn grace_period(&self, role: Role) -> Duration {
        match role {
            Role::Combined => Duration::from_millis(self.combined_grace_ms),
            Role::Frontend | Role::Backend => Duration::from_millis(self.role_grace_ms),
        }
    }

    /// How long to wait for a killed process.
    #[must_use]
    pub const fn kill_confirm(&self) -> Duration {
        Duration::from_millis(self.kill_confirm_ms)
    }

    /// Liveness sweep interval.
    #[must_use]
    pub const fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }

    /// Restart settle delay.
    #[must_use]
    pub const fn restart_settle(&self) -> Duration {
        Duration::from_millis(self.restart_settle_ms)
    }

    /// Fallback stagger delay.
    #[must_use]
    pub const fn fallback_stagger(&self) -> Duration {
        Duration::from_millis(self.fallback_stagger_ms)
    }

    /// URL re-check delay.
    #[must_use]
    pub const fn url_recheck(&self) -> Duration {
        Duration::from_millis(self.url_recheck_ms)
    }

    /// Fallback connect probe timeout.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// `npm run <script>` in `dir`, wrapped in `cmd /c` on Windows where `npm` is a
/// batch file.
fn npm_script(dir: &Path, script: &str) -> LaunchSpec {
    if cfg!(windows) {
        LaunchSpec::new("cmd", ["/c", "npm", "run", script], dir)
    } else {
        LaunchSpec::new("npm", ["run", script], dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SupervisorConfig::for_project("/work/app");
        assert!(config.validate().is_ok());
        assert_eq!(config.backend.working_dir, PathBuf::from("/work/app/backend"));
        assert_eq!(config.frontend.working_dir, PathBuf::from("/work/app"));
        assert!(config.frontend.args.contains(&"dev:frontend".to_string()));
    }

    #[test]
    fn test_default_ports() {
        let config = SupervisorConfig::default();
        assert_eq!(config.default_port(Role::Frontend), 5173);
        assert_eq!(config.default_port(Role::Backend), 5000);
        assert_eq!(
            config.canonical_ports(Role::Frontend),
            vec![5173, 5174, 5175, 5176, 5177]
        );
        assert_eq!(config.secondary_ports, vec![3000, 3001, 4000, 8080]);
    }

    #[test]
    fn test_grace_periods_differ_for_combined() {
        let config = SupervisorConfig::default();
        assert_eq!(config.grace_period(Role::Combined), Duration::from_secs(5));
        assert_eq!(config.grace_period(Role::Backend), Duration::from_secs(3));
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let mut config = SupervisorConfig::default();
        config.backend.program = "  ".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyCommand(Role::Backend))
        );
    }

    #[test]
    fn test_validate_rejects_empty_range_and_zero_interval() {
        let mut config = SupervisorConfig::default();
        config.frontend_canonical_ports = PortRange::new(5177, 5173);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyCanonicalRange { .. })
        ));

        let mut config = SupervisorConfig::default();
        config.liveness_interval_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroLivenessInterval));
    }

    #[test]
    fn test_backend_policy_accepts_any_port() {
        let config = SupervisorConfig::default();
        assert_eq!(config.port_policy(Role::Backend), PortPolicy::LatestWins);
        assert!(matches!(
            config.port_policy(Role::Frontend),
            PortPolicy::CanonicalPriority(_)
        ));
    }

    #[test]
    fn test_config_deserializes_partial_json() {
        let config: SupervisorConfig =
            serde_json::from_str(r#"{"backend_default_port": 5050}"#).unwrap();
        assert_eq!(config.backend_default_port, 5050);
        assert_eq!(config.role_grace_ms, 3_000);
    }
}
