//! Port-extraction and conflict rules for child output.
//!
//! Rules are tried in priority order; the first one that matches a line decides
//! the detected port for that line. Each rule carries the [`PortPolicy`] that
//! decides whether its match may replace an already recorded port.

use std::sync::LazyLock;

use devlaunch_core::{PortPolicy, PortRange, Role};
use regex::Regex;

/// CSI escape sequences (colours, bold, cursor movement).
static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]").expect("static pattern"));

/// Vite banner: `Local:   http://localhost:5173/`. Tolerates bare `[1m`-style
/// remnants whose escape byte was already dropped by an intermediate tool.
static FRONTEND_BANNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Local:.*?localhost:(?:\[\d+(?:;\d+)*m)*(\d+)").expect("static pattern")
});

/// Backend banner: `Server running on http://localhost:5000`.
static BACKEND_BANNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)server running\b.*?http://localhost:(\d+)").expect("static pattern")
});

/// Substrings Node prints when a bind fails.
const CONFLICT_MARKERS: [&str; 2] = ["EADDRINUSE", "address already in use"];

/// Remove ANSI escape sequences from a line.
pub fn strip_ansi(line: &str) -> std::borrow::Cow<'_, str> {
    ANSI_ESCAPE.replace_all(line, "")
}

/// One port-extraction rule.
#[derive(Debug, Clone)]
pub struct PortRule {
    /// Short name used in debug logs.
    pub name: &'static str,
    /// Role whose port this rule detects.
    pub role: Role,
    /// Whether a match may replace the recorded port.
    pub policy: PortPolicy,
    pattern: &'static Regex,
}

impl PortRule {
    /// Extract a port from an ANSI-stripped line.
    pub fn extract(&self, line: &str) -> Option<u16> {
        let captures = self.pattern.captures(line)?;
        let port: u16 = captures.get(1)?.as_str().parse().ok()?;
        (port != 0).then_some(port)
    }
}

/// A port found in a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMatch {
    /// Role the port belongs to.
    pub role: Role,
    /// The port.
    pub port: u16,
    /// Replacement policy of the rule that matched.
    pub policy: PortPolicy,
}

/// What a line says.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineClass {
    /// Port from the highest-priority matching rule.
    pub port: Option<PortMatch>,
    /// Whether the line reports a bind conflict.
    pub conflict: bool,
}

/// The ordered rule set.
#[derive(Debug, Clone)]
pub struct OutputRules {
    rules: Vec<PortRule>,
}

impl OutputRules {
    /// Standard rules: the frontend banner (restricted to `frontend_range` for
    /// priority) ahead of the generic backend banner.
    pub fn new(frontend_range: PortRange) -> Self {
        Self {
            rules: vec![
                PortRule {
                    name: "frontend-banner",
                    role: Role::Frontend,
                    policy: PortPolicy::CanonicalPriority(frontend_range),
                    pattern: &FRONTEND_BANNER,
                },
                PortRule {
                    name: "backend-banner",
                    role: Role::Backend,
                    policy: PortPolicy::LatestWins,
                    pattern: &BACKEND_BANNER,
                },
            ],
        }
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[PortRule] {
        &self.rules
    }

    /// Classify one line of output.
    pub fn classify(&self, line: &str) -> LineClass {
        let conflict = CONFLICT_MARKERS.iter().any(|marker| line.contains(marker));
        let clean = strip_ansi(line);
        let port = self.rules.iter().find_map(|rule| {
            rule.extract(&clean).map(|port| PortMatch {
                role: rule.role,
                port,
                policy: rule.policy,
            })
        });
        LineClass { port, conflict }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> OutputRules {
        OutputRules::new(PortRange::new(5173, 5177))
    }

    #[test]
    fn test_plain_vite_banner() {
        let class = rules().classify("  ➜  Local:   http://localhost:5175/");
        let found = class.port.unwrap();
        assert_eq!(found.role, Role::Frontend);
        assert_eq!(found.port, 5175);
        assert!(!class.conflict);
    }

    #[test]
    fn test_coloured_vite_banner() {
        let line = "  \x1b[32m➜\x1b[39m  \x1b[1mLocal\x1b[22m:   \x1b[36mhttp://localhost:\x1b[1m5174\x1b[22m/\x1b[39m";
        assert_eq!(rules().classify(line).port.unwrap().port, 5174);
    }

    #[test]
    fn test_banner_with_orphaned_style_codes() {
        let line = "Local:   http://localhost:[1m5176[22m/";
        assert_eq!(rules().classify(line).port.unwrap().port, 5176);
    }

    #[test]
    fn test_backend_banner() {
        let class = rules().classify("Server running on http://localhost:5000");
        let found = class.port.unwrap();
        assert_eq!(found.role, Role::Backend);
        assert_eq!(found.port, 5000);
        assert_eq!(found.policy, PortPolicy::LatestWins);
    }

    #[test]
    fn test_localhost_without_banner_is_ignored() {
        assert_eq!(rules().classify("proxying to http://localhost:3000").port, None);
        assert_eq!(rules().classify("").port, None);
    }

    #[test]
    fn test_out_of_range_port_is_rejected() {
        assert_eq!(rules().classify("Local: http://localhost:99999/").port, None);
        assert_eq!(rules().classify("Local: http://localhost:0/").port, None);
        assert_eq!(rules().classify("Local: http://localhost:517300/").port, None);
        assert_eq!(rules().classify("Server running on http://localhost:500000").port, None);
    }

    #[test]
    fn test_conflict_markers() {
        assert!(rules().classify("Error: listen EADDRINUSE: address already in use :::5000").conflict);
        assert!(rules().classify("bind: address already in use").conflict);
        assert!(!rules().classify("eaddrinuse").conflict);
    }

    #[test]
    fn test_frontend_rule_has_priority() {
        let rules = rules();
        assert_eq!(rules.rules()[0].role, Role::Frontend);
        let class = rules.classify("Local: http://localhost:5173 | Server running on http://localhost:5000");
        assert_eq!(class.port.unwrap().role, Role::Frontend);
    }
}
