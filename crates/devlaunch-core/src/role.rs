//! Roles and the port rules attached to them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A logical server managed by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The frontend dev server (Vite).
    Frontend,
    /// The backend API server.
    Backend,
    /// A single task-runner process that launches both of the above.
    Combined,
}

impl Role {
    /// Every role, in the order the supervisor stops them.
    pub const ALL: [Self; 3] = [Self::Combined, Self::Frontend, Self::Backend];

    /// Lowercase identifier used in commands and serialized payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Frontend => "frontend",
            Self::Backend => "backend",
            Self::Combined => "combined",
        }
    }

    /// Capitalized name used as the prefix of user-facing log lines.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Frontend => "Frontend",
            Self::Backend => "Backend",
            Self::Combined => "Combined",
        }
    }

    /// Whether output from `source` may update the detected port of `self`.
    ///
    /// A role's own output always counts; the combined launcher speaks for both.
    #[must_use]
    pub fn accepts_output_from(self, source: Self) -> bool {
        self == source || source == Self::Combined
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role '{0}' (expected frontend, backend or combined)")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frontend" | "front" | "fe" => Ok(Self::Frontend),
            "backend" | "back" | "be" => Ok(Self::Backend),
            "combined" | "both" | "all" => Ok(Self::Combined),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// An inclusive range of TCP ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    /// First port in the range.
    pub start: u16,
    /// Last port in the range (inclusive).
    pub end: u16,
}

impl PortRange {
    /// Create a new inclusive range.
    #[must_use]
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    /// Check whether `port` lies within the range.
    #[must_use]
    pub const fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }

    /// Whether the range holds no ports.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Iterate the ports in ascending order.
    #[must_use]
    pub const fn iter(&self) -> std::ops::RangeInclusive<u16> {
        self.start..=self.end
    }
}

/// Decides whether a newly detected port replaces the recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortPolicy {
    /// Ports inside `canonical` win over anything outside it. Once a canonical
    /// port is recorded, a non-canonical candidate never overwrites it.
    CanonicalPriority(PortRange),
    /// Any different port replaces the recorded one.
    LatestWins,
}

impl PortPolicy {
    /// Whether `candidate` should replace `current`.
    ///
    /// Returns `false` when the value would not change.
    #[must_use]
    pub const fn should_replace(&self, current: Option<u16>, candidate: u16) -> bool {
        if let Some(current) = current {
            if current == candidate {
                return false;
            }
        }
        match self {
            Self::LatestWins => true,
            Self::CanonicalPriority(range) => match current {
                Some(current) if range.contains(current) => range.contains(candidate),
                _ => true,
            },
        }
    }

    /// Whether a recorded port can be trusted without probing.
    #[must_use]
    pub const fn is_authoritative(&self, port: u16) -> bool {
        match self {
            Self::LatestWins => true,
            Self::CanonicalPriority(range) => range.contains(port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VITE: PortRange = PortRange::new(5173, 5177);

    #[test]
    fn test_role_round_trip_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!("Both".parse::<Role>().unwrap(), Role::Combined);
        assert!("database".parse::<Role>().is_err());
    }

    #[test]
    fn test_combined_output_feeds_both_roles() {
        assert!(Role::Frontend.accepts_output_from(Role::Combined));
        assert!(Role::Backend.accepts_output_from(Role::Combined));
        assert!(Role::Frontend.accepts_output_from(Role::Frontend));
        assert!(!Role::Frontend.accepts_output_from(Role::Backend));
    }

    #[test]
    fn test_canonical_port_is_never_replaced_by_outsider() {
        let policy = PortPolicy::CanonicalPriority(VITE);
        assert!(policy.should_replace(None, 3000));
        assert!(policy.should_replace(Some(3000), 5174));
        assert!(!policy.should_replace(Some(5174), 3000));
        assert!(policy.should_replace(Some(5174), 5175));
        assert!(!policy.should_replace(Some(5174), 5174));
    }

    #[test]
    fn test_latest_wins_replaces_any_change() {
        let policy = PortPolicy::LatestWins;
        assert!(policy.should_replace(Some(5000), 5001));
        assert!(!policy.should_replace(Some(5000), 5000));
        assert!(policy.is_authoritative(1234));
    }

    #[test]
    fn test_authoritative_only_inside_range() {
        let policy = PortPolicy::CanonicalPriority(VITE);
        assert!(policy.is_authoritative(5177));
        assert!(!policy.is_authoritative(3000));
    }
}
