//! Synchronized access to detected ports.

use crate::role::{PortPolicy, Role};

/// Where output monitors record the ports they detect.
///
/// Implementations apply `policy` and the write atomically under their own lock,
/// so concurrent monitors resolve as last-write-wins subject to the policy.
pub trait DetectedPortStore: Send + Sync {
    /// Offer `port` for `role`, as read from `source`'s output.
    ///
    /// Returns `true` when the recorded port changed. Offers from a `source`
    /// that no longer holds a process are rejected.
    fn offer_port(&self, source: Role, role: Role, port: u16, policy: PortPolicy) -> bool;

    /// The currently recorded port for `role`.
    fn detected_port(&self, role: Role) -> Option<u16>;
}
