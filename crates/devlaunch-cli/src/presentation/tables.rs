//! Table formatting utilities for CLI output.

use chrono::Local;
use devlaunch_core::{Role, RoleStatus};

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Format an optional value for table display, returning a default if None.
pub fn format_optional<T: std::fmt::Display>(value: Option<T>, default: &str) -> String {
    value.map_or_else(|| default.to_string(), |v| v.to_string())
}

/// Header matching [`render_status_row`].
pub const STATUS_HEADER: &str = "Role       State        PID      Port   Live  Started";

/// One status table row.
pub fn render_status_row(role: Role, status: &RoleStatus) -> String {
    let started = status.started_at.map(|t| {
        t.with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string()
    });
    format!(
        "{:<10} {:<12} {:<8} {:<6} {:<5} {}",
        role.display_name(),
        status.state.label(),
        format_optional(status.pid, "--"),
        format_optional(status.port, "--"),
        if status.live { "up" } else { "down" },
        format_optional(started, "--"),
    )
}
