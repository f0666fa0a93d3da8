//! Terminal rendering for supervisor events and status.
//!
//! Format-only: nothing here talks to the supervisor.

pub mod events;
pub mod tables;

pub use events::{EventPrinter, render_event};
pub use tables::{format_optional, print_separator, render_status_row};
