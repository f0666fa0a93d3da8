//! Termination protocol for launched processes.
//!
//! Provides two strategies:
//! - `shutdown_child`: for processes we own a `Child` handle for (graceful → forced, with reaping)
//! - `terminate_pid`: for stray listeners we only know by PID (single terminate signal, no reaping)

mod child;
mod pid;

pub use child::shutdown_child;
pub use pid::terminate_pid;
