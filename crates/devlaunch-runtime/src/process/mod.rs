//! Process management: launching, output monitoring, and termination.

mod launcher;
mod managed;
mod monitor;
mod rules;
mod shutdown;
mod stream;

pub use launcher::{TokioChild, TokioLauncher};
pub use managed::{MONITOR_JOIN_BOUND, ManagedProcess, MonitorContext, PendingTermination};
pub use monitor::{MonitorHandle, OutputMonitor};
pub use rules::{LineClass, OutputRules, PortMatch, PortRule, strip_ansi};
pub use shutdown::{shutdown_child, terminate_pid};
pub use stream::line_stream;
