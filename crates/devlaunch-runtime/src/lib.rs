//! OS-facing runtime for the development process supervisor.
//!
//! Implements the ports defined in `devlaunch-core` with `tokio::process`, OS
//! socket enumeration and signals, and provides the [`ProcessSupervisor`] that
//! ties them together.

#![deny(unsafe_code)]

pub mod liveness;
pub mod process;
pub mod registry;
pub mod sink;
mod supervisor;

pub use liveness::{LivenessCheck, LivenessMonitor, LivenessSnapshot, probe_any};
pub use process::{ManagedProcess, OutputMonitor, OutputRules, TokioLauncher};
pub use registry::SystemPortRegistry;
pub use sink::{BroadcastEventSink, TracingEventSink};
pub use supervisor::{ProcessSupervisor, RestartReport, StartAllReport, StopAllReport};
