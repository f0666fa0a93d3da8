//! Output monitor: turns child output into log, port and conflict events.

use std::sync::Arc;
use std::time::Duration;

use devlaunch_core::{DetectedPortStore, EventSink, LogEvent, OutputStream, Role};
use futures_util::StreamExt;
use futures_util::stream::select_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::rules::OutputRules;
use super::stream::line_stream;

/// Reads one process's output and reports what it says.
///
/// Line order within each pipe is preserved. Port detections go through the
/// [`DetectedPortStore`], which applies the rule's policy under its lock; the
/// monitor never touches shared state directly.
pub struct OutputMonitor {
    role: Role,
    rules: Arc<OutputRules>,
    store: Arc<dyn DetectedPortStore>,
    sink: Arc<dyn EventSink>,
}

impl OutputMonitor {
    /// Create a monitor for output produced by `role`'s process.
    pub fn new(
        role: Role,
        rules: Arc<OutputRules>,
        store: Arc<dyn DetectedPortStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            role,
            rules,
            store,
            sink,
        }
    }

    /// Process one line of output.
    ///
    /// Blank lines are dropped. Every other line is logged; a banner port is
    /// recorded (and reported) only when it changes the recorded value; a
    /// conflict marker is reported but never acted on.
    pub fn handle_line(&self, raw: &str) {
        let line = raw.trim();
        if line.is_empty() {
            return;
        }

        self.sink.emit(LogEvent::line_logged(self.role, line));

        let class = self.rules.classify(line);

        if let Some(found) = class.port {
            if found.role.accepts_output_from(self.role) {
                if self
                    .store
                    .offer_port(self.role, found.role, found.port, found.policy)
                {
                    info!(source = %self.role, role = %found.role, port = %found.port, "Detected port");
                    self.sink.emit(LogEvent::port_detected(found.role, found.port));
                } else {
                    debug!(
                        source = %self.role,
                        role = %found.role,
                        port = %found.port,
                        current = ?self.store.detected_port(found.role),
                        "Port not recorded"
                    );
                }
            }
        }

        if class.conflict {
            warn!(source = %self.role, "Port conflict in output");
            self.sink.emit(LogEvent::conflict_detected(self.role));
        }
    }

    /// Start the read loop on a dedicated task.
    ///
    /// The task ends when every pipe reaches EOF, which happens once the process
    /// (and anything holding its pipes) has exited.
    pub fn start(self, outputs: Vec<OutputStream>) -> MonitorHandle {
        let role = self.role;
        let streams = outputs.into_iter().enumerate().map(|(index, output)| {
            let label = if index == 0 { "stdout" } else { "stderr" };
            Box::pin(line_stream(output, label))
        });
        let mut lines = select_all(streams);

        let task = tokio::spawn(async move {
            while let Some(line) = lines.next().await {
                self.handle_line(&line);
            }
            debug!(role = %role, "output monitor exiting");
        });

        MonitorHandle { role, task }
    }
}

/// Handle to a running monitor task.
#[derive(Debug)]
pub struct MonitorHandle {
    role: Role,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Role being monitored.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Whether the read loop has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait up to `bound` for the read loop to end, aborting it otherwise.
    ///
    /// Returns `true` if the loop ended on its own.
    pub async fn join(mut self, bound: Duration) -> bool {
        if let Ok(result) = tokio::time::timeout(bound, &mut self.task).await {
            if let Err(e) = result {
                warn!(role = %self.role, error = %e, "output monitor task failed");
            }
            true
        } else {
            debug!(role = %self.role, "output monitor still reading, aborting");
            self.task.abort();
            false
        }
    }
}
