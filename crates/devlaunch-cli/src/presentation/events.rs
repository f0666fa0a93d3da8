//! Event log rendering.

use chrono::Local;
use devlaunch_core::{LogEvent, LogLevel};
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// `[HH:MM:SS] <marker> text`, timestamp in local time.
pub fn render_event(event: &LogEvent) -> String {
    let time = event.timestamp.with_timezone(&Local).format("%H:%M:%S");
    let marker = match event.level {
        LogLevel::Info => " ",
        LogLevel::Success => "+",
        LogLevel::Warning => "!",
        LogLevel::Error => "x",
    };
    format!("[{time}] {marker} {}", event.text)
}

/// Prints events to stdout on a background task.
pub struct EventPrinter {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl EventPrinter {
    /// Start printing everything received on `events`.
    pub fn spawn(mut events: Receiver<LogEvent>) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = events.recv() => match received {
                        Ok(event) => println!("{}", render_event(&event)),
                        Err(RecvError::Lagged(skipped)) => {
                            println!("... {skipped} log lines skipped");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    () = token.cancelled() => {
                        // Drain what was already sent.
                        loop {
                            match events.try_recv() {
                                Ok(event) => println!("{}", render_event(&event)),
                                Err(TryRecvError::Lagged(_)) => {}
                                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                            }
                        }
                        break;
                    }
                }
            }
        });

        Self { cancel_token, task }
    }

    /// Print whatever is pending, then stop.
    pub async fn finish(self) {
        self.cancel_token.cancel();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlaunch_core::Role;

    #[test]
    fn test_render_event() {
        let rendered = render_event(&LogEvent::port_detected(Role::Frontend, 5173));
        assert!(rendered.starts_with('['));
        assert_eq!(&rendered[9..], "] + Detected frontend port: 5173");
    }

    #[test]
    fn test_render_line_keeps_source_prefix() {
        let rendered = render_event(&LogEvent::line_logged(Role::Backend, "listening"));
        assert!(rendered.ends_with("   [Backend] listening"));
    }
}
