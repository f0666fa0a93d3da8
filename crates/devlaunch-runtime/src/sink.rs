//! Event sink implementations.
//!
//! The supervisor only produces [`LogEvent`]s; these adapters deliver them to
//! whoever renders them.

use devlaunch_core::{EventSink, LogEvent, LogLevel};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Broadcast channel capacity for log events.
const CHANNEL_CAPACITY: usize = 256;

/// Fans events out to any number of subscribers over a tokio broadcast channel.
///
/// Events emitted while nobody is subscribed go to [`TracingEventSink`]. A subscriber
/// that falls more than the channel capacity behind loses the oldest events.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<LogEvent>,
}

impl BroadcastEventSink {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.sender.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: LogEvent) {
        if self.sender.receiver_count() == 0 {
            TracingEventSink.emit(event);
            return;
        }
        let _ = self.sender.send(event);
    }
}

/// Forwards events into `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub const fn new() -> Self {
        Self
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: LogEvent) {
        let source = event.source.as_str();
        match event.level {
            LogLevel::Info | LogLevel::Success => info!(source = %source, "{}", event.text),
            LogLevel::Warning => warn!(source = %source, "{}", event.text),
            LogLevel::Error => error!(source = %source, "{}", event.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlaunch_core::Role;

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let sink = BroadcastEventSink::new();
        let mut first = sink.subscribe();
        let mut second = sink.subscribe();
        assert_eq!(sink.subscriber_count(), 2);

        sink.emit(LogEvent::port_detected(Role::Frontend, 5173));

        assert_eq!(first.recv().await.unwrap().text, "Detected frontend port: 5173");
        assert_eq!(second.recv().await.unwrap().text, "Detected frontend port: 5173");
    }

    #[test]
    fn test_emit_without_subscribers_falls_back_to_tracing() {
        let sink = BroadcastEventSink::new();
        sink.emit(LogEvent::message(LogLevel::Info, "nobody listening"));
        sink.emit(LogEvent::message(LogLevel::Error, "still nobody"));
        assert_eq!(sink.subscriber_count(), 0);
    }

    #[test]
    fn test_tracing_sink_accepts_every_level() {
        let sink = TracingEventSink::new();
        for level in [LogLevel::Info, LogLevel::Success, LogLevel::Warning, LogLevel::Error] {
            sink.emit(LogEvent::message(level, "level check"));
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let sink = BroadcastEventSink::new();
        let mut early = sink.subscribe();
        sink.emit(LogEvent::message(LogLevel::Info, "first"));
        let mut late = sink.subscribe();
        sink.emit(LogEvent::message(LogLevel::Info, "second"));

        assert_eq!(early.recv().await.unwrap().text, "first");
        assert_eq!(late.recv().await.unwrap().text, "second");
    }
}
