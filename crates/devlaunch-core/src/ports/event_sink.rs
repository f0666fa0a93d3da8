//! Event sink trait for supervisor output.
//!
//! The core only produces [`LogEvent`]s; rendering, buffering and colouring are the
//! sink's business.

use crate::events::LogEvent;

/// Receives every event the supervisor produces.
///
/// Implementations must be thread-safe and must not block: events are emitted
/// from monitor workers while they hold no locks, but a slow sink still delays
/// the next line of child output.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: LogEvent);
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl NoopEventSink {
    /// Create a new no-op sink.
    pub const fn new() -> Self {
        Self
    }
}

impl EventSink for NoopEventSink {
    fn emit(&self, _event: LogEvent) {
        // Intentionally do nothing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LogLevel;
    use std::sync::Arc;

    #[test]
    fn test_noop_sink_accepts_events() {
        let sink: Arc<dyn EventSink> = Arc::new(NoopEventSink::new());
        sink.emit(LogEvent::message(LogLevel::Info, "hello"));
    }
}
