//! Connection lifecycle notifications.
//!
//! The manager calls [`EventSink::emit`] synchronously while it is already
//! outside the registry lock. Sinks must not block: delivery is
//! fire-and-forget and nobody waits for an acknowledgment.

use crate::models::ConnectionEvent;

use tokio::sync::mpsc;

/// Receiver of connection lifecycle events.
pub trait EventSink: Send + Sync {
    /// Deliver an event. Must return promptly.
    fn emit(&self, event: &ConnectionEvent);
}

/// Sink that only records events in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: &ConnectionEvent) {
        tracing::info!(event = event.name(), server_id = event.server_id(), "Connection event");
    }
}

/// Sink forwarding events over an unbounded channel, typically to the UI bridge.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: &ConnectionEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::trace!(event = event.name(), "Event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelEventSink::new();
        sink.emit(&ConnectionEvent::Connected("a".into()));
        sink.emit(&ConnectionEvent::Disconnected("a".into()));

        assert_eq!(rx.try_recv().unwrap(), ConnectionEvent::Connected("a".into()));
        assert_eq!(rx.try_recv().unwrap(), ConnectionEvent::Disconnected("a".into()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (sink, rx) = ChannelEventSink::new();
        drop(rx);
        sink.emit(&ConnectionEvent::Connected("a".into()));
    }
}
