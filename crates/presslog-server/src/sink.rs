//! Live channel sink backed by a tokio broadcast channel.

use presslog_core::BroadcastSink;
use tokio::sync::broadcast;
use tracing::trace;

/// Fans payloads out to every subscribed live viewer.
///
/// Sending never blocks: with no viewers the payload is simply dropped, and a
/// slow viewer lags instead of holding back the press loop.
#[derive(Debug, Clone)]
pub struct LiveSink {
    tx: broadcast::Sender<String>,
}

impl LiveSink {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl BroadcastSink for LiveSink {
    fn broadcast(&mut self, payload: &str) {
        if self.tx.send(payload.to_string()).is_err() {
            trace!("No live viewers connected");
        }
    }

    fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_without_viewers_is_dropped() {
        let (tx, _) = broadcast::channel(4);
        let mut sink = LiveSink::new(tx);
        sink.broadcast("{}");
        assert_eq!(sink.viewer_count(), 0);
    }

    #[test]
    fn test_every_viewer_receives() {
        let (tx, mut a) = broadcast::channel(4);
        let mut b = tx.subscribe();
        let mut sink = LiveSink::new(tx);
        sink.broadcast("one");

        assert_eq!(sink.viewer_count(), 2);
        assert_eq!(a.try_recv().unwrap(), "one");
        assert_eq!(b.try_recv().unwrap(), "one");
    }
}
