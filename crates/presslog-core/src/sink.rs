//! Live viewer fan-out.

/// Pushes event payloads to every connected live viewer.
///
/// Delivery is best-effort: implementations drop the payload for a viewer
/// that fails instead of blocking or retrying.
pub trait BroadcastSink {
    /// Send `payload` (one JSON record) to all current viewers.
    fn broadcast(&mut self, payload: &str);

    /// Number of viewers currently connected.
    fn viewer_count(&self) -> usize;
}

/// Sink with no viewers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoViewers;

impl BroadcastSink for NoViewers {
    fn broadcast(&mut self, _payload: &str) {}

    fn viewer_count(&self) -> usize {
        0
    }
}
