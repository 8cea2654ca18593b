//! Debounced falling-edge detection.
//!
//! [`EdgeDebouncer::on_falling_edge`] is meant to be called straight from a
//! GPIO interrupt. It touches only atomics: no allocation, no locks, no I/O.
//! The main loop observes accepted presses through [`EdgeDebouncer::take_pending`].

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Minimum time between two accepted edges, in milliseconds.
pub const DEBOUNCE_WINDOW_MS: u32 = 250;

/// Interrupt-to-loop handoff for a single push button.
///
/// Timestamps are milliseconds from any monotonic source (e.g. time since
/// boot). Arithmetic wraps, so a `u32` millisecond counter rolling over after
/// ~49 days is handled.
#[derive(Debug)]
pub struct EdgeDebouncer {
    window_ms: u32,
    /// Time of the most recent edge, accepted or not.
    last_edge_ms: AtomicU32,
    /// Time of the most recent accepted edge.
    last_accepted_ms: AtomicU32,
    /// False until the first edge has been accepted.
    armed: AtomicBool,
    /// Set by the interrupt, cleared by the main loop.
    pending: AtomicBool,
}

impl EdgeDebouncer {
    /// Create a debouncer with the given window.
    ///
    /// `const` so it can live in a `static` that an interrupt handler reaches.
    pub const fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            last_edge_ms: AtomicU32::new(0),
            last_accepted_ms: AtomicU32::new(0),
            armed: AtomicBool::new(false),
            pending: AtomicBool::new(false),
        }
    }

    /// Record a falling edge observed at `now_ms`.
    ///
    /// Returns `true` when the edge is accepted as a press: it is the first
    /// edge ever seen, or at least `window_ms` has passed since the last
    /// accepted edge. Rejected edges do not move the window.
    pub fn on_falling_edge(&self, now_ms: u32) -> bool {
        self.last_edge_ms.store(now_ms, Ordering::Relaxed);

        if self.armed.load(Ordering::Acquire) {
            let last = self.last_accepted_ms.load(Ordering::Relaxed);
            if now_ms.wrapping_sub(last) < self.window_ms {
                return false;
            }
        }

        self.last_accepted_ms.store(now_ms, Ordering::Relaxed);
        self.armed.store(true, Ordering::Release);
        self.pending.store(true, Ordering::Release);
        true
    }

    /// Consume the pending-press flag. Returns whether a press was pending.
    ///
    /// Presses accepted while the flag is already set coalesce into one.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Whether a press is waiting for the main loop.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Time of the most recent edge, accepted or not.
    pub fn last_edge_ms(&self) -> u32 {
        self.last_edge_ms.load(Ordering::Relaxed)
    }

    /// Time of the most recent accepted edge, if any.
    pub fn last_accepted_ms(&self) -> Option<u32> {
        if self.armed.load(Ordering::Acquire) {
            Some(self.last_accepted_ms.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    /// The debounce window in milliseconds.
    pub fn window_ms(&self) -> u32 {
        self.window_ms
    }
}

impl Default for EdgeDebouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed edges at the given times and return which were accepted.
    fn accepted(times: &[u32]) -> Vec<u32> {
        let debouncer = EdgeDebouncer::default();
        times
            .iter()
            .copied()
            .filter(|&t| debouncer.on_falling_edge(t))
            .collect()
    }

    #[test]
    fn test_first_edge_is_accepted_at_time_zero() {
        let debouncer = EdgeDebouncer::default();
        assert_eq!(debouncer.last_accepted_ms(), None);
        assert!(debouncer.on_falling_edge(0));
        assert_eq!(debouncer.last_accepted_ms(), Some(0));
    }

    #[test]
    fn test_bounce_inside_window_is_ignored() {
        assert_eq!(accepted(&[0, 100, 400]), vec![0, 400]);
    }

    #[test]
    fn test_edge_exactly_at_window_is_accepted() {
        assert_eq!(accepted(&[1000, 1250, 1499, 1500]), vec![1000, 1250, 1500]);
    }

    #[test]
    fn test_rejected_edges_do_not_extend_window() {
        // A stream of bounces every 100 ms: only edges 250 ms after the last
        // *accepted* one get through.
        let times: Vec<u32> = (0..10).map(|i| i * 100).collect();
        assert_eq!(accepted(&times), vec![0, 300, 600, 900]);
    }

    #[test]
    fn test_wrapping_millis() {
        let start = u32::MAX - 100;
        assert_eq!(
            accepted(&[start, start.wrapping_add(50), start.wrapping_add(300)]),
            vec![start, start.wrapping_add(300)]
        );
    }

    #[test]
    fn test_pending_flag_handoff() {
        let debouncer = EdgeDebouncer::default();
        assert!(!debouncer.take_pending());

        debouncer.on_falling_edge(10);
        assert!(debouncer.is_pending());
        assert!(debouncer.take_pending());
        assert!(!debouncer.take_pending());

        // Rejected edge does not raise the flag but is still recorded.
        debouncer.on_falling_edge(20);
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.last_edge_ms(), 20);
    }

    #[test]
    fn test_presses_coalesce_until_taken() {
        let debouncer = EdgeDebouncer::default();
        debouncer.on_falling_edge(0);
        debouncer.on_falling_edge(500);
        assert!(debouncer.take_pending());
        assert!(!debouncer.take_pending());
    }

    #[test]
    fn test_usable_from_static() {
        static DEBOUNCER: EdgeDebouncer = EdgeDebouncer::new(DEBOUNCE_WINDOW_MS);
        assert_eq!(DEBOUNCER.window_ms(), 250);
    }
}
