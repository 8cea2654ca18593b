//! Bounded FIFO of produced press events awaiting persistence.

use std::collections::VecDeque;

use crate::event::PressEvent;

/// Default number of events the queue holds before rejecting new ones.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Bounded single-producer / single-consumer event queue.
///
/// Both ends are driven from the main loop, so no locking is involved.
#[derive(Debug, Clone)]
pub struct EventQueue {
    events: VecDeque<PressEvent>,
    capacity: usize,
}

impl EventQueue {
    /// Create an empty queue. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event at the back. When full, the event is handed back.
    pub fn push(&mut self, event: PressEvent) -> Result<(), PressEvent> {
        if self.is_full() {
            return Err(event);
        }
        self.events.push_back(event);
        Ok(())
    }

    /// Remove the oldest event.
    pub fn pop(&mut self) -> Option<PressEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every queued event.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = EventQueue::new(4);
        for n in 1..=3 {
            queue.push(PressEvent::new("t", n)).unwrap();
        }
        let drained: Vec<u64> = std::iter::from_fn(|| queue.pop()).map(|e| e.count()).collect();
        assert_eq!(drained, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_hands_event_back() {
        let mut queue = EventQueue::new(2);
        queue.push(PressEvent::new("t", 1)).unwrap();
        queue.push(PressEvent::new("t", 2)).unwrap();
        assert!(queue.is_full());

        let rejected = queue.push(PressEvent::new("t", 3)).unwrap_err();
        assert_eq!(rejected.count(), 3);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut queue = EventQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        assert!(queue.push(PressEvent::new("t", 1)).is_ok());
        assert!(queue.push(PressEvent::new("t", 2)).is_err());
    }
}
