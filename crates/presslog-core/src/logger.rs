//! The press logger context.
//!
//! [`PressLogger`] owns everything the main loop touches: the button counter,
//! the event queue, the event log and the clock. One instance exists per boot
//! and is handed explicitly to the loop and to the HTTP handlers.
//!
//! Each loop iteration runs two steps:
//!
//! 1. **Produce**: if the debouncer has a pending press, read the wall clock,
//!    bump the counter and queue a [`PressEvent`].
//! 2. **Drain**: pop queued events oldest first, append each to the log and
//!    broadcast it to live viewers.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::clock::{format_timestamp, WallClock};
use crate::debounce::EdgeDebouncer;
use crate::event::PressEvent;
use crate::event_log::{EventLog, StorageError};
use crate::queue::EventQueue;
use crate::sink::BroadcastSink;

/// Why a pending press did not become an event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PressError {
    #[error("Wall clock not synchronized")]
    ClockNotSynchronized,

    #[error("Event queue full ({capacity} events)")]
    QueueFull { capacity: usize },
}

/// The physical button and its press counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pin: u8,
    presses: u64,
}

impl Button {
    pub fn new(pin: u8, presses: u64) -> Self {
        Self { pin, presses }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn presses(&self) -> u64 {
        self.presses
    }
}

/// Process-scoped context of the press logger.
pub struct PressLogger<L, C> {
    button: Button,
    queue: EventQueue,
    log: L,
    clock: C,
}

impl<L: EventLog, C: WallClock> PressLogger<L, C> {
    /// Create the context, recovering the counter from the last log record.
    pub fn new(pin: u8, log: L, clock: C, queue_capacity: usize) -> Self {
        let presses = log.restore_count();
        info!("Button on GPIO{} restored at {} presses", pin, presses);
        Self {
            button: Button::new(pin, presses),
            queue: EventQueue::new(queue_capacity),
            log,
            clock,
        }
    }

    pub fn button(&self) -> &Button {
        &self.button
    }

    /// Current press counter.
    pub fn presses(&self) -> u64 {
        self.button.presses
    }

    /// Number of events produced but not yet persisted.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Produce a press event stamped with the current wall-clock time.
    ///
    /// The counter only moves when the event is queued, so it always matches
    /// the number of events handed to the log.
    pub fn register_press(&mut self) -> Result<PressEvent, PressError> {
        let now = self.clock.now().ok_or(PressError::ClockNotSynchronized)?;
        let count = self.button.presses + 1;
        let event = PressEvent::new(format_timestamp(&now), count);
        self.queue
            .push(event.clone())
            .map_err(|_| PressError::QueueFull {
                capacity: self.queue.capacity(),
            })?;
        self.button.presses = count;
        debug!("Button pressed ({})", count);
        Ok(event)
    }

    /// Persist every queued event, oldest first, and return the records.
    ///
    /// The records are meant for [`broadcast_records`], which callers whose
    /// sink may block run after releasing any lock around the logger. A failed
    /// append is logged and the record is still returned for broadcast.
    pub fn persist_queued(&mut self) -> Vec<String> {
        let mut records = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop() {
            let record = match event.to_json() {
                Ok(record) => record,
                Err(e) => {
                    error!("Failed to encode press {}: {}", event.count(), e);
                    continue;
                }
            };

            if let Err(e) = self.log.append(&record) {
                error!("Failed to persist press {}: {}", event.count(), e);
            }
            debug!("Press {} logged at {}", event.count(), event.timestamp());
            records.push(record);
        }
        records
    }

    /// Persist and broadcast every queued event, oldest first.
    ///
    /// Returns the number of records drained.
    pub fn drain<S: BroadcastSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let records = self.persist_queued();
        broadcast_records(&records, sink);
        records.len()
    }

    /// Loop step without the broadcast: take a pending press, then persist
    /// the queue. Returns the records to broadcast.
    pub fn poll_persist(&mut self, debouncer: &EdgeDebouncer) -> Vec<String> {
        if debouncer.take_pending() {
            if let Err(e) = self.register_press() {
                warn!("Dropped button press: {}", e);
            }
        }
        self.persist_queued()
    }

    /// One main loop iteration: take a pending press, then drain the queue.
    pub fn poll<S: BroadcastSink + ?Sized>(
        &mut self,
        debouncer: &EdgeDebouncer,
        sink: &mut S,
    ) -> usize {
        let records = self.poll_persist(debouncer);
        broadcast_records(&records, sink);
        records.len()
    }

    /// Persisted records in file order, for replay to a new viewer.
    pub fn history(&self) -> Vec<String> {
        self.log.lines()
    }

    /// Empty the log, drop queued events and zero the counter.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.queue.clear();
        self.log.truncate()?;
        self.button.presses = 0;
        info!("Event log reset");
        Ok(())
    }

    /// Give back the log, e.g. to reopen it after a simulated restart.
    pub fn into_log(self) -> L {
        self.log
    }
}

/// Send persisted records to live viewers, in order.
pub fn broadcast_records<S: BroadcastSink + ?Sized>(records: &[String], sink: &mut S) {
    for record in records {
        sink.broadcast(record);
    }
    if !records.is_empty() {
        debug!("Broadcast {} records to {} viewers", records.len(), sink.viewer_count());
    }
}
