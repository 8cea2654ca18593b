//! # presslog-core
//!
//! Core of the button press logger.
//!
//! This crate provides:
//! - Debounced falling-edge detection that is safe to call from an interrupt
//! - The bounded press event queue and the JSON line record format
//! - Append-only event log storage (file and in-memory)
//! - WiFi credential storage and boot mode selection
//! - The `PressLogger` context object that produces, persists and broadcasts presses
//! - Administrative service actions
//!
//! This crate is intentionally runtime-agnostic: its few async helpers take the
//! caller's sleep, making it usable on both Linux (tokio) and ESP32 (esp-idf)
//! targets.

pub mod clock;
pub mod config;
pub mod credentials;
pub mod debounce;
pub mod event;
pub mod event_log;
pub mod logger;
pub mod mode;
pub mod page;
pub mod queue;
pub mod service;
pub mod sink;

pub use clock::{format_timestamp, FixedClock, SystemClock, WallClock};
pub use config::{DeviceConfig, RetryPolicy};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore, WifiCredentials};
pub use debounce::{EdgeDebouncer, DEBOUNCE_WINDOW_MS};
pub use event::PressEvent;
pub use event_log::{EventLog, FileEventLog, MemoryEventLog, StorageError};
pub use logger::{broadcast_records, Button, PressError, PressLogger};
pub use mode::BootMode;
pub use queue::EventQueue;
pub use service::{ServiceAction, ServiceError, ServiceOutcome};
pub use sink::BroadcastSink;
