//! # presslog-server
//!
//! Host (tokio + axum) runtime for the button press logger.
//!
//! This crate provides:
//! - The HTTP surface: configuration page, `/serviceMode`, `/wifiConfig`
//! - The live channel websocket (replay of the log, then live events)
//! - The press loop that drives [`presslog_core::PressLogger`]
//! - The boot / restart cycle, see [`run_device`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use presslog_server::{run_device, DeviceExit};
//!
//! let debouncer = Arc::new(EdgeDebouncer::default());
//! loop {
//!     match run_device(config.clone(), debouncer.clone()).await? {
//!         DeviceExit::Restart => continue,
//!     }
//! }
//! ```

pub mod control;
pub mod device;
pub mod routes;
pub mod sink;
pub mod state;

pub use device::{run_device, serve, BootError, DeviceExit};
pub use routes::create_router;
pub use sink::LiveSink;
pub use state::{AppState, DeviceLogger, RestartSignal};
