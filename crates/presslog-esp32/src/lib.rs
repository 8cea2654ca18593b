//! ESP32-specific components for the button press logger.
//!
//! This crate provides the device side of the logger:
//! - WiFi station connection and the provisioning access point
//! - SPIFFS mount for the event log and credentials
//! - SNTP time synchronization
//! - The button GPIO interrupt feeding the debouncer
//! - HTTP/WebSocket handlers on `EspHttpServer`
//!
//! # Example
//!
//! ```ignore
//! use presslog_esp32::{storage, wifi};
//!
//! storage::mount_spiffs(&config.data_dir)?;
//! let mut wifi = wifi::new_wifi(peripherals.modem, sysloop, nvs)?;
//! wifi::connect(&mut wifi, &credentials, &config.wifi_connect)?;
//! ```

pub mod button;
pub mod http;
pub mod storage;
pub mod time;
pub mod wifi;
