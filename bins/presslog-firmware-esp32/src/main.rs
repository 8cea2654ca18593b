//! Button press logger firmware for ESP32
//!
//! This binary requires the ESP32 Rust toolchain.
//! It will not compile with the standard Rust toolchain.
//!
//! Boot selects a mode once from the stored credentials:
//! - Provisioning: host an open AP and serve the page until credentials arrive
//! - Operational: join the network, sync time, then log presses forever
//!
//! Any fatal error restarts the device.

use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::Context;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop, hal::prelude::Peripherals, log::EspLogger,
    nvs::EspDefaultNvsPartition,
};
use log::{error, info, warn};
use presslog_core::clock::wait_for_sync;
use presslog_core::{
    broadcast_records, BootMode, DeviceConfig, EdgeDebouncer, FileCredentialStore, FileEventLog,
    PressLogger, SystemClock, WifiCredentials,
};
use presslog_esp32::button::PressButton;
use presslog_esp32::http::{self, HttpContext, LiveViewers, SharedLogger};
use presslog_esp32::{storage, time, wifi};

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    info!("Button press logger starting...");

    let config = DeviceConfig::default();
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    storage::mount_spiffs(&config.data_dir).context("Failed to mount SPIFFS")?;

    let credentials = Arc::new(FileCredentialStore::new(config.credentials_path()));
    let mode = BootMode::select(credentials.as_ref());
    info!("Booting in {} mode", mode.name());

    let clock = SystemClock::new(config.local_offset_secs())?;
    let logger: SharedLogger = Arc::new(Mutex::new(PressLogger::new(
        config.button_pin,
        FileEventLog::new(config.event_log_path()),
        clock,
        config.queue_capacity,
    )));
    let viewers = LiveViewers::default();
    let ctx = HttpContext {
        logger: logger.clone(),
        credentials,
        viewers: viewers.clone(),
        live_path: config.live_path.clone(),
    };

    let mut wifi = wifi::new_wifi(peripherals.modem, sysloop, nvs)?;

    match mode {
        BootMode::Provisioning => {
            wifi::start_access_point(&mut wifi, &config.provisioning_ssid)?;
            let _server = http::start_http_server(ctx)?;
            warn!("Provisioning: waiting for credentials on POST /wifiConfig");
            loop {
                thread::sleep(config.poll_interval() * 100);
            }
        }
        BootMode::Operational(network) => {
            run_operational(&config, &network, &mut wifi, clock, ctx, logger, viewers)
        }
    }
}

fn run_operational(
    config: &DeviceConfig,
    network: &WifiCredentials,
    wifi: &mut wifi::Wifi,
    clock: SystemClock,
    ctx: HttpContext,
    logger: SharedLogger,
    mut viewers: LiveViewers,
) -> anyhow::Result<()> {
    if let Err(e) = wifi::connect(wifi, network, &config.wifi_connect) {
        error!("{}", e);
        http::restart();
    }

    let _sntp = time::start_sntp(&config.ntp_server).context("Failed to start SNTP")?;
    if let Err(e) = wait_for_sync(&clock, &config.time_sync, thread::sleep) {
        error!("{}", e);
        http::restart();
    }

    let _server = http::start_http_server(ctx)?;

    // The ISR needs a 'static debouncer; there is exactly one per boot.
    let debouncer: &'static EdgeDebouncer =
        Box::leak(Box::new(EdgeDebouncer::new(config.debounce_ms)));
    let mut button = PressButton::new(config.button_pin, debouncer)?;

    info!("Logging presses on GPIO{}", config.button_pin);
    loop {
        button.rearm()?;
        // Sending to viewers waits on the httpd task, which may itself be
        // waiting for the logger. Release the lock before broadcasting.
        let records = match logger.lock() {
            Ok(mut logger) => logger.poll_persist(debouncer),
            Err(_) => {
                error!("Logger lock poisoned");
                http::restart();
            }
        };
        broadcast_records(&records, &mut viewers);
        thread::sleep(config.poll_interval());
    }
}
