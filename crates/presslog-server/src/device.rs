//! Boot cycle of the host build.
//!
//! One call to [`run_device`] is one boot: select the mode from stored
//! credentials, wait for the clock in operational mode, then serve until a
//! restart is requested. The caller loops to "restart".

use std::io;
use std::sync::Arc;

use presslog_core::clock::{wait_for_sync_async, ClockError};
use presslog_core::{
    BootMode, CredentialStore, DeviceConfig, EdgeDebouncer, EventLog, FileCredentialStore,
    FileEventLog, PressLogger, SystemClock, WallClock,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::control::run_press_loop;
use crate::routes::create_router;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Clock(#[from] ClockError),
}

/// How a boot ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceExit {
    /// A restart was requested or the boot could not complete.
    Restart,
}

/// Run one boot of the device.
pub async fn run_device(
    config: DeviceConfig,
    debouncer: Arc<EdgeDebouncer>,
) -> Result<DeviceExit, BootError> {
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let credentials: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(config.credentials_path()));
    let mode = BootMode::select(credentials.as_ref());
    info!("Booting in {} mode", mode.name());

    let clock = SystemClock::new(config.local_offset_secs())?;
    if let BootMode::Operational(network) = &mode {
        // The host's own network stack is already up.
        info!("Configured network '{}'", network.ssid);
        if let Err(e) = wait_for_sync_async(&clock, &config.time_sync, tokio::time::sleep).await {
            error!("{}, restarting", e);
            return Ok(DeviceExit::Restart);
        }
    }

    let log: Box<dyn EventLog> = Box::new(FileEventLog::new(config.event_log_path()));
    let clock: Box<dyn WallClock> = Box::new(clock);
    let logger = PressLogger::new(config.button_pin, log, clock, config.queue_capacity);

    let listener = TcpListener::bind(("0.0.0.0", config.http_port)).await?;
    let state = AppState::new(config, mode, logger, credentials);
    serve(listener, state, debouncer).await
}

/// Serve HTTP and run the press loop (operational mode only) until a restart is requested.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    debouncer: Arc<EdgeDebouncer>,
) -> Result<DeviceExit, BootError> {
    info!("HTTP server listening on {}", listener.local_addr()?);

    // A fresh boot starts with no pending press.
    if debouncer.take_pending() {
        debug!("Discarded a press pending from the previous boot");
    }

    let press_loop = if state.mode.is_operational() {
        Some(tokio::spawn(run_press_loop(state.clone(), debouncer)))
    } else {
        warn!("Provisioning: waiting for credentials on POST /wifiConfig");
        None
    };

    let restart = state.restart.clone();
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { restart.wait().await })
        .await?;

    if let Some(handle) = press_loop {
        handle.abort();
    }
    info!("Restarting...");
    Ok(DeviceExit::Restart)
}
