//! Shared state handed to the press loop and every route handler.

use std::sync::Arc;

use presslog_core::{BootMode, CredentialStore, DeviceConfig, EventLog, PressLogger, WallClock};
use tokio::sync::{broadcast, watch, Mutex};

use crate::sink::LiveSink;

/// Buffered live events per viewer before it starts lagging.
pub const LIVE_CHANNEL_CAPACITY: usize = 64;

/// The logger as used on the host: storage and clock chosen at boot.
pub type DeviceLogger = PressLogger<Box<dyn EventLog>, Box<dyn WallClock>>;

/// Context of one boot. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DeviceConfig>,
    pub mode: Arc<BootMode>,
    pub logger: Arc<Mutex<DeviceLogger>>,
    pub credentials: Arc<dyn CredentialStore>,
    /// Live event fan-out. Every viewer holds a receiver.
    pub live: broadcast::Sender<String>,
    pub restart: RestartSignal,
}

impl AppState {
    pub fn new(
        config: DeviceConfig,
        mode: BootMode,
        logger: DeviceLogger,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let (live, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(config),
            mode: Arc::new(mode),
            logger: Arc::new(Mutex::new(logger)),
            credentials,
            live,
            restart: RestartSignal::new(),
        }
    }

    /// Broadcast sink feeding the live channel.
    pub fn sink(&self) -> LiveSink {
        LiveSink::new(self.live.clone())
    }
}

/// One-shot "restart the device" request.
///
/// Once requested it stays requested for the rest of the boot.
#[derive(Debug, Clone)]
pub struct RestartSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl RestartSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn request(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once a restart has been requested.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

impl Default for RestartSignal {
    fn default() -> Self {
        Self::new()
    }
}
