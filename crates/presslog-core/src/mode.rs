//! Boot mode selection.

use crate::credentials::{CredentialStore, WifiCredentials};

/// What the device does after boot. Chosen once, from stored credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootMode {
    /// No usable credentials: host an access point and wait for some.
    Provisioning,
    /// Join the stored network and log presses.
    Operational(WifiCredentials),
}

impl BootMode {
    pub fn select<S: CredentialStore + ?Sized>(store: &S) -> Self {
        match store.load() {
            Some(credentials) => BootMode::Operational(credentials),
            None => BootMode::Provisioning,
        }
    }

    pub fn is_operational(&self) -> bool {
        matches!(self, BootMode::Operational(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            BootMode::Provisioning => "provisioning",
            BootMode::Operational(_) => "operational",
        }
    }
}
