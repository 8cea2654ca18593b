//! Stored WiFi credentials.
//!
//! Persisted as a small JSON document (`{"ssid": "...", "password": "..."}`).
//! Their presence decides the boot mode, see [`crate::mode::BootMode`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::event_log::StorageError;

/// Longest SSID accepted by the WiFi driver.
pub const MAX_SSID_LEN: usize = 32;

/// Longest WPA2 passphrase accepted by the WiFi driver.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Credentials of the network to join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    /// WiFi network SSID.
    pub ssid: String,

    /// WiFi network password (empty for open networks).
    #[serde(default)]
    pub password: String,
}

impl WifiCredentials {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }

    /// Decode an `application/x-www-form-urlencoded` body with `ssid` and `password`.
    pub fn from_form(body: &[u8]) -> Result<Self, serde_urlencoded::de::Error> {
        serde_urlencoded::from_bytes(body)
    }

    /// Check the credentials can be handed to the WiFi driver.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.ssid.trim().is_empty() {
            return Err("SSID cannot be empty");
        }
        if self.ssid.len() > MAX_SSID_LEN {
            return Err("SSID too long (max 32 bytes)");
        }
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err("Password too long (max 64 bytes)");
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Abstract credential storage.
///
/// All methods are synchronous to support embedded platforms.
pub trait CredentialStore: Send + Sync {
    /// Stored credentials, or `None` when absent, unreadable or invalid.
    fn load(&self) -> Option<WifiCredentials>;

    /// Replace the stored credentials.
    fn save(&self, credentials: &WifiCredentials) -> Result<(), StorageError>;

    /// Forget the stored credentials. Clearing an empty store succeeds.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Credentials kept in a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<WifiCredentials> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to open {} for reading: {}", self.path.display(), e);
                return None;
            }
        };

        let credentials: WifiCredentials = match serde_json::from_str(&json) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!("Invalid credentials in {}: {}", self.path.display(), e);
                return None;
            }
        };

        match credentials.validate() {
            Ok(()) => Some(credentials),
            Err(reason) => {
                warn!("Ignoring stored credentials: {}", reason);
                None
            }
        }
    }

    fn save(&self, credentials: &WifiCredentials) -> Result<(), StorageError> {
        let json = serde_json::to_string(credentials)?;
        std::fs::write(&self.path, json).map_err(|e| StorageError::io(&self.path, e))?;
        info!("Stored credentials for '{}'", credentials.ssid);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Cleared stored credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }
}

/// Credentials held in memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<Option<WifiCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credentials: WifiCredentials) -> Self {
        Self {
            credentials: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<WifiCredentials> {
        self.credentials
            .lock()
            .ok()
            .and_then(|stored| stored.as_ref().cloned())
            .filter(WifiCredentials::is_valid)
    }

    fn save(&self, credentials: &WifiCredentials) -> Result<(), StorageError> {
        if let Ok(mut stored) = self.credentials.lock() {
            *stored = Some(credentials.clone());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        if let Ok(mut stored) = self.credentials.lock() {
            *stored = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_store() -> FileCredentialStore {
        let dir = std::env::temp_dir().join(format!("presslog-core-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        FileCredentialStore::new(dir.join("wifiConfig.txt"))
    }

    #[test]
    fn test_file_store_round_trip() {
        let store = temp_store();
        assert_eq!(store.load(), None);

        let credentials = WifiCredentials::new("HomeNet", "hunter22");
        store.save(&credentials).unwrap();
        assert_eq!(store.load(), Some(credentials));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"{"ssid":"HomeNet","password":"hunter22"}"#);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = temp_store();
        store.save(&WifiCredentials::new("HomeNet", "")).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_garbage_file_loads_as_none() {
        let store = temp_store();
        std::fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.load(), None);

        std::fs::write(store.path(), r#"{"ssid":"  ","password":"x"}"#).unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_validation() {
        assert!(WifiCredentials::new("net", "").is_valid());
        assert!(!WifiCredentials::new("", "secret").is_valid());
        assert!(!WifiCredentials::new("x".repeat(33), "").is_valid());
        assert!(!WifiCredentials::new("net", "p".repeat(65)).is_valid());
    }

    #[test]
    fn test_from_form_decodes_percent_escapes() {
        let credentials = WifiCredentials::from_form(b"ssid=My+Net%21&password=a%26b").unwrap();
        assert_eq!(credentials, WifiCredentials::new("My Net!", "a&b"));

        let open = WifiCredentials::from_form(b"ssid=Cafe").unwrap();
        assert_eq!(open.password, "");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::with(WifiCredentials::new("net", "pw"));
        assert!(store.load().is_some());
        store.clear().unwrap();
        assert!(store.load().is_none());
    }
}
