//! Administrative actions.
//!
//! Backs the `POST /serviceMode` and `POST /wifiConfig` endpoints on every
//! target. Framework-specific code (Axum, esp-idf-http) only decodes the form,
//! calls in here and maps the result to a status code.

use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::clock::WallClock;
use crate::credentials::{CredentialStore, WifiCredentials};
use crate::event_log::{EventLog, StorageError};
use crate::logger::PressLogger;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid form: {0}")]
    InvalidForm(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(&'static str),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::UnknownAction(_)
            | ServiceError::InvalidForm(_)
            | ServiceError::InvalidCredentials(_) => 400,
            ServiceError::Storage(_) => 500,
        }
    }
}

/// Value of the `action` form field of `/serviceMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    /// Truncate the event log and zero the counter.
    Reset,
    /// Forget the stored WiFi credentials and restart into provisioning.
    ResetWifi,
}

impl FromStr for ServiceAction {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reset" => Ok(ServiceAction::Reset),
            "resetWiFi" => Ok(ServiceAction::ResetWifi),
            other => Err(ServiceError::UnknownAction(other.to_string())),
        }
    }
}

/// The `/serviceMode` form.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceForm {
    #[serde(default)]
    pub action: String,
}

impl ServiceForm {
    pub fn action(&self) -> Result<ServiceAction, ServiceError> {
        self.action.parse()
    }

    /// Decode an `application/x-www-form-urlencoded` body.
    pub fn from_body(body: &[u8]) -> Result<Self, ServiceError> {
        serde_urlencoded::from_bytes(body).map_err(|e| ServiceError::InvalidForm(e.to_string()))
    }
}

/// What the caller must do after answering the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    /// Nothing further.
    Completed,
    /// Restart the device once the response is sent.
    Restart,
}

impl ServiceOutcome {
    /// Response body sent with 200.
    pub fn message(&self) -> &'static str {
        match self {
            ServiceOutcome::Completed => "OK",
            ServiceOutcome::Restart => "OK, restarting",
        }
    }
}

/// Truncate the event log and zero the counter.
pub fn reset_event_log<L: EventLog, C: WallClock>(
    logger: &mut PressLogger<L, C>,
) -> Result<ServiceOutcome, ServiceError> {
    logger.reset()?;
    Ok(ServiceOutcome::Completed)
}

/// Clear stored credentials so the next boot enters provisioning.
pub fn reset_wifi<S: CredentialStore + ?Sized>(store: &S) -> Result<ServiceOutcome, ServiceError> {
    store.clear()?;
    info!("WiFi credentials reset, restart into provisioning");
    Ok(ServiceOutcome::Restart)
}

/// Validate and store new credentials so the next boot joins that network.
pub fn provision_wifi<S: CredentialStore + ?Sized>(
    store: &S,
    credentials: &WifiCredentials,
) -> Result<ServiceOutcome, ServiceError> {
    credentials
        .validate()
        .map_err(ServiceError::InvalidCredentials)?;
    store.save(credentials)?;
    Ok(ServiceOutcome::Restart)
}

/// Decode a `/wifiConfig` form body and provision it.
pub fn provision_wifi_form<S: CredentialStore + ?Sized>(
    store: &S,
    body: &[u8],
) -> Result<ServiceOutcome, ServiceError> {
    let credentials =
        WifiCredentials::from_form(body).map_err(|e| ServiceError::InvalidForm(e.to_string()))?;
    provision_wifi(store, &credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::credentials::MemoryCredentialStore;
    use crate::event_log::MemoryEventLog;
    use crate::sink::NoViewers;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_actions() {
        assert_eq!("reset".parse::<ServiceAction>().unwrap(), ServiceAction::Reset);
        assert_eq!("resetWiFi".parse::<ServiceAction>().unwrap(), ServiceAction::ResetWifi);

        for bad in ["", "RESET", "resetwifi", "reboot"] {
            let err = bad.parse::<ServiceAction>().unwrap_err();
            assert_eq!(err.status_code(), 400, "{bad}");
        }
    }

    #[test]
    fn test_form_body() {
        let form = ServiceForm::from_body(b"action=resetWiFi").unwrap();
        assert_eq!(form.action().unwrap(), ServiceAction::ResetWifi);

        let missing = ServiceForm::from_body(b"").unwrap();
        assert!(matches!(missing.action(), Err(ServiceError::UnknownAction(_))));
    }

    #[test]
    fn test_reset_event_log_is_idempotent() {
        let clock = FixedClock::at(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        let mut logger = PressLogger::new(4, MemoryEventLog::new(), clock, 4);
        logger.register_press().unwrap();
        logger.drain(&mut NoViewers);

        assert_eq!(reset_event_log(&mut logger).unwrap(), ServiceOutcome::Completed);
        assert_eq!(reset_event_log(&mut logger).unwrap(), ServiceOutcome::Completed);
        assert_eq!(logger.presses(), 0);
        assert!(logger.history().is_empty());
    }

    #[test]
    fn test_reset_wifi_requests_restart() {
        let store = MemoryCredentialStore::with(WifiCredentials::new("net", "pw"));
        assert_eq!(reset_wifi(&store).unwrap(), ServiceOutcome::Restart);
        assert!(store.load().is_none());
        assert_eq!(reset_wifi(&store).unwrap(), ServiceOutcome::Restart);
    }

    #[test]
    fn test_provision_rejects_invalid() {
        let store = MemoryCredentialStore::new();
        let err = provision_wifi_form(&store, b"ssid=&password=x").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(store.load().is_none());

        assert_eq!(
            provision_wifi_form(&store, b"ssid=HomeNet&password=pw").unwrap(),
            ServiceOutcome::Restart
        );
        assert_eq!(store.load(), Some(WifiCredentials::new("HomeNet", "pw")));
    }
}
