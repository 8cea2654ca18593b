//! Device configuration.
//!
//! One settings struct shared by every target. [`DeviceConfig::default`] is the
//! on-device profile (SPIFFS paths, port 80); [`DeviceConfig::host`] is the
//! profile used when running on Linux.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    InvalidData(#[from] serde_json::Error),
}

/// Fixed-count retry with a fixed backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Number of attempts. Zero is treated as one.
    pub attempts: u32,

    /// Delay between two attempts, in milliseconds.
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, backoff_ms: u64) -> Self {
        Self {
            attempts,
            backoff_ms,
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Backoff to wait after failed attempt `n`, or `None` if it was the last.
    fn retry_after(&self, n: u32) -> Option<Duration> {
        (n < self.attempts.max(1)).then(|| self.backoff())
    }

    /// Run `attempt` until it succeeds or the attempts are used up.
    ///
    /// `attempt` receives the 1-based attempt number. `sleep` is called
    /// between attempts, never after the last one. Returns the last error.
    pub fn run<T, E>(
        &self,
        mut attempt: impl FnMut(u32) -> Result<T, E>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T, E> {
        let mut n = 1;
        loop {
            match attempt(n) {
                Ok(value) => return Ok(value),
                Err(e) => match self.retry_after(n) {
                    Some(backoff) => sleep(backoff),
                    None => return Err(e),
                },
            }
            n += 1;
        }
    }

    /// [`RetryPolicy::run`] with an awaited `sleep`, for async callers.
    ///
    /// Runtime-agnostic: the caller supplies its runtime's sleep.
    pub async fn run_async<T, E, F>(
        &self,
        mut attempt: impl FnMut(u32) -> Result<T, E>,
        mut sleep: impl FnMut(Duration) -> F,
    ) -> Result<T, E>
    where
        F: Future<Output = ()>,
    {
        let mut n = 1;
        loop {
            match attempt(n) {
                Ok(value) => return Ok(value),
                Err(e) => match self.retry_after(n) {
                    Some(backoff) => sleep(backoff).await,
                    None => return Err(e),
                },
            }
            n += 1;
        }
    }
}

/// Button logger settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConfig {
    /// GPIO number of the button (input, pull-up, falling edge).
    pub button_pin: u8,

    /// Debounce window in milliseconds.
    pub debounce_ms: u32,

    /// Maximum number of events waiting to be persisted.
    pub queue_capacity: usize,

    /// SNTP server.
    pub ntp_server: String,

    /// GMT offset in seconds.
    pub utc_offset_secs: i32,

    /// Daylight saving offset in seconds, added to the GMT offset.
    pub dst_offset_secs: i32,

    /// Bounded wait for the wall clock to synchronize at boot.
    pub time_sync: RetryPolicy,

    /// Bounded wait for the WiFi station to come up at boot.
    pub wifi_connect: RetryPolicy,

    /// Directory holding the persisted files.
    pub data_dir: String,

    /// Event log file name inside `data_dir`.
    pub event_log_file: String,

    /// Stored credentials file name inside `data_dir`.
    pub credentials_file: String,

    /// HTTP server port.
    pub http_port: u16,

    /// Path of the live channel websocket.
    pub live_path: String,

    /// SSID of the open access point hosted in provisioning mode.
    pub provisioning_ssid: String,

    /// Main loop period in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            button_pin: 4,
            debounce_ms: crate::debounce::DEBOUNCE_WINDOW_MS,
            queue_capacity: crate::queue::DEFAULT_QUEUE_CAPACITY,
            ntp_server: "pool.ntp.org".to_string(),
            utc_offset_secs: 3600,
            dst_offset_secs: 3600,
            time_sync: RetryPolicy::new(10, 1000),
            wifi_connect: RetryPolicy::new(100, 100),
            data_dir: "/spiffs".to_string(),
            event_log_file: "ButtonLog.txt".to_string(),
            credentials_file: "wifiConfig.txt".to_string(),
            http_port: 80,
            live_path: "/ws".to_string(),
            provisioning_ssid: "PressLogger-Setup".to_string(),
            poll_interval_ms: 10,
        }
    }
}

impl DeviceConfig {
    /// Profile for running on a Linux host.
    pub fn host() -> Self {
        Self {
            data_dir: "./data".to_string(),
            http_port: 8080,
            ..Default::default()
        }
    }

    /// Parse a JSON config. Fields not present keep the values of `base`.
    pub fn from_json_over(json: &str, base: &DeviceConfig) -> Result<Self, ConfigError> {
        let overrides: serde_json::Value = serde_json::from_str(json)?;
        let mut merged = serde_json::to_value(base)?;
        if let (Some(target), serde_json::Value::Object(source)) =
            (merged.as_object_mut(), overrides)
        {
            for (key, value) in source {
                target.insert(key, value);
            }
        }
        Ok(serde_json::from_value(merged)?)
    }

    /// Load a JSON config file over `base`. A missing file yields `base`.
    pub fn load_over(path: impl AsRef<Path>, base: &DeviceConfig) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json_over(&json, base),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(base.clone()),
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn event_log_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.event_log_file)
    }

    pub fn credentials_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.credentials_file)
    }

    /// Total offset of local time from UTC.
    pub fn local_offset_secs(&self) -> i32 {
        self.utc_offset_secs + self.dst_offset_secs
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_device_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.button_pin, 4);
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.local_offset_secs(), 7200);
        assert_eq!(config.event_log_path(), PathBuf::from("/spiffs/ButtonLog.txt"));
        assert_eq!(config.credentials_path(), PathBuf::from("/spiffs/wifiConfig.txt"));
    }

    #[test]
    fn test_partial_json_keeps_base() {
        let config =
            DeviceConfig::from_json_over(r#"{"httpPort":3000,"timeSync":{"attempts":3,"backoffMs":10}}"#, &DeviceConfig::host())
                .unwrap();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.time_sync, RetryPolicy::new(3, 10));
        assert_eq!(config.data_dir, "./data");
        assert_eq!(config.live_path, "/ws");
    }

    #[test]
    fn test_missing_file_yields_base() {
        let config = DeviceConfig::load_over("/nonexistent/presslog.json", &DeviceConfig::host()).unwrap();
        assert_eq!(config, DeviceConfig::host());
    }

    #[test]
    fn test_retry_stops_on_success() {
        let policy = RetryPolicy::new(5, 10);
        let mut sleeps = 0;
        let result: Result<u32, &str> = policy.run(
            |n| if n == 3 { Ok(n) } else { Err("not yet") },
            |_| sleeps += 1,
        );
        assert_eq!(result, Ok(3));
        assert_eq!(sleeps, 2);
    }

    #[test]
    fn test_retry_returns_last_error() {
        let policy = RetryPolicy::new(3, 10);
        let mut seen = Vec::new();
        let result: Result<(), u32> = policy.run(
            |n| {
                seen.push(n);
                Err(n)
            },
            |d| assert_eq!(d, Duration::from_millis(10)),
        );
        assert_eq!(result, Err(3));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_async_retry_matches_sync() {
        let policy = RetryPolicy::new(4, 25);
        let mut slept = Vec::new();
        let result: Result<u32, &str> = futures::executor::block_on(policy.run_async(
            |n| if n == 4 { Ok(n) } else { Err("not yet") },
            |d| {
                slept.push(d);
                futures::future::ready(())
            },
        ));
        assert_eq!(result, Ok(4));
        assert_eq!(slept, vec![Duration::from_millis(25); 3]);

        let exhausted: Result<(), u32> = futures::executor::block_on(
            RetryPolicy::new(2, 0).run_async(Err, |_| futures::future::ready(())),
        );
        assert_eq!(exhausted, Err(2));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy::new(0, 0);
        let mut calls = 0;
        let _: Result<(), ()> = policy.run(
            |_| {
                calls += 1;
                Err(())
            },
            |_| {},
        );
        assert_eq!(calls, 1);
    }
}
