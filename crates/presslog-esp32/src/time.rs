//! SNTP time synchronization.
//!
//! SNTP sets the system time; [`presslog_core::SystemClock`] reads it back and
//! reports unsynchronized until it looks plausible.

use anyhow::Result;
use esp_idf_svc::sntp::{EspSntp, SntpConf};
use log::info;

/// Start SNTP against `server`. Keep the returned handle alive.
pub fn start_sntp(server: &str) -> Result<EspSntp<'static>> {
    let mut conf = SntpConf::default();
    conf.servers[0] = server;
    let sntp = EspSntp::new(&conf)?;
    info!("SNTP started ({})", server);
    Ok(sntp)
}
