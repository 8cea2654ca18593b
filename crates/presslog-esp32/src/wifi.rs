//! WiFi station and access point.

use std::net::Ipv4Addr;
use std::thread;

use anyhow::{anyhow, Result};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{modem::Modem, peripheral},
    nvs::EspDefaultNvsPartition,
    wifi::{
        AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration,
        EspWifi,
    },
};
use log::{info, warn};
use presslog_core::{RetryPolicy, WifiCredentials};

pub type Wifi = BlockingWifi<EspWifi<'static>>;

/// Create the WiFi driver. Nothing is started yet.
pub fn new_wifi(
    modem: impl peripheral::Peripheral<P = Modem> + 'static,
    sysloop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
) -> Result<Wifi> {
    let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
    Ok(BlockingWifi::wrap(esp_wifi, sysloop)?)
}

/// Join `network`, retrying per `policy`.
///
/// Returns the station IP address once DHCP completes.
pub fn connect(wifi: &mut Wifi, network: &WifiCredentials, policy: &RetryPolicy) -> Result<Ipv4Addr> {
    network.validate().map_err(|reason| anyhow!(reason))?;

    let auth_method = if network.password.is_empty() {
        info!("WiFi password is empty, using open network");
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: network
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("SSID too long (max 32 chars)"))?,
        password: network
            .password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("Password too long (max 64 chars)"))?,
        auth_method,
        ..Default::default()
    }))?;
    wifi.start()?;

    policy
        .run(
            |attempt| {
                info!("Connecting to '{}' (attempt {})...", network.ssid, attempt);
                let result = wifi.connect().and_then(|()| wifi.wait_netif_up());
                if let Err(e) = &result {
                    warn!("WiFi connect failed on attempt {}: {}", attempt, e);
                    let _ = wifi.disconnect();
                }
                result
            },
            thread::sleep,
        )
        .map_err(|e| anyhow!("Failed to connect to '{}': {}", network.ssid, e))?;

    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    info!("WiFi connected!");
    info!("  IP address: {}", ip_info.ip);
    info!("  Gateway:    {}", ip_info.subnet.gateway);
    Ok(ip_info.ip)
}

/// Host an open access point named `ssid` for provisioning.
pub fn start_access_point(wifi: &mut Wifi, ssid: &str) -> Result<Ipv4Addr> {
    wifi.set_configuration(&Configuration::AccessPoint(AccessPointConfiguration {
        ssid: ssid
            .try_into()
            .map_err(|_| anyhow!("Provisioning SSID too long"))?,
        auth_method: AuthMethod::None,
        channel: 1,
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.wait_netif_up()?;

    let ip = wifi.wifi().ap_netif().get_ip_info()?.ip;
    info!("Provisioning AP '{}' started, page at http://{}/", ssid, ip);
    Ok(ip)
}
