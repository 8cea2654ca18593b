use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use presslog_core::{DeviceConfig, EdgeDebouncer};
use presslog_server::{run_device, DeviceExit};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Simulated contact bounce between two edges typed on the same line.
const BOUNCE_MS: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,presslog_core=debug,presslog_server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Button press logger starting...");

    let config = load_config()?;
    let debouncer = Arc::new(EdgeDebouncer::new(config.debounce_ms));

    let button = tokio::spawn(simulate_button(debouncer.clone()));

    tracing::info!("   Page: http://localhost:{}/", config.http_port);
    tracing::info!("   Live: ws://localhost:{}{}", config.http_port, config.live_path);
    tracing::info!("Press Enter to press the button (each extra character adds a bounce)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down...");
                break;
            }
            exit = run_device(config.clone(), debouncer.clone()) => match exit {
                Ok(DeviceExit::Restart) => {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Err(e) => {
                    tracing::error!("Boot failed: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    button.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Host defaults, overlaid by `PRESSLOG_CONFIG` and individual env vars.
fn load_config() -> anyhow::Result<DeviceConfig> {
    let mut config = match std::env::var("PRESSLOG_CONFIG") {
        Ok(path) => DeviceConfig::load_over(&path, &DeviceConfig::host())
            .with_context(|| format!("Failed to load config from {}", path))?,
        Err(_) => DeviceConfig::host(),
    };

    if let Ok(port) = std::env::var("PRESSLOG_HTTP_PORT") {
        config.http_port = port
            .parse()
            .with_context(|| format!("Invalid PRESSLOG_HTTP_PORT: {}", port))?;
    }
    if let Ok(dir) = std::env::var("PRESSLOG_DATA_DIR") {
        config.data_dir = dir;
    }

    tracing::debug!("Config: {:?}", config);
    Ok(config)
}

/// Turn stdin lines into falling edges: one per character, `BOUNCE_MS` apart.
async fn simulate_button(debouncer: Arc<EdgeDebouncer>) {
    let started = Instant::now();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let now_ms = started.elapsed().as_millis() as u32;
        let edges = line.chars().count().max(1) as u32;
        let accepted = (0..edges)
            .filter(|i| debouncer.on_falling_edge(now_ms.wrapping_add(i * BOUNCE_MS)))
            .count();
        tracing::debug!("{} edges, {} accepted", edges, accepted);
    }
}
