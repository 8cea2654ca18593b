//! HTTP and live channel handlers on `EspHttpServer`.
//!
//! Same surface as the host build: `GET /`, `POST /serviceMode`,
//! `POST /wifiConfig` and the websocket live channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use embedded_svc::{
    http::{Headers, Method},
    io::{Read, Write},
    ws::FrameType,
};
use esp_idf_svc::http::server::{
    ws::EspHttpWsDetachedSender, Configuration as HttpConfiguration, EspHttpConnection,
    EspHttpServer, Request,
};
use esp_idf_svc::sys::EspError;
use log::{info, warn};
use presslog_core::page::{self, CONTENT_TYPE};
use presslog_core::service::{self, ServiceAction, ServiceError, ServiceForm, ServiceOutcome};
use presslog_core::{BroadcastSink, FileCredentialStore, FileEventLog, PressLogger, SystemClock};

/// Largest form body accepted.
const MAX_HTTP_BODY: usize = 512;

/// Time given to the response before the device restarts.
const RESTART_DELAY: Duration = Duration::from_millis(500);

pub type DeviceLogger = PressLogger<FileEventLog, SystemClock>;
pub type SharedLogger = Arc<Mutex<DeviceLogger>>;

/// Connected live viewers, keyed by websocket session.
#[derive(Clone, Default)]
pub struct LiveViewers {
    sessions: Arc<Mutex<HashMap<i32, EspHttpWsDetachedSender>>>,
}

impl LiveViewers {
    fn add(&self, session: i32, sender: EspHttpWsDetachedSender) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(session, sender);
        }
    }

    fn remove(&self, session: i32) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(&session);
        }
    }
}

impl BroadcastSink for LiveViewers {
    /// Called from the main loop only. A detached send blocks until the httpd
    /// task has written the frame, so no lock is held while sending.
    fn broadcast(&mut self, payload: &str) {
        let senders: Vec<(i32, EspHttpWsDetachedSender)> = match self.sessions.lock() {
            Ok(sessions) => sessions
                .iter()
                .map(|(session, sender)| (*session, sender.clone()))
                .collect(),
            Err(_) => return,
        };

        let mut dead = Vec::new();
        for (session, mut sender) in senders {
            if sender.is_closed() {
                dead.push(session);
                continue;
            }
            if let Err(e) = sender.send(FrameType::Text(false), payload.as_bytes()) {
                warn!("Dropping live viewer {}: {}", session, e);
                dead.push(session);
            }
        }
        for session in dead {
            self.remove(session);
        }
    }

    fn viewer_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }
}

/// Everything the handlers need.
#[derive(Clone)]
pub struct HttpContext {
    pub logger: SharedLogger,
    pub credentials: Arc<FileCredentialStore>,
    pub viewers: LiveViewers,
    pub live_path: String,
}

/// Start the HTTP server. Keep the returned server alive.
pub fn start_http_server(ctx: HttpContext) -> Result<EspHttpServer<'static>> {
    let conf = HttpConfiguration {
        stack_size: 10 * 1024,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&conf)?;

    let config_page = page::render(&ctx.live_path);
    server.fn_handler::<anyhow::Error, _>("/", Method::Get, move |req| {
        req.into_response(200, Some("OK"), &[("Content-Type", CONTENT_TYPE)])?
            .write_all(config_page.as_bytes())?;
        Ok(())
    })?;

    {
        let ctx = ctx.clone();
        server.fn_handler::<anyhow::Error, _>("/serviceMode", Method::Post, move |mut req| {
            let body = read_request_body(&mut req)?;
            let result = match ServiceForm::from_body(&body).and_then(|form| form.action()) {
                Ok(ServiceAction::Reset) => {
                    let mut logger = lock(&ctx.logger)?;
                    service::reset_event_log(&mut *logger)
                }
                Ok(ServiceAction::ResetWifi) => service::reset_wifi(ctx.credentials.as_ref()),
                Err(e) => Err(e),
            };
            respond(req, result)
        })?;
    }

    {
        let credentials = ctx.credentials.clone();
        server.fn_handler::<anyhow::Error, _>("/wifiConfig", Method::Post, move |mut req| {
            let body = read_request_body(&mut req)?;
            respond(req, service::provision_wifi_form(credentials.as_ref(), &body))
        })?;
    }

    {
        let logger = ctx.logger.clone();
        let viewers = ctx.viewers.clone();
        server.ws_handler(&ctx.live_path, move |ws| -> Result<(), EspError> {
            let session = ws.session();
            if ws.is_new() {
                let sender = ws.create_detached_sender()?;
                // Read the history and register for live events together.
                // Live frames are queued to this httpd task, so they can only
                // go out after the replay below.
                let history = match logger.lock() {
                    Ok(logger) => {
                        viewers.add(session, sender);
                        logger.history()
                    }
                    Err(_) => return Ok(()),
                };
                for record in &history {
                    ws.send(FrameType::Text(false), record.as_bytes())?;
                }
                info!("Live viewer {} connected, replayed {} records", session, history.len());
            } else if ws.is_closed() {
                viewers.remove(session);
                info!("Live viewer {} disconnected", session);
            } else {
                // Inbound frames carry nothing.
                let mut buf = [0u8; 64];
                let _ = ws.recv(&mut buf);
            }
            Ok(())
        })?;
    }

    info!("HTTP server started");
    Ok(server)
}

/// Restart the device now.
pub fn restart() -> ! {
    info!("Restarting...");
    unsafe { esp_idf_svc::sys::esp_restart() }
}

/// Restart after `delay` from a helper thread, so the caller can finish responding.
pub fn schedule_restart(delay: Duration) {
    let spawned = thread::Builder::new()
        .name("restart-request".into())
        .spawn(move || {
            thread::sleep(delay);
            restart();
        });
    if let Err(e) = spawned {
        warn!("Failed to spawn restart thread: {}", e);
        restart();
    }
}

fn lock(logger: &SharedLogger) -> Result<MutexGuard<'_, DeviceLogger>> {
    logger.lock().map_err(|_| anyhow!("Logger lock poisoned"))
}

fn read_request_body(req: &mut Request<&mut EspHttpConnection<'_>>) -> Result<Vec<u8>> {
    let len = req.content_len().unwrap_or(0) as usize;
    if len > MAX_HTTP_BODY {
        return Err(anyhow!("Request body too large"));
    }

    let mut body = vec![0_u8; len];
    if len > 0 {
        req.read_exact(&mut body)?;
    }
    Ok(body)
}

fn respond(
    req: Request<&mut EspHttpConnection<'_>>,
    result: Result<ServiceOutcome, ServiceError>,
) -> Result<()> {
    let (status, message) = match &result {
        Ok(outcome) => (200, outcome.message().to_string()),
        Err(e) => {
            warn!("Service request rejected: {}", e);
            (e.status_code(), e.to_string())
        }
    };

    req.into_response(status, None, &[("Content-Type", "text/plain")])?
        .write_all(message.as_bytes())?;

    if let Ok(ServiceOutcome::Restart) = result {
        schedule_restart(RESTART_DELAY);
    }
    Ok(())
}
