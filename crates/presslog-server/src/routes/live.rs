//! Live channel.
//!
//! A new viewer first receives every persisted record in file order, then
//! each event as it is drained by the press loop. Viewers never send
//! anything meaningful; inbound frames are ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

pub fn routes(path: &str) -> Router<AppState> {
    Router::new().route(path, get(live_channel))
}

async fn live_channel(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_viewer(socket, state))
}

async fn handle_viewer(socket: WebSocket, state: AppState) {
    let viewer = Uuid::new_v4();
    info!("Live viewer {} connected", viewer);

    // Subscribing under the logger lock: the press loop drains under the same
    // lock, so a record is either in the history or arrives live.
    let (history, mut live) = {
        let logger = state.logger.lock().await;
        (logger.history(), state.live.subscribe())
    };

    let (mut sender, mut receiver) = socket.split();

    let replayed = history.len();
    for record in history {
        if sender.send(Message::Text(record)).await.is_err() {
            info!("Live viewer {} disconnected during replay", viewer);
            return;
        }
    }
    debug!("Replayed {} records to viewer {}", replayed, viewer);

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("Live viewer {} error: {}", viewer, e);
                    break;
                }
                Some(Ok(_)) => {}
            },
            event = live.recv() => match event {
                Ok(record) => {
                    if sender.send(Message::Text(record)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Live viewer {} lagged, {} events skipped", viewer, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = state.restart.wait() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    info!("Live viewer {} disconnected", viewer);
}
