use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use verdict_core::rooms::{ClientMessage, RoomEvent, RoomHub};

use crate::AppState;

pub(crate) async fn rooms_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let hub = Arc::clone(&state.rooms);
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Forward one room's events into the connection's outbound queue.
fn forward(
    mut rx: broadcast::Receiver<RoomEvent>,
    out: mpsc::UnboundedSender<RoomEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if out.send(event).is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "room subscriber lagged");
                    continue;
                }
                Err(_) => break,
            }
        }
    })
}

async fn handle_socket(mut socket: WebSocket, hub: Arc<RoomHub>) {
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<RoomEvent>();
    let mut joined: HashMap<String, JoinHandle<()>> = HashMap::new();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!("websocket receive failed: {e}");
                        break;
                    }
                };
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join { room }) => {
                        if joined.contains_key(&room) {
                            continue;
                        }
                        let rx = hub.join(&room).await;
                        joined.insert(room, forward(rx, out_tx.clone()));
                    }
                    Ok(ClientMessage::Leave { room }) => {
                        if let Some(handle) = joined.remove(&room) {
                            handle.abort();
                            hub.leave(&room).await;
                        }
                    }
                    Ok(ClientMessage::UpdateCase { room, case_data }) => {
                        hub.publish_case(&room, case_data).await;
                    }
                    Err(e) => warn!("ignoring malformed room frame: {e}"),
                }
            }
            Some(event) = out_rx.recv() => {
                let Ok(frame) = serde_json::to_string(&event) else {
                    continue;
                };
                if socket.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
        }
    }

    for (room, handle) in joined {
        handle.abort();
        hub.leave(&room).await;
    }
}
