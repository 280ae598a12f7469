use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

const ROOM_CHANNEL_CAPACITY: usize = 256;

pub const JOINED_MSG: &str = "User has joined the room.";
pub const LEFT_MSG: &str = "User has left the room.";

/// Frames a participant sends.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    Join { room: String },
    Leave { room: String },
    UpdateCase { room: String, case_data: Value },
}

/// Frames delivered to everyone in a room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomEvent {
    Status { room: String, msg: String },
    CaseUpdated { room: String, case_data: Value },
}

struct Room {
    tx: broadcast::Sender<RoomEvent>,
    members: usize,
}

/// Named broadcast groups.
///
/// Each room owns a broadcast channel; it is created on first join and
/// dropped when its last member leaves. Nothing is kept after that.
pub struct RoomHub {
    rooms: Mutex<HashMap<String, Room>>,
}

impl RoomHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
        })
    }

    /// Join a room and announce it to the members, the new one included.
    pub async fn join(&self, room: &str) -> broadcast::Receiver<RoomEvent> {
        let mut map = self.rooms.lock().await;
        let entry = map.entry(room.to_string()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
            Room { tx, members: 0 }
        });
        entry.members += 1;
        let rx = entry.tx.subscribe();
        let _ = entry.tx.send(RoomEvent::Status {
            room: room.to_string(),
            msg: JOINED_MSG.to_string(),
        });
        debug!(room, members = entry.members, "joined room");
        rx
    }

    /// Leave a room, announcing it to the remaining members.
    pub async fn leave(&self, room: &str) {
        let mut map = self.rooms.lock().await;
        let Some(entry) = map.get_mut(room) else {
            return;
        };
        entry.members = entry.members.saturating_sub(1);
        let _ = entry.tx.send(RoomEvent::Status {
            room: room.to_string(),
            msg: LEFT_MSG.to_string(),
        });
        debug!(room, members = entry.members, "left room");
        if entry.members == 0 {
            map.remove(room);
        }
    }

    /// Relay case data to every member. Returns the number of receivers;
    /// zero when the room does not exist.
    pub async fn publish_case(&self, room: &str, case_data: Value) -> usize {
        let map = self.rooms.lock().await;
        match map.get(room) {
            Some(entry) => entry
                .tx
                .send(RoomEvent::CaseUpdated {
                    room: room.to_string(),
                    case_data,
                })
                .unwrap_or(0),
            None => 0,
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn members(&self, room: &str) -> usize {
        self.rooms.lock().await.get(room).map_or(0, |r| r.members)
    }
}
