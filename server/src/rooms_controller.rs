//! The one piece of shared, lock-guarded state in the whole server: the
//! room registry and the session registry. Everything past dispatch runs
//! inside a single room's task with no further locking.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use protocol::{
    AckId, EVENT_PLAYER_MOVE, EVENT_PLAYER_READY, EVENT_ROOM_CONFIG, EVENT_ROOM_CREATE,
    EVENT_ROOM_FETCH, EVENT_ROOM_JOIN, EVENT_ROOM_LEAVE, EVENT_ROOM_START, EVENT_WHOAMI,
    ErrorCode, OutboundItem, PlayerMoveInput, RoomConfigUpdate, RoomCreateRequest,
    RoomJoinRequest, RoomSummary,
};
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, oneshot, watch};

use crate::room::{Room, RoomCommand};
use crate::session::Outbox;

struct SessionEntry {
    outbox: Outbox,
    room: Option<String>,
    /// Half round-trip latency derived from the last `ping`/`pong` pair, in
    /// milliseconds; `None` until the first pong arrives.
    latency_ms: Option<u64>,
}

struct RoomEntry {
    commands: mpsc::UnboundedSender<RoomCommand>,
    summary_rx: watch::Receiver<RoomSummary>,
}

/// Shared registry of open rooms and connected sessions. Cloned as an
/// `Arc` into every session and room task; the only contended paths are
/// registry lookups, never simulation state.
pub struct RoomsController {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    rooms: Mutex<HashMap<String, RoomEntry>>,
    idle_room_timeout: Duration,
}

impl RoomsController {
    pub fn new(idle_room_timeout: Duration) -> Arc<Self> {
        Arc::new(RoomsController {
            sessions: Mutex::new(HashMap::new()),
            rooms: Mutex::new(HashMap::new()),
            idle_room_timeout,
        })
    }

    pub async fn register_session(&self, id: String, outbox: Outbox) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(id, SessionEntry { outbox, room: None, latency_ms: None });
    }

    pub async fn unregister_session(&self, id: &str) {
        let room_name = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(id).and_then(|entry| entry.room)
        };
        if let Some(room_name) = room_name {
            self.send_room_command(&room_name, RoomCommand::SessionClosed { session_id: id.to_string() }).await;
        }
    }

    pub async fn record_pong(&self, id: &str, data: Value) {
        let Some(sent_at) = data.as_u64() else { return };
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.get_mut(id) {
            let now = crate::session::now_millis();
            entry.latency_ms = Some(now.saturating_sub(sent_at) / 2);
        }
    }

    async fn send_to_session(&self, id: &str, items: Vec<OutboundItem>) {
        let sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.get(id) {
            let _ = entry.outbox.send(items);
        }
    }

    async fn send_room_command(&self, room_name: &str, cmd: RoomCommand) -> bool {
        let rooms = self.rooms.lock().await;
        match rooms.get(room_name) {
            Some(entry) => entry.commands.send(cmd).is_ok(),
            None => false,
        }
    }

    pub async fn remove_room(&self, name: &str) {
        let mut rooms = self.rooms.lock().await;
        rooms.remove(name);
    }

    /// Drops any room entry whose task has already exited without
    /// unregistering itself (the command channel's receiver was dropped).
    pub async fn sweep_dead_rooms(&self) {
        let mut rooms = self.rooms.lock().await;
        rooms.retain(|name, entry| {
            let alive = !entry.commands.is_closed();
            if !alive {
                tracing::info!(room = %name, "reaping dead room entry");
            }
            alive
        });
    }

    fn normalize_room_name(name: &str) -> String {
        name.trim().to_lowercase()
    }

    async fn spawn_room(self: &Arc<Self>, name: String, config: protocol::RoomConfig) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (summary_tx, summary_rx) = watch::channel(RoomSummary {
            name: name.clone(),
            player_count: 0,
            max_players: config.max_players,
            open: true,
        });
        let room = Room::new(name.clone(), config, self.clone(), summary_tx, self.idle_room_timeout);
        {
            let mut rooms = self.rooms.lock().await;
            rooms.insert(name.clone(), RoomEntry { commands: tx, summary_rx });
        }
        tokio::spawn(room.run(rx));
    }

    /// Entry point for every inbound wire event. Resolves the event name
    /// into a room/session operation, then turns the result into an ack
    /// frame (unless the event carried no `ackId`, in which case nothing is
    /// sent back).
    pub async fn dispatch(self: &Arc<Self>, session_id: String, name: String, data: Value, ack_id: Option<AckId>) {
        let result = self.handle_event(&session_id, name.as_str(), data).await;
        let Some(ack_id) = ack_id else { return };
        let item = match result {
            Ok(value) => OutboundItem::ack_ok(ack_id, value),
            Err(err) => OutboundItem::ack_err(ack_id, err.as_str()),
        };
        self.send_to_session(&session_id, vec![item]).await;
    }

    async fn handle_event(self: &Arc<Self>, session_id: &str, name: &str, data: Value) -> Result<Value, ErrorCode> {
        match name {
            EVENT_WHOAMI => Ok(Value::String(session_id.to_string())),
            EVENT_ROOM_FETCH => {
                let rooms = self.rooms.lock().await;
                let summaries: Vec<RoomSummary> = rooms.values().map(|r| r.summary_rx.borrow().clone()).collect();
                Ok(serde_json::to_value(summaries).unwrap_or(Value::Array(vec![])))
            }
            EVENT_ROOM_CREATE => {
                let request: RoomCreateRequest = serde_json::from_value(data).map_err(|_| ErrorCode::BadInput)?;
                let normalized = Self::normalize_room_name(&request.name);
                if normalized.is_empty() {
                    return Err(ErrorCode::BadInput);
                }
                {
                    let rooms = self.rooms.lock().await;
                    if rooms.contains_key(&normalized) {
                        return Err(ErrorCode::NameTaken);
                    }
                }
                let mut config = protocol::RoomConfig::default();
                request.config.apply_to(&mut config);
                self.spawn_room(normalized.clone(), config.clone()).await;
                Ok(serde_json::to_value(RoomSummary {
                    name: normalized,
                    player_count: 0,
                    max_players: config.max_players,
                    open: true,
                })
                .unwrap())
            }
            EVENT_ROOM_JOIN => {
                let request: RoomJoinRequest = serde_json::from_value(data).map_err(|_| ErrorCode::BadInput)?;
                let normalized = Self::normalize_room_name(&request.name);
                let outbox = {
                    let sessions = self.sessions.lock().await;
                    sessions.get(session_id).map(|e| e.outbox.clone()).ok_or(ErrorCode::Disconnected)?
                };
                let (reply_tx, reply_rx) = oneshot::channel();
                let sent = self
                    .send_room_command(
                        &normalized,
                        RoomCommand::Join {
                            session_id: session_id.to_string(),
                            player_name: request.player_name,
                            color: request.color,
                            outbox,
                            reply: reply_tx,
                        },
                    )
                    .await;
                if !sent {
                    return Err(ErrorCode::RoomNotFound);
                }
                let state = reply_rx.await.map_err(|_| ErrorCode::Internal)??;
                {
                    let mut sessions = self.sessions.lock().await;
                    if let Some(entry) = sessions.get_mut(session_id) {
                        entry.room = Some(normalized);
                    }
                }
                Ok(serde_json::to_value(state).unwrap())
            }
            EVENT_ROOM_LEAVE => {
                let room_name = self.take_session_room(session_id).await.ok_or(ErrorCode::NotInRoom)?;
                self.send_room_command(&room_name, RoomCommand::Leave { session_id: session_id.to_string() }).await;
                Ok(Value::Null)
            }
            EVENT_PLAYER_READY => {
                let ready: bool = serde_json::from_value(data).map_err(|_| ErrorCode::BadInput)?;
                let room_name = self.session_room(session_id).await.ok_or(ErrorCode::NotInRoom)?;
                let (reply_tx, reply_rx) = oneshot::channel();
                let sent = self
                    .send_room_command(&room_name, RoomCommand::SetReady { session_id: session_id.to_string(), ready, reply: reply_tx })
                    .await;
                if !sent {
                    return Err(ErrorCode::RoomNotFound);
                }
                reply_rx.await.map_err(|_| ErrorCode::Internal)??;
                Ok(Value::Null)
            }
            EVENT_ROOM_CONFIG => {
                let update: RoomConfigUpdate = serde_json::from_value(data).map_err(|_| ErrorCode::BadInput)?;
                let room_name = self.session_room(session_id).await.ok_or(ErrorCode::NotInRoom)?;
                let (reply_tx, reply_rx) = oneshot::channel();
                let sent = self
                    .send_room_command(&room_name, RoomCommand::SetConfig { session_id: session_id.to_string(), update, reply: reply_tx })
                    .await;
                if !sent {
                    return Err(ErrorCode::RoomNotFound);
                }
                reply_rx.await.map_err(|_| ErrorCode::Internal)??;
                Ok(Value::Null)
            }
            EVENT_ROOM_START => {
                let room_name = self.session_room(session_id).await.ok_or(ErrorCode::NotInRoom)?;
                let (reply_tx, reply_rx) = oneshot::channel();
                let sent = self
                    .send_room_command(&room_name, RoomCommand::Start { session_id: session_id.to_string(), reply: reply_tx })
                    .await;
                if !sent {
                    return Err(ErrorCode::RoomNotFound);
                }
                reply_rx.await.map_err(|_| ErrorCode::Internal)??;
                Ok(Value::Null)
            }
            EVENT_PLAYER_MOVE => {
                let input: PlayerMoveInput = serde_json::from_value(data).map_err(|_| ErrorCode::BadInput)?;
                let room_name = self.session_room(session_id).await.ok_or(ErrorCode::NotInRoom)?;
                self.send_room_command(
                    &room_name,
                    RoomCommand::PlayerMove { session_id: session_id.to_string(), avatar: input.avatar, turn: input.turn },
                )
                .await;
                Ok(Value::Null)
            }
            _ => {
                tracing::warn!(session = %session_id, event = %name, "unrecognized event");
                Err(ErrorCode::BadInput)
            }
        }
    }

    async fn session_room(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.lock().await;
        sessions.get(session_id).and_then(|e| e.room.clone())
    }

    async fn take_session_room(&self, session_id: &str) -> Option<String> {
        let mut sessions = self.sessions.lock().await;
        sessions.get_mut(session_id).and_then(|e| e.room.take())
    }
}

