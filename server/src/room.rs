//! A lobby of players that, once everyone is ready, wraps exactly one
//! [`sim::Game`]. Owns one tokio task: its inbound command queue and its
//! tick timer are the only things that mutate its state, so nothing here
//! needs a lock.

use std::sync::Arc;
use std::time::Duration;

use protocol::{
    EVENT_GAME_START, EVENT_ROOM_KICKED, ErrorCode, OutboundItem, PlayerSummary, RoomConfig,
    RoomConfigUpdate, RoomKickedPayload, RoomState,
};
use rand::Rng;
use sim::{Game, GameSettings};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;

use crate::game_controller;
use crate::rooms_controller::RoomsController;
use crate::session::Outbox;

/// Commands the [`RoomsController`] forwards to a specific room's task.
/// Every variant that can fail carries its own reply channel so the
/// controller can turn the result into a wire-level ack without the room
/// needing to know anything about the transport.
pub enum RoomCommand {
    Join {
        session_id: String,
        player_name: String,
        color: String,
        outbox: Outbox,
        reply: oneshot::Sender<Result<RoomState, ErrorCode>>,
    },
    Leave {
        session_id: String,
    },
    SetReady {
        session_id: String,
        ready: bool,
        reply: oneshot::Sender<Result<(), ErrorCode>>,
    },
    SetConfig {
        session_id: String,
        update: RoomConfigUpdate,
        reply: oneshot::Sender<Result<(), ErrorCode>>,
    },
    Start {
        session_id: String,
        reply: oneshot::Sender<Result<(), ErrorCode>>,
    },
    PlayerMove {
        session_id: String,
        avatar: String,
        turn: i8,
    },
    /// Synthetic event enqueued when a session's socket drops; handled like
    /// any other inbound command so ordering relative to the session's last
    /// few requests is preserved.
    SessionClosed {
        session_id: String,
    },
}

struct Member {
    session_id: String,
    player_name: String,
    color: String,
    ready: bool,
    outbox: Outbox,
    /// Set once a Game is running and this member controls an avatar.
    avatar_id: Option<String>,
    left_mid_game: bool,
}

/// The tick rate of an active game, expressed as the duration between ticks.
fn tick_period() -> Duration {
    Duration::from_secs_f64(sim::TICK_DT)
}

pub struct Room {
    name: String,
    config: RoomConfig,
    members: Vec<Member>,
    game: Option<Game>,
    registry: Arc<RoomsController>,
    summary_tx: watch::Sender<protocol::RoomSummary>,
    idle_room_timeout: Duration,
}

impl Room {
    pub fn new(
        name: String,
        config: RoomConfig,
        registry: Arc<RoomsController>,
        summary_tx: watch::Sender<protocol::RoomSummary>,
        idle_room_timeout: Duration,
    ) -> Self {
        Room { name, config, members: Vec::new(), game: None, registry, summary_tx, idle_room_timeout }
    }

    fn leader_id(&self) -> String {
        self.members.first().map(|m| m.session_id.clone()).unwrap_or_default()
    }

    fn publish_summary(&self) {
        let _ = self.summary_tx.send(protocol::RoomSummary {
            name: self.name.clone(),
            player_count: self.members.len() as u16,
            max_players: self.config.max_players,
            open: self.game.is_none(),
        });
    }

    fn state(&self) -> RoomState {
        RoomState {
            name: self.name.clone(),
            config: self.config.clone(),
            players: self
                .members
                .iter()
                .map(|m| PlayerSummary {
                    id: m.session_id.clone(),
                    name: m.player_name.clone(),
                    color: m.color.clone(),
                    ready: m.ready,
                })
                .collect(),
            leader_id: self.leader_id(),
        }
    }

    /// Pushes the current room state to every member already connected.
    /// Reuses `room:join`'s payload shape for the broadcast (the same
    /// `RoomState` the joining session receives as its ack result) so
    /// clients only need one parser for "this is the room now."
    fn broadcast_room_state(&self) {
        let state = self.state();
        self.broadcast_lobby(protocol::EVENT_ROOM_JOIN, &state);
    }

    /// Broadcasts a lobby-phase event (not batched with game ticks, since the
    /// lobby has no tick loop, so each one goes out as its own frame).
    fn broadcast_lobby<T: serde::Serialize>(&self, name: &'static str, payload: &T) {
        let data = protocol::to_data(payload);
        for member in &self.members {
            let _ = member.outbox.send(vec![OutboundItem::event(name, data.clone(), None)]);
        }
    }

    fn broadcast_game_items(&self, items: &[OutboundItem]) {
        // OutboundItem doesn't implement Clone (Value does); rebuild a
        // fresh Vec of items per recipient from the shared underlying data.
        for member in &self.members {
            let batch: Vec<OutboundItem> = items
                .iter()
                .map(|item| match item {
                    OutboundItem::Event { name, data, ack_id } => {
                        OutboundItem::Event { name, data: data.clone(), ack_id: *ack_id }
                    }
                    OutboundItem::Ack { ack_id, error, result } => {
                        OutboundItem::Ack { ack_id: *ack_id, error: error.clone(), result: result.clone() }
                    }
                })
                .collect();
            let _ = member.outbox.send(batch);
        }
    }

    fn member_mut(&mut self, session_id: &str) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.session_id == session_id)
    }

    fn is_leader(&self, session_id: &str) -> bool {
        self.members.first().map(|m| m.session_id == session_id).unwrap_or(false)
    }

    fn handle_join(
        &mut self,
        session_id: String,
        player_name: String,
        color: String,
        outbox: Outbox,
    ) -> Result<RoomState, ErrorCode> {
        if self.game.is_some() {
            // Mid-game joins become spectators: added to the broadcast
            // list with no avatar, never counted against max_players.
            self.members.push(Member {
                session_id,
                player_name,
                color,
                ready: true,
                outbox,
                avatar_id: None,
                left_mid_game: false,
            });
            return Ok(self.state());
        }
        if self.members.len() >= self.config.max_players as usize {
            return Err(ErrorCode::RoomFull);
        }
        self.members.push(Member {
            session_id,
            player_name,
            color,
            ready: false,
            outbox,
            avatar_id: None,
            left_mid_game: false,
        });
        self.publish_summary();
        let state = self.state();
        self.broadcast_room_state();
        Ok(state)
    }

    fn handle_leave(&mut self, session_id: &str) {
        let Some(pos) = self.members.iter().position(|m| m.session_id == session_id) else { return };
        if self.game.is_some() && self.members[pos].avatar_id.is_some() {
            // The avatar stays alive in the simulation until it dies
            // naturally; only the membership bookkeeping is removed now.
            self.members[pos].left_mid_game = true;
            return;
        }
        self.members.remove(pos);
        self.publish_summary();
        self.broadcast_room_state();
    }

    fn handle_set_ready(&mut self, session_id: &str, ready: bool) -> Result<(), ErrorCode> {
        if self.game.is_some() {
            return Err(ErrorCode::RoomClosed);
        }
        let Some(member) = self.member_mut(session_id) else { return Err(ErrorCode::NotInRoom) };
        member.ready = ready;
        self.broadcast_room_state();
        Ok(())
    }

    fn handle_set_config(&mut self, session_id: &str, update: RoomConfigUpdate) -> Result<(), ErrorCode> {
        if !self.members.iter().any(|m| m.session_id == session_id) {
            return Err(ErrorCode::NotInRoom);
        }
        if !self.is_leader(session_id) {
            return Err(ErrorCode::NotLeader);
        }
        if self.game.is_some() {
            return Err(ErrorCode::RoomClosed);
        }
        apply_config_update(&mut self.config, &update)?;
        self.publish_summary();
        self.broadcast_room_state();
        Ok(())
    }

    fn handle_start(&mut self, session_id: &str) -> Result<(), ErrorCode> {
        if !self.members.iter().any(|m| m.session_id == session_id) {
            return Err(ErrorCode::NotInRoom);
        }
        if !self.is_leader(session_id) {
            return Err(ErrorCode::NotLeader);
        }
        if self.game.is_some() {
            return Err(ErrorCode::RoomClosed);
        }
        let ready_count = self.members.iter().filter(|m| m.ready).count();
        if ready_count != self.members.len() || self.members.is_empty() {
            return Err(ErrorCode::NotEnoughPlayers);
        }
        if self.members.len() < 2 && !self.config.solo_allowed {
            return Err(ErrorCode::NotEnoughPlayers);
        }
        self.start_game();
        Ok(())
    }

    fn start_game(&mut self) {
        let specs: Vec<(String, String, String, String)> = self
            .members
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let avatar_id = format!("av-{}-{}", self.name, i);
                (avatar_id, m.session_id.clone(), m.player_name.clone(), m.color.clone())
            })
            .collect();
        for (i, member) in self.members.iter_mut().enumerate() {
            member.avatar_id = Some(format!("av-{}-{}", self.name, i));
            member.left_mid_game = false;
        }

        let settings = GameSettings {
            max_round_score: self.config.max_round_score,
            bonuses_enabled: self.config.bonuses_enabled,
            speed_units_per_sec: self.config.speed,
        };
        let seed: u64 = rand::thread_rng().gen();
        self.game = Some(Game::new(specs, settings, seed));
        self.publish_summary();
        self.broadcast_lobby(EVENT_GAME_START, &serde_json::Value::Null);
    }

    fn handle_player_move(&mut self, session_id: &str, avatar: &str, turn: i8) {
        let Some(game) = self.game.as_mut() else { return };
        let Some(member) = self.members.iter().find(|m| m.session_id == session_id) else { return };
        let Some(owned) = &member.avatar_id else { return };
        if owned != avatar {
            // A session may only steer its own avatar.
            return;
        }
        game_controller::apply_move(game, avatar, turn);
    }

    /// Runs the room's event loop until the room is torn down (last player
    /// leaves, idle timeout, or an internal failure).
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<RoomCommand>) {
        // Built fresh exactly when a Game starts and torn down when it ends,
        // so the time spent idle in the lobby never produces a burst of
        // catch-up ticks the moment play begins.
        let mut tick_timer: Option<tokio::time::Interval> = None;
        // A room starts idle: `room:create` only reserves the name, the
        // creator still has to `room:join` separately, so an abandoned
        // create is reaped the same as an emptied-out room.
        let mut idle_since: Option<tokio::time::Instant> = Some(tokio::time::Instant::now());

        loop {
            match (self.game.is_some(), tick_timer.is_some()) {
                (true, false) => {
                    let mut timer = tokio::time::interval(tick_period());
                    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    tick_timer = Some(timer);
                }
                (false, true) => tick_timer = None,
                _ => {}
            }

            let game_active = tick_timer.is_some();
            let idle_sleep = async {
                match idle_since {
                    Some(since) => tokio::time::sleep_until(since + self.idle_room_timeout).await,
                    None => std::future::pending().await,
                }
            };
            let tick_due = async {
                match &mut tick_timer {
                    Some(timer) => timer.tick().await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                _ = tick_due, if game_active => {
                    while let Ok(cmd) = commands.try_recv() {
                        self.handle_command(cmd);
                    }
                    if !self.run_game_tick() {
                        self.handle_game_tick_panic();
                        break;
                    }
                }
                maybe_cmd = commands.recv(), if self.game.is_none() => {
                    match maybe_cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => break,
                    }
                }
                _ = idle_sleep => {
                    tracing::info!(room = %self.name, "reaping idle room");
                    break;
                }
            }

            idle_since = if self.members.is_empty() {
                idle_since.or_else(|| Some(tokio::time::Instant::now()))
            } else {
                None
            };
        }

        self.registry.remove_room(&self.name).await;
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { session_id, player_name, color, outbox, reply } => {
                let _ = reply.send(self.handle_join(session_id, player_name, color, outbox));
            }
            RoomCommand::Leave { session_id } => {
                self.handle_leave(&session_id);
            }
            RoomCommand::SetReady { session_id, ready, reply } => {
                let _ = reply.send(self.handle_set_ready(&session_id, ready));
            }
            RoomCommand::SetConfig { session_id, update, reply } => {
                let _ = reply.send(self.handle_set_config(&session_id, update));
            }
            RoomCommand::Start { session_id, reply } => {
                let _ = reply.send(self.handle_start(&session_id));
            }
            RoomCommand::PlayerMove { session_id, avatar, turn } => {
                self.handle_player_move(&session_id, &avatar, turn);
            }
            RoomCommand::SessionClosed { session_id } => {
                self.handle_leave(&session_id);
            }
        }
    }

    /// Advances the Game by exactly one tick. Returns `false` if the tick
    /// panicked (caught via `catch_unwind`), in which case the room is torn
    /// down by the caller.
    fn run_game_tick(&mut self) -> bool {
        let Some(mut game) = self.game.take() else { return true };
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let items = game.tick(sim::TICK_DT);
            (game, items)
        }));
        match result {
            Ok((game, items)) => {
                self.game = Some(game);
                if !items.is_empty() {
                    self.broadcast_game_items(&items);
                }
                self.after_tick_bookkeeping();
                true
            }
            Err(payload) => {
                tracing::error!(room = %self.name, ?payload, "game tick panicked");
                false
            }
        }
    }

    /// Drops mid-game-departed members whose avatar has since died, and
    /// returns the match to the lobby once it has ended.
    fn after_tick_bookkeeping(&mut self) {
        let Some(game) = &self.game else { return };
        if let Some(match_end) = &game.match_end {
            tracing::info!(room = %self.name, winner = ?match_end.winner, reason = %match_end.reason, "match ended");
            self.game = None;
            self.members.retain(|m| !m.left_mid_game);
            for member in &mut self.members {
                member.ready = false;
                member.avatar_id = None;
            }
            self.publish_summary();
            self.broadcast_room_state();
            return;
        }
        let game = self.game.as_ref().unwrap();
        self.members.retain(|m| {
            if !m.left_mid_game {
                return true;
            }
            match &m.avatar_id {
                Some(avatar_id) => game.avatars.get(avatar_id).map(|a| a.alive).unwrap_or(false),
                None => false,
            }
        });
    }

    fn handle_game_tick_panic(&mut self) {
        self.broadcast_lobby(
            EVENT_ROOM_KICKED,
            &RoomKickedPayload { reason: ErrorCode::Internal.as_str().to_string() },
        );
        self.members.clear();
        self.game = None;
    }
}

/// Applies a single `key, value` room-config override, matching the fields
/// of [`RoomConfig`]; returns [`ErrorCode::BadInput`] on an unknown key or a
/// value of the wrong shape.
fn apply_config_update(config: &mut RoomConfig, update: &RoomConfigUpdate) -> Result<(), ErrorCode> {
    match update.key.as_str() {
        "max_players" => {
            config.max_players = update.value.as_u64().ok_or(ErrorCode::BadInput)? as u16;
        }
        "max_round_score" => {
            config.max_round_score = update.value.as_u64().ok_or(ErrorCode::BadInput)? as u32;
        }
        "bonuses_enabled" => {
            config.bonuses_enabled = update.value.as_bool().ok_or(ErrorCode::BadInput)?;
        }
        "speed" => {
            config.speed = update.value.as_f64().ok_or(ErrorCode::BadInput)?;
        }
        "solo_allowed" => {
            config.solo_allowed = update.value.as_bool().ok_or(ErrorCode::BadInput)?;
        }
        _ => return Err(ErrorCode::BadInput),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RoomConfig {
        RoomConfig::default()
    }

    #[test]
    fn config_update_rejects_unknown_key() {
        let mut cfg = config();
        let update = RoomConfigUpdate { key: "nonsense".into(), value: serde_json::json!(1) };
        assert_eq!(apply_config_update(&mut cfg, &update), Err(ErrorCode::BadInput));
    }

    #[test]
    fn config_update_sets_speed() {
        let mut cfg = config();
        let update = RoomConfigUpdate { key: "speed".into(), value: serde_json::json!(20.0) };
        apply_config_update(&mut cfg, &update).unwrap();
        assert_eq!(cfg.speed, 20.0);
    }
}
