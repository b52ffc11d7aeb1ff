//! Wire-level structs for the lobby protocol.

use serde::{Deserialize, Serialize};

/// A room's tunable settings. Values are stored loosely typed (`f64`/`bool`)
/// because `room:config` sets one key at a time from a small fixed set —
/// mirroring how a lobby entry's config keeps things simple rather
/// than introducing a settings DSL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Maximum number of players allowed in the room.
    pub max_players: u16,
    /// Target round score that ends the match.
    pub max_round_score: u32,
    /// Whether the bonus subsystem is active for this room.
    pub bonuses_enabled: bool,
    /// Base avatar velocity in world-units/second.
    pub speed: f64,
    /// Whether a lone ready player may start a match.
    pub solo_allowed: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        RoomConfig {
            max_players: 6,
            max_round_score: 10,
            bonuses_enabled: true,
            speed: 15.0,
            solo_allowed: false,
        }
    }
}

/// `room:create` request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomCreateRequest {
    pub name: String,
    #[serde(default)]
    pub config: RoomConfigPatch,
}

/// Partial config overrides accepted at room creation time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomConfigPatch {
    pub max_players: Option<u16>,
    pub max_round_score: Option<u32>,
    pub bonuses_enabled: Option<bool>,
    pub speed: Option<f64>,
    pub solo_allowed: Option<bool>,
}

impl RoomConfigPatch {
    pub fn apply_to(&self, config: &mut RoomConfig) {
        if let Some(v) = self.max_players {
            config.max_players = v;
        }
        if let Some(v) = self.max_round_score {
            config.max_round_score = v;
        }
        if let Some(v) = self.bonuses_enabled {
            config.bonuses_enabled = v;
        }
        if let Some(v) = self.speed {
            config.speed = v;
        }
        if let Some(v) = self.solo_allowed {
            config.solo_allowed = v;
        }
    }
}

/// `room:join` request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomJoinRequest {
    pub name: String,
    pub player_name: String,
    pub color: String,
}

/// A single `key, value` pair accepted by `room:config` (leader only).
#[derive(Debug, Clone, Deserialize)]
pub struct RoomConfigUpdate {
    pub key: String,
    pub value: serde_json::Value,
}

/// One player as seen from the lobby.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub id: String,
    pub name: String,
    pub color: String,
    pub ready: bool,
}

/// A summary of an open room, as returned by `room:fetch` and `room:create`.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub name: String,
    pub player_count: u16,
    pub max_players: u16,
    pub open: bool,
}

/// The full room state returned by `room:join` (and pushed on membership
/// changes): name, config, and the ordered player list.
#[derive(Debug, Clone, Serialize)]
pub struct RoomState {
    pub name: String,
    pub config: RoomConfig,
    pub players: Vec<PlayerSummary>,
    pub leader_id: String,
}

/// `room:kicked` payload: the room a session belonged to was torn down.
#[derive(Debug, Clone, Serialize)]
pub struct RoomKickedPayload {
    pub reason: String,
}
