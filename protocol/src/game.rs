//! Wire-level structs for the in-game protocol and the bonus
//! kind enumeration, which must stay bit-exact for client
//! compatibility — the `#[serde(rename = ...)]` strings below are the wire
//! contract, independent of the Rust identifier.

use serde::{Deserialize, Serialize};

/// `player:move` request payload: `{avatar, move}` with `move` in `{-1,0,1}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerMoveInput {
    pub avatar: String,
    #[serde(rename = "move")]
    pub turn: i8,
}

/// One avatar's position in a batched `position` update.
#[derive(Debug, Clone, Serialize)]
pub struct PositionEntry {
    pub avatar: String,
    pub x: f64,
    pub y: f64,
}

/// `avatar:die` payload.
#[derive(Debug, Clone, Serialize)]
pub struct AvatarDiePayload {
    pub avatar: String,
    pub x: f64,
    pub y: f64,
}

/// Bonus kinds, bit-exact for client compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BonusKind {
    #[serde(rename = "BonusSelfSmall")]
    SelfSmall,
    #[serde(rename = "BonusSelfBig")]
    SelfBig,
    #[serde(rename = "BonusSelfMaster")]
    SelfMaster,
    #[serde(rename = "BonusSelfSlow")]
    SelfSlow,
    #[serde(rename = "BonusSelfFast")]
    SelfFast,
    #[serde(rename = "BonusEnemySlow")]
    EnemySlow,
    #[serde(rename = "BonusEnemyFast")]
    EnemyFast,
    #[serde(rename = "BonusEnemyBig")]
    EnemyBig,
    #[serde(rename = "BonusEnemyInverse")]
    EnemyInverse,
    #[serde(rename = "BonusAllBorderless")]
    AllBorderless,
    #[serde(rename = "BonusGameClear")]
    GameClear,
}

impl BonusKind {
    /// Every bonus kind, in table order — used to build the spawn-weight
    /// table and for exhaustiveness in tests.
    pub const ALL: [BonusKind; 11] = [
        BonusKind::SelfSmall,
        BonusKind::SelfBig,
        BonusKind::SelfMaster,
        BonusKind::SelfSlow,
        BonusKind::SelfFast,
        BonusKind::EnemySlow,
        BonusKind::EnemyFast,
        BonusKind::EnemyBig,
        BonusKind::EnemyInverse,
        BonusKind::AllBorderless,
        BonusKind::GameClear,
    ];
}

/// `bonus:pop` payload: a newly spawned bonus becomes visible.
#[derive(Debug, Clone, Serialize)]
pub struct BonusPopPayload {
    pub id: String,
    pub kind: BonusKind,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// `bonus:clear` payload: a bonus was consumed or expired.
#[derive(Debug, Clone, Serialize)]
pub struct BonusClearPayload {
    pub id: String,
}

/// One avatar's reset state at the start of a round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundNewEntry {
    pub avatar: String,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

/// `round:new` payload.
#[derive(Debug, Clone, Serialize)]
pub struct RoundNewPayload {
    pub round: u32,
    pub avatars: Vec<RoundNewEntry>,
}

/// One avatar's score delta at round end.
#[derive(Debug, Clone, Serialize)]
pub struct RoundEndEntry {
    pub avatar: String,
    pub round_score: u32,
    pub total_score: u32,
}

/// `round:end` payload.
#[derive(Debug, Clone, Serialize)]
pub struct RoundEndPayload {
    pub round: u32,
    pub scores: Vec<RoundEndEntry>,
}

/// `end` payload: match is over.
#[derive(Debug, Clone, Serialize)]
pub struct EndPayload {
    pub winner: Option<String>,
    pub reason: String,
}
