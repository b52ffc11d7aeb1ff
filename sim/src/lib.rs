//! Deterministic tick-based simulation for the arena game: avatars, trails,
//! bonuses, broad-phase collision, and the round state machine.
//!
//! None of this crate touches a socket or an async runtime; `server` feeds
//! it player input and drains its outbound events once per tick.

mod avatar;
mod body;
mod bonus;
mod collection;
mod constants;
mod effects;
mod event_bus;
mod game;
mod timer;
mod world;

pub use avatar::{Avatar, AvatarTickOutcome, DeathCause};
pub use body::{Body, BodyData};
pub use bonus::{Affect, BonusEffectEvent, BonusManager};
pub use collection::{Collection, CollectionEvent, Identified};
pub use constants::{
    AVATAR_RADIUS, BOARD_SIZE, BONUS_DURATION_SECS, BONUS_LIFETIME_SECS, BONUS_RADIUS,
    BONUS_SPAWN_DELAY_MAX_SECS, BONUS_SPAWN_DELAY_MIN_SECS, DEFAULT_ANGULAR_VELOCITY,
    GAP_INTERVAL_TICKS, GRID_CELL_SIZE, MIN_PRINT_STEP, POSITION_BROADCAST_HZ,
    PRINT_INTERVAL_TICKS, PRINT_WIDTH_FACTOR, ROUND_END_SECS, TICK_DT, TICK_HZ,
    TICKS_PER_POSITION_BROADCAST, TRAIL_GRACE_WINDOW, WARMUP_SECS, secs_to_ticks,
};
pub use effects::{ActiveEffect, AvatarModifiers, EffectKind, EffectStack};
pub use event_bus::{EventBus, QueuedEvent, event_with_ack};
pub use game::{Game, GameSettings, MatchEnd};
pub use timer::TickTimer;
pub use world::World;
