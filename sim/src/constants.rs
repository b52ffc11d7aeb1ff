//! Numeric constants for the simulation. These values are not externally
//! observable contracts, just the tuning this implementation settled on;
//! this module is the single place they're published.

/// Board side length in world-units.
pub const BOARD_SIZE: f64 = 100.0;

/// Avatar collision radius in world-units.
pub const AVATAR_RADIUS: f64 = 0.6;

/// Trail body radius as a multiple of the avatar radius.
pub const PRINT_WIDTH_FACTOR: f64 = 0.9;

/// Fixed simulation step: 60 Hz.
pub const TICK_HZ: f64 = 60.0;
pub const TICK_DT: f64 = 1.0 / TICK_HZ;

/// Position broadcast decimation: ~20 Hz.
pub const POSITION_BROADCAST_HZ: f64 = 20.0;
pub const TICKS_PER_POSITION_BROADCAST: u32 = (TICK_HZ / POSITION_BROADCAST_HZ) as u32;

/// Default avatar angular velocity, radians/second. `Avatar::tick` applies
/// `Δt` itself, so this (like `base_velocity`) is stored per-second, not
/// per-tick — storing a per-tick quantity here and then multiplying by `dt`
/// again in `Avatar::tick` would apply `Δt` twice.
pub const DEFAULT_ANGULAR_VELOCITY: f64 = 3.2;

/// Minimum distance an avatar must travel while printing before a new trail
/// body is deposited.
pub const MIN_PRINT_STEP: f64 = AVATAR_RADIUS * 0.5;

/// Number of most-recently-deposited trail bodies excluded from an avatar's
/// own-trail collision check — the "grace window" that keeps a turning
/// avatar from clipping its own freshly laid trail.
pub const TRAIL_GRACE_WINDOW: usize = 12;

/// Printing/gap toggle timing distributions.
pub const PRINT_INTERVAL_TICKS: f64 = 150.0;
pub const GAP_INTERVAL_TICKS: f64 = 10.0;

/// Bonus subsystem constants.
pub const BONUS_DURATION_SECS: f64 = 7.5;
pub const BONUS_LIFETIME_SECS: f64 = 8.0;
pub const BONUS_SPAWN_DELAY_MIN_SECS: f64 = 3.0;
pub const BONUS_SPAWN_DELAY_MAX_SECS: f64 = 10.0;
pub const BONUS_RADIUS: f64 = AVATAR_RADIUS * 1.5;

/// Round lifecycle timers.
pub const WARMUP_SECS: f64 = 3.0;
pub const ROUND_END_SECS: f64 = 2.0;

/// World spatial grid cell size: must be >= 2x the largest body radius in
/// play. Bonus bodies are the largest static bodies.
pub const GRID_CELL_SIZE: f64 = BONUS_RADIUS * 2.5;

pub fn secs_to_ticks(secs: f64) -> u32 {
    (secs * TICK_HZ).round() as u32
}
