//! One player's controllable entity: angle, velocity, printing state, and
//! the trail of bodies it leaves behind.

use crate::body::BodyData;
use crate::collection::Identified;
use crate::constants::{GAP_INTERVAL_TICKS, MIN_PRINT_STEP, PRINT_INTERVAL_TICKS, TRAIL_GRACE_WINDOW};
use crate::effects::{AvatarModifiers, EffectKind, EffectStack};
use crate::world::World;
use rand::Rng;
use std::collections::HashSet;

/// Why an avatar stopped being simulated this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Wall,
    Collision,
}

/// Outcome of advancing one avatar by one tick. Trail deposit is reported
/// as a position rather than a body id: the avatar borrows the [`World`]
/// immutably during `tick`, so inserting the new trail body — and telling
/// the avatar the id it got — is the caller's job via
/// [`Avatar::record_trail_body`].
#[derive(Debug, Clone)]
pub struct AvatarTickOutcome {
    pub died: Option<DeathCause>,
    pub printed_trail_point: Option<(f64, f64)>,
    pub picked_up_bonus: Option<u64>,
}

impl Default for AvatarTickOutcome {
    fn default() -> Self {
        AvatarTickOutcome { died: None, printed_trail_point: None, picked_up_bonus: None }
    }
}

pub struct Avatar {
    pub id: String,
    pub player_id: String,
    pub name: String,
    pub color: String,

    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub base_velocity: f64,
    pub angular_velocity: f64,

    pub printing: bool,
    printing_timeout: u32,
    last_printed_point: (f64, f64),
    /// Ids of this avatar's own trail bodies, oldest first.
    trail: Vec<u64>,

    pub effects: EffectStack,

    pub score: u32,
    pub round_score: u32,
    pub alive: bool,
    pub ready: bool,
    pub left_mid_game: bool,

    /// Id of this avatar's live collision body in the [`World`].
    pub body_id: u64,
    /// Latest `{turn}` input received from the client; held until replaced.
    pub input_turn: i8,
}

impl Identified for Avatar {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Avatar {
    pub fn new(
        id: String,
        player_id: String,
        name: String,
        color: String,
        x: f64,
        y: f64,
        angle: f64,
        base_velocity: f64,
        angular_velocity: f64,
        body_id: u64,
    ) -> Self {
        Avatar {
            id,
            player_id,
            name,
            color,
            x,
            y,
            angle,
            base_velocity,
            angular_velocity,
            printing: true,
            printing_timeout: PRINT_INTERVAL_TICKS as u32,
            last_printed_point: (x, y),
            trail: Vec::new(),
            effects: EffectStack::new(),
            score: 0,
            round_score: 0,
            alive: true,
            ready: false,
            left_mid_game: false,
            body_id,
            input_turn: 0,
        }
    }

    pub fn modifiers(&self) -> AvatarModifiers {
        self.effects.resolve()
    }

    /// Ids of the avatar's own trail bodies excluded from its self-collision
    /// check this tick: the most recently deposited [`TRAIL_GRACE_WINDOW`]
    /// bodies, so a turning avatar doesn't clip the neck it just laid down.
    fn grace_window_ids(&self) -> HashSet<u64> {
        let start = self.trail.len().saturating_sub(TRAIL_GRACE_WINDOW);
        self.trail[start..].iter().copied().collect()
    }

    /// Advances this avatar by one tick of duration `dt` (in the same time
    /// unit `base_velocity`/`angular_velocity` are expressed in). `world`
    /// must already reflect every other body's position for this tick;
    /// the caller is responsible for repositioning `body_id` afterward
    /// using the returned position.
    pub fn tick(
        &mut self,
        dt: f64,
        board_size: f64,
        base_radius: f64,
        world: &World,
        rng: &mut impl Rng,
    ) -> AvatarTickOutcome {
        let mut outcome = AvatarTickOutcome::default();
        if !self.alive {
            return outcome;
        }

        self.effects.tick();
        let modifiers = self.modifiers();
        let velocity = self.base_velocity * modifiers.velocity_multiplier;
        let angular_velocity = self.angular_velocity;
        let radius = base_radius * modifiers.radius_multiplier;

        let turn = if modifiers.inverse() { -self.input_turn } else { self.input_turn };
        self.angle += angular_velocity * turn as f64 * dt;

        self.x += self.angle.cos() * velocity * dt;
        self.y += self.angle.sin() * velocity * dt;

        if !modifiers.borderless {
            let out_of_bounds = self.x < radius
                || self.x > board_size - radius
                || self.y < radius
                || self.y > board_size - radius;
            if out_of_bounds && !modifiers.invincible {
                self.alive = false;
                outcome.died = Some(DeathCause::Wall);
                return outcome;
            }
        }

        if self.printing {
            let (lx, ly) = self.last_printed_point;
            let step = ((self.x - lx).powi(2) + (self.y - ly).powi(2)).sqrt();
            if step >= MIN_PRINT_STEP {
                let mid = ((self.x + lx) / 2.0, (self.y + ly) / 2.0);
                outcome.printed_trail_point = Some(mid);
                self.last_printed_point = (self.x, self.y);
            }
        }

        let exclude = {
            let mut e = self.grace_window_ids();
            e.insert(self.body_id);
            e
        };
        if let Some(hit) = world.get_body(self.x, self.y, radius, &exclude) {
            match &hit.data {
                BodyData::Bonus => {
                    outcome.picked_up_bonus = Some(hit.id);
                }
                BodyData::Avatar { .. } | BodyData::Trail { .. } => {
                    if !modifiers.invincible {
                        self.alive = false;
                        outcome.died = Some(DeathCause::Collision);
                        return outcome;
                    }
                }
            }
        }

        self.printing_timeout = self.printing_timeout.saturating_sub(1);
        if self.printing_timeout == 0 {
            self.printing = !self.printing;
            self.printing_timeout = next_print_timeout(self.printing, rng);
        }

        outcome
    }

    /// Records a trail body deposited this tick so future self-collision
    /// checks can exclude it within the grace window.
    pub fn record_trail_body(&mut self, body_id: u64) {
        self.trail.push(body_id);
    }

    /// Forgets all recorded trail body ids, e.g. after a board-clear bonus
    /// removes every trail body from the World.
    pub fn record_trail_body_reset(&mut self) {
        self.trail.clear();
    }

    pub fn apply_effect(&mut self, kind: EffectKind, duration_ticks: u32) {
        self.effects.push(kind, duration_ticks);
    }

    /// Resets this avatar for a new round: fresh position/angle, cleared
    /// trail and effects, round score zeroed.
    pub fn reset_for_round(&mut self, x: f64, y: f64, angle: f64) {
        self.x = x;
        self.y = y;
        self.angle = angle;
        self.last_printed_point = (x, y);
        self.trail.clear();
        self.effects.clear();
        self.printing = true;
        self.printing_timeout = PRINT_INTERVAL_TICKS as u32;
        self.round_score = 0;
        self.alive = true;
        self.input_turn = 0;
    }

    pub fn trail_body_ids(&self) -> &[u64] {
        &self.trail
    }
}

/// Draws the next printing-state toggle delay, in ticks, per the timing
/// distribution for the state being entered: printing gets a long interval
/// biased around [`PRINT_INTERVAL_TICKS`], gaps a short one around
/// [`GAP_INTERVAL_TICKS`].
fn next_print_timeout(printing: bool, rng: &mut impl Rng) -> u32 {
    let (lo, hi) = if printing {
        (PRINT_INTERVAL_TICKS * 0.25, PRINT_INTERVAL_TICKS * 0.75)
    } else {
        (GAP_INTERVAL_TICKS * 0.5, GAP_INTERVAL_TICKS * 1.5)
    };
    rng.gen_range(lo..=hi).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GRID_CELL_SIZE;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn avatar(x: f64, y: f64, angle: f64, velocity: f64) -> Avatar {
        Avatar::new(
            "a1".into(),
            "p1".into(),
            "Alice".into(),
            "red".into(),
            x,
            y,
            angle,
            velocity,
            3.2 / 60.0,
            1,
        )
    }

    #[test]
    fn straight_line_travel_moves_by_velocity_times_dt() {
        let world = World::new(GRID_CELL_SIZE);
        let mut a = avatar(10.0, 10.0, 0.0, 6.0);
        let mut r = rng();
        let outcome = a.tick(1.0 / 60.0, 100.0, 0.6, &world, &mut r);
        assert!(outcome.died.is_none());
        assert!((a.x - (10.0 + 6.0 / 60.0)).abs() < 1e-9);
        assert!((a.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn leaving_the_board_without_invincibility_kills_the_avatar() {
        let world = World::new(GRID_CELL_SIZE);
        let mut a = avatar(0.7, 50.0, std::f64::consts::PI, 15.0 / 60.0 * 60.0);
        let mut r = rng();
        let mut died = false;
        for _ in 0..20 {
            let outcome = a.tick(1.0 / 60.0, 100.0, 0.6, &world, &mut r);
            if outcome.died.is_some() {
                died = true;
                break;
            }
        }
        assert!(died);
        assert!(!a.alive);
    }

    #[test]
    fn borderless_modifier_prevents_wall_death() {
        let world = World::new(GRID_CELL_SIZE);
        let mut a = avatar(0.7, 50.0, std::f64::consts::PI, 15.0);
        a.apply_effect(EffectKind::Borderless, 1000);
        let mut r = rng();
        for _ in 0..20 {
            a.tick(1.0 / 60.0, 100.0, 0.6, &world, &mut r);
        }
        assert!(a.alive);
    }

    #[test]
    fn inverse_modifier_flips_turn_direction() {
        let world = World::new(GRID_CELL_SIZE);
        let mut a = avatar(50.0, 50.0, 0.0, 0.0);
        a.input_turn = 1;
        a.apply_effect(EffectKind::Inverse, 1000);
        let mut r = rng();
        let start_angle = a.angle;
        a.tick(1.0 / 60.0, 100.0, 0.6, &world, &mut r);
        assert!(a.angle < start_angle);
    }
}
