//! Spawns, expires, and applies bonuses: board pickups that mutate
//! per-avatar movement stats or clear the board.

use crate::body::BodyData;
use crate::constants::{
    BONUS_LIFETIME_SECS, BONUS_RADIUS, BONUS_SPAWN_DELAY_MAX_SECS, BONUS_SPAWN_DELAY_MIN_SECS,
    secs_to_ticks,
};
use crate::effects::EffectKind;
use crate::world::World;
use protocol::BonusKind;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Who a bonus's effect targets when collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affect {
    SelfOnly,
    Opponents,
    All,
}

fn affect_for(kind: BonusKind) -> Affect {
    match kind {
        BonusKind::SelfSmall
        | BonusKind::SelfBig
        | BonusKind::SelfMaster
        | BonusKind::SelfSlow
        | BonusKind::SelfFast => Affect::SelfOnly,
        BonusKind::EnemySlow | BonusKind::EnemyFast | BonusKind::EnemyBig | BonusKind::EnemyInverse => {
            Affect::Opponents
        }
        BonusKind::AllBorderless | BonusKind::GameClear => Affect::All,
    }
}

struct LiveBonus {
    kind: BonusKind,
    ticks_remaining: u32,
}

/// Something the Game must do in response to a bonus event this tick. A
/// bonus's public identity is its World body id: there's no separate
/// bonus id to keep in sync with it.
pub enum BonusEffectEvent {
    Spawned { body_id: u64, kind: BonusKind, x: f64, y: f64 },
    Expired { body_id: u64 },
    /// `body_id` was collected by `collector_avatar_id`; apply `kind`'s
    /// effect to `collector_avatar_id` (self), every other avatar
    /// (opponents/all), or trigger the board-clear for `GameClear`.
    Collected { body_id: u64, kind: BonusKind, affect: Affect, collector_avatar_id: String },
}

pub struct BonusManager {
    enabled: bool,
    live: HashMap<u64, LiveBonus>,
    next_spawn_in_ticks: u32,
}

impl BonusManager {
    pub fn new(enabled: bool, rng: &mut impl Rng) -> Self {
        BonusManager { enabled, live: HashMap::new(), next_spawn_in_ticks: roll_spawn_delay_ticks(rng) }
    }

    pub fn clear(&mut self, world: &mut World) {
        for (body_id, _) in self.live.drain() {
            world.remove(body_id);
        }
    }

    /// Advances bonus timers by one tick, spawning a new bonus or expiring
    /// stale ones as needed.
    pub fn tick(
        &mut self,
        world: &mut World,
        board_size: f64,
        rng: &mut impl Rng,
    ) -> Vec<BonusEffectEvent> {
        let mut events = Vec::new();
        if !self.enabled {
            return events;
        }

        let mut expired_ids = Vec::new();
        for (id, bonus) in self.live.iter_mut() {
            bonus.ticks_remaining = bonus.ticks_remaining.saturating_sub(1);
            if bonus.ticks_remaining == 0 {
                expired_ids.push(*id);
            }
        }
        for body_id in expired_ids {
            self.live.remove(&body_id);
            world.remove(body_id);
            events.push(BonusEffectEvent::Expired { body_id });
        }

        self.next_spawn_in_ticks = self.next_spawn_in_ticks.saturating_sub(1);
        if self.next_spawn_in_ticks == 0 {
            self.next_spawn_in_ticks = roll_spawn_delay_ticks(rng);
            if let Some((x, y)) = sample_free_position(world, board_size, rng) {
                let kind = BonusKind::ALL[rng.gen_range(0..BonusKind::ALL.len())];
                let body_id = world.insert(x, y, BONUS_RADIUS, BodyData::Bonus);
                self.live
                    .insert(body_id, LiveBonus { kind, ticks_remaining: secs_to_ticks(BONUS_LIFETIME_SECS) });
                events.push(BonusEffectEvent::Spawned { body_id, kind, x, y });
            }
        }

        events
    }

    /// Called when an avatar's tick reported picking up the bonus at
    /// `body_id`. Removes it from the world and returns the collection
    /// event.
    pub fn collect(
        &mut self,
        body_id: u64,
        collector_avatar_id: &str,
        world: &mut World,
    ) -> Option<BonusEffectEvent> {
        let bonus = self.live.remove(&body_id)?;
        world.remove(body_id);
        Some(BonusEffectEvent::Collected {
            body_id,
            kind: bonus.kind,
            affect: affect_for(bonus.kind),
            collector_avatar_id: collector_avatar_id.to_string(),
        })
    }
}

fn roll_spawn_delay_ticks(rng: &mut impl Rng) -> u32 {
    let secs = rng.gen_range(BONUS_SPAWN_DELAY_MIN_SECS..=BONUS_SPAWN_DELAY_MAX_SECS);
    secs_to_ticks(secs).max(1)
}

/// Samples a position uniformly on the board, retrying a bounded number of
/// times if it overlaps an existing body.
fn sample_free_position(world: &World, board_size: f64, rng: &mut impl Rng) -> Option<(f64, f64)> {
    const MAX_ATTEMPTS: u32 = 20;
    for _ in 0..MAX_ATTEMPTS {
        let x = rng.gen_range(BONUS_RADIUS..=(board_size - BONUS_RADIUS));
        let y = rng.gen_range(BONUS_RADIUS..=(board_size - BONUS_RADIUS));
        if world.get_body(x, y, BONUS_RADIUS, &HashSet::new()).is_none() {
            return Some((x, y));
        }
    }
    None
}

/// Converts a bonus kind to its per-avatar [`EffectKind`] and duration, or
/// `None` for instant, non-timed bonuses like [`BonusKind::GameClear`].
pub fn effect_for(kind: BonusKind, duration_ticks: u32) -> Option<(EffectKind, u32)> {
    EffectKind::from_bonus(kind).map(|effect| (effect, duration_ticks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GRID_CELL_SIZE;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn disabled_manager_never_spawns() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut manager = BonusManager::new(false, &mut rng);
        let mut world = World::new(GRID_CELL_SIZE);
        for _ in 0..10_000 {
            let events = manager.tick(&mut world, 100.0, &mut rng);
            assert!(events.is_empty());
        }
        assert!(world.is_empty());
    }

    #[test]
    fn enabled_manager_eventually_spawns_a_bonus() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut manager = BonusManager::new(true, &mut rng);
        let mut world = World::new(GRID_CELL_SIZE);
        let mut spawned = false;
        for _ in 0..secs_to_ticks(BONUS_SPAWN_DELAY_MAX_SECS) + 10 {
            let events = manager.tick(&mut world, 100.0, &mut rng);
            if events.iter().any(|e| matches!(e, BonusEffectEvent::Spawned { .. })) {
                spawned = true;
                break;
            }
        }
        assert!(spawned);
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn collecting_a_bonus_removes_it_from_the_world() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut manager = BonusManager::new(true, &mut rng);
        let mut world = World::new(GRID_CELL_SIZE);
        let mut spawned_id = None;
        for _ in 0..secs_to_ticks(BONUS_SPAWN_DELAY_MAX_SECS) + 10 {
            for event in manager.tick(&mut world, 100.0, &mut rng) {
                if let BonusEffectEvent::Spawned { body_id, .. } = event {
                    spawned_id = Some(body_id);
                }
            }
            if spawned_id.is_some() {
                break;
            }
        }
        let body_id = spawned_id.expect("a bonus should have spawned");
        let event = manager.collect(body_id, "a1", &mut world);
        assert!(event.is_some());
        assert!(world.is_empty());
    }
}
