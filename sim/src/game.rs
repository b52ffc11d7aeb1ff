//! The active round simulation: tick loop, collision resolution, scoring,
//! and the Warmup/Running/RoundEnd/NewRound state machine.

use crate::avatar::{Avatar, DeathCause};
use crate::body::BodyData;
use crate::bonus::{Affect, BonusEffectEvent, BonusManager};
use crate::collection::{Collection, CollectionEvent};
use crate::constants::{
    AVATAR_RADIUS, BOARD_SIZE, BONUS_DURATION_SECS, DEFAULT_ANGULAR_VELOCITY, GRID_CELL_SIZE,
    ROUND_END_SECS, TICKS_PER_POSITION_BROADCAST, WARMUP_SECS, secs_to_ticks,
};
use crate::event_bus::EventBus;
use crate::timer::TickTimer;
use crate::world::World;
use protocol::{
    AvatarDiePayload, BonusClearPayload, BonusPopPayload, EndPayload, PositionEntry,
    RoundEndEntry, RoundEndPayload, RoundNewEntry, RoundNewPayload, EVENT_ANGLE, EVENT_AVATAR_DIE,
    EVENT_BONUS_CLEAR, EVENT_BONUS_POP, EVENT_END, EVENT_POSITION, EVENT_ROUND_END, EVENT_ROUND_NEW,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed configuration a room hands to a [`Game`] at match start; a subset
/// of [`protocol::RoomConfig`] relevant to simulation.
#[derive(Debug, Clone, Copy)]
pub struct GameSettings {
    pub max_round_score: u32,
    pub bonuses_enabled: bool,
    pub speed_units_per_sec: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Warmup,
    Running,
    RoundEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimerId {
    Warmup,
    RoundEnd,
}

/// A single completed match's final standing, once `end` fires.
#[derive(Debug, Clone)]
pub struct MatchEnd {
    pub winner: Option<String>,
    pub reason: String,
}

pub struct Game {
    pub avatars: Collection<Avatar>,
    world: World,
    bonuses: BonusManager,
    settings: GameSettings,
    rng: StdRng,
    timers: TickTimer<TimerId>,
    phase: Phase,
    round: u32,
    tick_count: u64,
    /// `(avatar_id, tick_count)` for every avatar that has died this round,
    /// in the order they died. Scoring compares the recorded tick, not list
    /// position, so avatars killed in the same tick (e.g. a mutual head-on)
    /// tie rather than one being ranked ahead of the other.
    death_order: Vec<(String, u64)>,
    pub match_end: Option<MatchEnd>,
    events: EventBus,
}

impl Game {
    /// Creates a new game for the given avatars (already registered with
    /// ids/names/colors but not yet positioned) and a deterministic seed so
    /// print timing and bonus spawns are reproducible for a given seed.
    pub fn new(avatar_specs: Vec<(String, String, String, String)>, settings: GameSettings, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut world = World::new(GRID_CELL_SIZE);
        let mut avatars = Collection::new();

        for (avatar_id, player_id, name, color) in avatar_specs {
            let (x, y, angle) = random_spawn(&mut world, &mut rng);
            let body_id = world.insert(x, y, AVATAR_RADIUS, BodyData::Avatar { avatar_id: avatar_id.clone() });
            let avatar = Avatar::new(
                avatar_id,
                player_id,
                name,
                color,
                x,
                y,
                angle,
                settings.speed_units_per_sec,
                DEFAULT_ANGULAR_VELOCITY,
                body_id,
            );
            avatars.add(avatar);
        }

        let bonuses = BonusManager::new(settings.bonuses_enabled, &mut rng);

        let mut timers = TickTimer::new();
        timers.start(TimerId::Warmup, secs_to_ticks(WARMUP_SECS));

        Game {
            avatars,
            world,
            bonuses,
            settings,
            rng,
            timers,
            phase: Phase::Warmup,
            round: 1,
            tick_count: 0,
            death_order: Vec::new(),
            match_end: None,
            events: EventBus::new(),
        }
    }

    pub fn is_over(&self) -> bool {
        self.match_end.is_some()
    }

    /// Records the latest `{avatar, move}` input; stale inputs from a prior
    /// tick are overwritten, never queued.
    pub fn set_input(&mut self, avatar_id: &str, turn: i8) {
        if let Some(avatar) = self.avatars.get_mut(avatar_id) {
            avatar.input_turn = turn.clamp(-1, 1);
        }
    }

    /// Advances the game by exactly one tick, regardless of wall-clock
    /// elapsed time, and returns the outbound events queued for broadcast.
    pub fn tick(&mut self, dt: f64) -> Vec<protocol::OutboundItem> {
        if self.match_end.is_some() {
            return Vec::new();
        }

        for fired in self.timers.tick() {
            match fired {
                TimerId::Warmup => self.start_running(),
                TimerId::RoundEnd => self.start_new_round(),
            }
        }

        if self.phase == Phase::Running {
            self.tick_count += 1;
            self.run_simulation_tick(dt);
            self.check_round_end();
        }

        self.events.drain()
    }

    fn start_running(&mut self) {
        self.phase = Phase::Running;
        let avatars: Vec<RoundNewEntry> = self
            .avatars
            .items()
            .map(|a| RoundNewEntry { avatar: a.id.clone(), x: a.x, y: a.y, angle: a.angle })
            .collect();
        self.events.push_serde(EVENT_ROUND_NEW, &RoundNewPayload { round: self.round, avatars });
    }

    fn run_simulation_tick(&mut self, dt: f64) {
        let bonus_events = self.bonuses.tick(&mut self.world, BOARD_SIZE, &mut self.rng);
        for event in bonus_events {
            self.emit_bonus_event(event);
        }

        let ids: Vec<String> = self.avatars.ids().to_vec();
        let mut deaths = Vec::new();
        let mut pickups = Vec::new();
        let mut reposition = Vec::new();
        let mut new_trail = Vec::new();

        for id in &ids {
            let body_id = match self.avatars.get(id) {
                Some(avatar) if avatar.alive => avatar.body_id,
                _ => continue,
            };
            let avatar_mut = self.avatars.get_mut(id).unwrap();
            let outcome = avatar_mut.tick(dt, BOARD_SIZE, AVATAR_RADIUS, &self.world, &mut self.rng);
            let avatar = self.avatars.get(id).unwrap();

            if let Some(cause) = outcome.died {
                deaths.push((id.clone(), cause));
            } else {
                let radius = AVATAR_RADIUS * avatar.modifiers().radius_multiplier;
                reposition.push((body_id, avatar.x, avatar.y, radius));
            }
            if let Some((x, y)) = outcome.printed_trail_point {
                new_trail.push((id.clone(), x, y));
            }
            if let Some(bonus_id) = outcome.picked_up_bonus {
                pickups.push((id.clone(), bonus_id));
            }
        }

        for (body_id, x, y, radius) in &reposition {
            self.world.reposition_with_radius(*body_id, *x, *y, *radius);
        }

        for (avatar_id, x, y) in new_trail {
            let radius = AVATAR_RADIUS * crate::constants::PRINT_WIDTH_FACTOR;
            let trail_body = self.world.insert(
                x,
                y,
                radius,
                BodyData::Trail { avatar_id: avatar_id.clone(), sequence: self.tick_count },
            );
            if let Some(avatar) = self.avatars.get_mut(&avatar_id) {
                avatar.record_trail_body(trail_body);
            }
        }

        for (avatar_id, bonus_body_id) in pickups {
            if let Some(event) = self.bonuses.collect(bonus_body_id, &avatar_id, &mut self.world) {
                self.apply_collected_bonus(event);
            }
        }

        for (avatar_id, cause) in deaths {
            self.kill_avatar(&avatar_id, cause);
        }

        if self.tick_count % TICKS_PER_POSITION_BROADCAST as u64 == 0 {
            self.broadcast_positions();
        }
    }

    fn kill_avatar(&mut self, avatar_id: &str, _cause: DeathCause) {
        let Some(avatar) = self.avatars.get_mut(avatar_id) else { return };
        if !avatar.alive {
            // Already marked dead earlier this tick by a mutual collision.
            return;
        }
        avatar.alive = false;
        let (x, y, body_id) = (avatar.x, avatar.y, avatar.body_id);
        self.world.remove(body_id);
        self.death_order.push((avatar_id.to_string(), self.tick_count));
        self.events.push_serde(
            EVENT_AVATAR_DIE,
            &AvatarDiePayload { avatar: avatar_id.to_string(), x, y },
        );
    }

    fn emit_bonus_event(&mut self, event: BonusEffectEvent) {
        match event {
            BonusEffectEvent::Spawned { body_id, kind, x, y } => {
                self.events.push_serde(
                    EVENT_BONUS_POP,
                    &BonusPopPayload {
                        id: body_id.to_string(),
                        kind,
                        x,
                        y,
                        radius: crate::constants::BONUS_RADIUS,
                    },
                );
            }
            BonusEffectEvent::Expired { body_id } => {
                self.events
                    .push_serde(EVENT_BONUS_CLEAR, &BonusClearPayload { id: body_id.to_string() });
            }
            BonusEffectEvent::Collected { .. } => {
                // Collection is driven through `apply_collected_bonus`, not
                // surfaced directly by the manager's own tick.
            }
        }
    }

    fn apply_collected_bonus(&mut self, event: BonusEffectEvent) {
        let BonusEffectEvent::Collected { body_id, kind, affect, collector_avatar_id } = event else {
            return;
        };
        self.events
            .push_serde(EVENT_BONUS_CLEAR, &BonusClearPayload { id: body_id.to_string() });

        if matches!(kind, protocol::BonusKind::GameClear) {
            self.clear_all_trails();
            return;
        }

        let Some((effect_kind, duration_ticks)) =
            crate::bonus::effect_for(kind, secs_to_ticks(BONUS_DURATION_SECS))
        else {
            return;
        };

        let targets: Vec<String> = match affect {
            Affect::SelfOnly => vec![collector_avatar_id.clone()],
            Affect::Opponents => self
                .avatars
                .ids()
                .iter()
                .filter(|id| **id != collector_avatar_id)
                .cloned()
                .collect(),
            Affect::All => self.avatars.ids().to_vec(),
        };
        for target in targets {
            if let Some(avatar) = self.avatars.get_mut(&target) {
                avatar.apply_effect(effect_kind, duration_ticks);
            }
        }
    }

    fn clear_all_trails(&mut self) {
        let trail_ids: Vec<u64> =
            self.avatars.items().flat_map(|a| a.trail_body_ids().to_vec()).collect();
        for id in trail_ids {
            self.world.remove(id);
        }
        for avatar in self.avatars.items_mut() {
            avatar.record_trail_body_reset();
        }
    }

    fn broadcast_positions(&mut self) {
        for avatar in self.avatars.items() {
            if !avatar.alive {
                continue;
            }
            self.events.push_serde(
                EVENT_POSITION,
                &PositionEntry { avatar: avatar.id.clone(), x: avatar.x, y: avatar.y },
            );
            self.events.push_serde(EVENT_ANGLE, &(avatar.id.clone(), avatar.angle));
        }
    }

    fn check_round_end(&mut self) {
        let alive_count = self.avatars.items().filter(|a| a.alive).count();
        let total = self.avatars.len();
        let should_end = total > 1 && alive_count <= 1 || total <= 1 && alive_count == 0;
        if !should_end {
            return;
        }

        self.phase = Phase::RoundEnd;
        self.score_round();

        let max_score = self.avatars.items().map(|a| a.score).max().unwrap_or(0);
        if max_score >= self.settings.max_round_score {
            let winner = self
                .avatars
                .items()
                .max_by_key(|a| a.score)
                .map(|a| a.id.clone());
            self.match_end = Some(MatchEnd { winner: winner.clone(), reason: "score".into() });
            self.events
                .push_serde(EVENT_END, &EndPayload { winner, reason: "score".to_string() });
        } else {
            self.timers.start(TimerId::RoundEnd, secs_to_ticks(ROUND_END_SECS));
        }
    }

    /// Every avatar earns one point per opponent whose death *tick* is
    /// strictly earlier than its own; a still-alive avatar's death-time is
    /// treated as infinite, so it earns one point per dead opponent. Two
    /// avatars that died on the same tick (a mutual head-on) never count
    /// each other, so both score 0 from that collision.
    fn score_round(&mut self) {
        let death_ticks: std::collections::HashMap<String, u64> = self.death_order.iter().cloned().collect();

        let mut entries = Vec::new();
        for avatar in self.avatars.items_mut() {
            let my_death_tick = death_ticks.get(&avatar.id).copied();
            let earned = death_ticks
                .iter()
                .filter(|(id, their_tick)| {
                    id.as_str() != avatar.id
                        && match my_death_tick {
                            Some(mine) => **their_tick < mine,
                            None => true,
                        }
                })
                .count() as u32;
            avatar.round_score = earned;
            avatar.score += earned;
            entries.push(RoundEndEntry {
                avatar: avatar.id.clone(),
                round_score: avatar.round_score,
                total_score: avatar.score,
            });
        }

        self.events.push_serde(EVENT_ROUND_END, &RoundEndPayload { round: self.round, scores: entries });
        self.death_order.clear();
    }

    fn start_new_round(&mut self) {
        self.round += 1;
        self.bonuses.clear(&mut self.world);

        let ids: Vec<String> = self.avatars.ids().to_vec();
        for id in &ids {
            if let Some(old_body) = self.avatars.get(id).map(|a| a.body_id) {
                self.world.remove(old_body);
            }
        }
        for id in ids {
            let (x, y, angle) = random_spawn(&mut self.world, &mut self.rng);
            let Some(avatar) = self.avatars.get_mut(&id) else { continue };
            avatar.reset_for_round(x, y, angle);
            let new_body =
                self.world.insert(x, y, AVATAR_RADIUS, BodyData::Avatar { avatar_id: id.clone() });
            avatar.body_id = new_body;
        }

        self.phase = Phase::Warmup;
        self.timers.start(TimerId::Warmup, secs_to_ticks(WARMUP_SECS));
    }

    /// Drains id-level add/remove notifications from the avatar roster,
    /// e.g. to tell a newly joined spectator who's currently in play.
    pub fn drain_roster_events(&mut self) -> Vec<CollectionEvent> {
        self.avatars.drain_events()
    }
}

/// Samples a spawn position uniformly on the board, retrying until it
/// doesn't overlap any existing body, and a random heading.
fn random_spawn(world: &mut World, rng: &mut impl Rng) -> (f64, f64, f64) {
    const MAX_ATTEMPTS: u32 = 50;
    for _ in 0..MAX_ATTEMPTS {
        let x = rng.gen_range(AVATAR_RADIUS..=(BOARD_SIZE - AVATAR_RADIUS));
        let y = rng.gen_range(AVATAR_RADIUS..=(BOARD_SIZE - AVATAR_RADIUS));
        if world.get_body(x, y, AVATAR_RADIUS * 4.0, &Default::default()).is_none() {
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            return (x, y, angle);
        }
    }
    (BOARD_SIZE / 2.0, BOARD_SIZE / 2.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GameSettings {
        GameSettings { max_round_score: 10, bonuses_enabled: false, speed_units_per_sec: 15.0 }
    }

    fn two_player_game() -> Game {
        Game::new(
            vec![
                ("a1".into(), "p1".into(), "Alice".into(), "red".into()),
                ("a2".into(), "p2".into(), "Bob".into(), "blue".into()),
            ],
            settings(),
            1,
        )
    }

    #[test]
    fn warmup_transitions_to_running_after_its_timer() {
        let mut game = two_player_game();
        let ticks = secs_to_ticks(WARMUP_SECS);
        for _ in 0..ticks {
            game.tick(1.0 / 60.0);
        }
        assert_eq!(game.phase, Phase::Running);
    }

    #[test]
    fn a_lone_survivor_ends_the_round() {
        let mut game = two_player_game();
        for _ in 0..secs_to_ticks(WARMUP_SECS) {
            game.tick(1.0 / 60.0);
        }
        game.kill_avatar("a2", DeathCause::Wall);
        game.check_round_end();
        assert_eq!(game.phase, Phase::RoundEnd);
    }

    /// A mutual head-on: both avatars die on the same tick, so neither
    /// should be credited with outliving the other.
    #[test]
    fn mutual_same_tick_death_awards_zero_to_both() {
        let mut game = two_player_game();
        for _ in 0..secs_to_ticks(WARMUP_SECS) {
            game.tick(1.0 / 60.0);
        }
        game.kill_avatar("a1", DeathCause::Collision);
        game.kill_avatar("a2", DeathCause::Collision);
        game.check_round_end();
        assert_eq!(game.avatars.get("a1").unwrap().round_score, 0);
        assert_eq!(game.avatars.get("a2").unwrap().round_score, 0);
    }
}
