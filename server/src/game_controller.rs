//! Translates transport-level `player:move` requests into [`sim::Game`]
//! input. Kept separate from [`crate::room`] so the room's event loop reads
//! as lobby bookkeeping plus a call out to the simulation, not an inline
//! grab-bag of both.

use sim::Game;

/// Applies one player's turn input for the current tick. Clamped to the
/// `{-1, 0, 1}` the wire protocol allows; anything else is treated as no
/// turn at all rather than rejected, since a stray client can't otherwise
/// desync the room.
pub fn apply_move(game: &mut Game, avatar_id: &str, turn: i8) {
    let turn = turn.clamp(-1, 1);
    game.set_input(avatar_id, turn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim::GameSettings;

    #[test]
    fn out_of_range_turn_is_clamped() {
        let specs = vec![("av-0".to_string(), "s1".to_string(), "p1".to_string(), "red".to_string())];
        let settings = GameSettings { max_round_score: 10, bonuses_enabled: true, speed_units_per_sec: 15.0 };
        let mut game = Game::new(specs, settings, 1);
        apply_move(&mut game, "av-0", 5);
        apply_move(&mut game, "missing", 1);
    }
}
