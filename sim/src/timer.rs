//! A small tick-counted timer list, adapted to key timers by an arbitrary
//! id type and to count down in simulation ticks rather than wall-clock
//! delta time — so results stay reproducible under a fixed step.

struct TimeEntry<K> {
    id: K,
    remaining_ticks: u32,
}

pub struct TickTimer<K> {
    entries: Vec<TimeEntry<K>>,
}

impl<K: PartialEq + Clone> Default for TickTimer<K> {
    fn default() -> Self {
        TickTimer { entries: Vec::new() }
    }
}

impl<K: PartialEq + Clone> TickTimer<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a timer for `id`. Overwrites any existing timer for the same
    /// id.
    pub fn start(&mut self, id: K, remaining_ticks: u32) {
        self.entries.retain(|e| e.id != id);
        self.entries.push(TimeEntry { id, remaining_ticks });
    }

    pub fn cancel(&mut self, id: &K) {
        self.entries.retain(|e| &e.id != id);
    }

    pub fn is_running(&self, id: &K) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }

    /// Advances every timer by one tick and returns the ids of timers that
    /// fired, removing them.
    pub fn tick(&mut self) -> Vec<K> {
        let mut fired = Vec::new();
        for entry in self.entries.iter_mut() {
            entry.remaining_ticks = entry.remaining_ticks.saturating_sub(1);
            if entry.remaining_ticks == 0 {
                fired.push(entry.id.clone());
            }
        }
        self.entries.retain(|e| e.remaining_ticks > 0);
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_fires_after_its_duration() {
        let mut timer = TickTimer::new();
        timer.start("warmup", 3);
        assert!(timer.tick().is_empty());
        assert!(timer.tick().is_empty());
        assert_eq!(timer.tick(), vec!["warmup"]);
        assert!(!timer.is_running(&"warmup"));
    }

    #[test]
    fn starting_the_same_id_again_resets_it() {
        let mut timer = TickTimer::new();
        timer.start("x", 1);
        timer.start("x", 5);
        assert!(timer.tick().is_empty());
        assert!(timer.is_running(&"x"));
    }

    #[test]
    fn cancel_removes_a_pending_timer() {
        let mut timer = TickTimer::new();
        timer.start("x", 5);
        timer.cancel(&"x");
        assert!(!timer.is_running(&"x"));
    }
}
