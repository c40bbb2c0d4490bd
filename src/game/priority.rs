//! Priority tracking
//!
//! One player holds priority at a time. Passing moves priority to the next
//! player in turn order; when every player still in the game has passed in
//! succession with no stack change in between, the top of the stack resolves
//! (or, with an empty stack, the step ends).

use crate::core::PlayerId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Result of a priority pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Priority moved on to this player
    NextPlayer(PlayerId),
    /// Everyone passed in succession
    AllPassed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrioritySystem {
    holder: Option<PlayerId>,

    /// Players who passed since the last stack change, in pass order
    passed: SmallVec<[PlayerId; 4]>,
}

impl PrioritySystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holder(&self) -> Option<PlayerId> {
        self.holder
    }

    pub fn has_passed(&self, player: PlayerId) -> bool {
        self.passed.contains(&player)
    }

    /// Fresh round: clear pass flags and give priority to `player`
    /// (the active player after a resolution or at the start of a step)
    pub fn reset(&mut self, player: PlayerId) {
        self.passed.clear();
        self.holder = Some(player);
    }

    /// Any stack mutation clears the pass flags; the acting player keeps
    /// priority
    pub fn on_stack_mutation(&mut self, actor: PlayerId) {
        self.reset(actor);
    }

    /// Nobody holds priority (Untap, Cleanup, pending declarations, game over)
    pub fn clear(&mut self) {
        self.passed.clear();
        self.holder = None;
    }

    /// Record a pass by the holder
    ///
    /// `turn_order` lists the players still in the game, in turn order.
    pub fn pass(&mut self, player: PlayerId, turn_order: &[PlayerId]) -> PassOutcome {
        if !self.passed.contains(&player) {
            self.passed.push(player);
        }

        let all_passed = turn_order.iter().all(|p| self.passed.contains(p));
        if all_passed {
            self.holder = None;
            return PassOutcome::AllPassed;
        }

        let start = turn_order.iter().position(|&p| p == player).unwrap_or(0);
        let next = (1..=turn_order.len())
            .map(|offset| turn_order[(start + offset) % turn_order.len()])
            .find(|p| !self.passed.contains(p));

        match next {
            Some(next) => {
                self.holder = Some(next);
                PassOutcome::NextPlayer(next)
            }
            None => {
                self.holder = None;
                PassOutcome::AllPassed
            }
        }
    }

    /// Drop an eliminated player from the pass bookkeeping
    pub fn remove_player(&mut self, player: PlayerId) {
        self.passed.retain(|p| *p != player);
        if self.holder == Some(player) {
            self.holder = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_player_round() {
        let (a, b) = (PlayerId::new(0), PlayerId::new(1));
        let order = [a, b];
        let mut priority = PrioritySystem::new();
        priority.reset(a);

        assert_eq!(priority.pass(a, &order), PassOutcome::NextPlayer(b));
        assert_eq!(priority.holder(), Some(b));
        assert_eq!(priority.pass(b, &order), PassOutcome::AllPassed);
        assert_eq!(priority.holder(), None);
    }

    #[test]
    fn test_stack_mutation_clears_passes() {
        let (a, b) = (PlayerId::new(0), PlayerId::new(1));
        let order = [a, b];
        let mut priority = PrioritySystem::new();
        priority.reset(a);

        priority.pass(a, &order);
        // b responds instead of passing
        priority.on_stack_mutation(b);
        assert!(!priority.has_passed(a));
        assert_eq!(priority.holder(), Some(b));

        assert_eq!(priority.pass(b, &order), PassOutcome::NextPlayer(a));
        assert_eq!(priority.pass(a, &order), PassOutcome::AllPassed);
    }

    #[test]
    fn test_three_players_in_turn_order() {
        let (a, b, c) = (PlayerId::new(0), PlayerId::new(1), PlayerId::new(2));
        let order = [a, b, c];
        let mut priority = PrioritySystem::new();
        priority.reset(b);

        assert_eq!(priority.pass(b, &order), PassOutcome::NextPlayer(c));
        assert_eq!(priority.pass(c, &order), PassOutcome::NextPlayer(a));
        assert_eq!(priority.pass(a, &order), PassOutcome::AllPassed);
    }
}
