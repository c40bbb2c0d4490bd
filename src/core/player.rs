//! Player representation

use crate::core::{GameEntity, ManaPool, PlayerId, PlayerName};
use serde::{Deserialize, Serialize};

/// Why a player left the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReason {
    ZeroLife,
    Poison,
    DrewFromEmptyLibrary,
}

/// Represents a player in the game
///
/// Players are never removed from the game state; an eliminated player keeps
/// their entry with `has_lost` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,

    pub name: PlayerName,

    pub life: i32,

    pub poison_counters: u32,

    pub mana_pool: ManaPool,

    /// Has the player lost? Set only by state-based actions
    pub has_lost: bool,

    pub loss_reason: Option<LossReason>,

    /// Lands played this turn
    pub lands_played_this_turn: u8,

    /// Maximum lands per turn (usually 1)
    pub max_lands_per_turn: u8,

    /// Attempted to draw from an empty library since the last SBA check
    pub drew_from_empty_library: bool,

    /// Mulligans taken so far
    pub mulligans_taken: u32,

    /// Still deciding on the opening hand
    pub deciding_mulligan: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<PlayerName>, starting_life: i32) -> Self {
        Player {
            id,
            name: name.into(),
            life: starting_life,
            poison_counters: 0,
            mana_pool: ManaPool::new(),
            has_lost: false,
            loss_reason: None,
            lands_played_this_turn: 0,
            max_lands_per_turn: 1,
            drew_from_empty_library: false,
            mulligans_taken: 0,
            deciding_mulligan: false,
        }
    }

    pub fn gain_life(&mut self, amount: i32) {
        self.life += amount;
    }

    pub fn lose_life(&mut self, amount: i32) {
        self.life -= amount;
    }

    pub fn can_play_land(&self) -> bool {
        self.lands_played_this_turn < self.max_lands_per_turn
    }

    pub fn play_land(&mut self) {
        self.lands_played_this_turn += 1;
    }

    pub fn reset_lands_played(&mut self) {
        self.lands_played_this_turn = 0;
    }

    pub fn empty_mana_pool(&mut self) {
        self.mana_pool.clear();
    }

    pub fn is_alive(&self) -> bool {
        !self.has_lost
    }

    pub fn eliminate(&mut self, reason: LossReason) {
        self.has_lost = true;
        self.loss_reason = Some(reason);
    }
}

impl GameEntity<Player> for Player {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_creation() {
        let id = PlayerId::new(1);
        let player = Player::new(id, "Alice", 20);

        assert_eq!(player.id, id);
        assert_eq!(player.name.as_str(), "Alice");
        assert_eq!(player.life, 20);
        assert_eq!(player.poison_counters, 0);
        assert!(player.is_alive());
    }

    #[test]
    fn test_player_life() {
        let id = PlayerId::new(1);
        let mut player = Player::new(id, "Bob", 20);

        player.lose_life(25);
        assert_eq!(player.life, -5);
        // Losing happens through state-based actions, not here
        assert!(player.is_alive());

        player.eliminate(LossReason::ZeroLife);
        assert!(player.has_lost);
        assert_eq!(player.loss_reason, Some(LossReason::ZeroLife));
    }

    #[test]
    fn test_land_playing() {
        let id = PlayerId::new(1);
        let mut player = Player::new(id, "Charlie", 20);

        assert!(player.can_play_land());
        player.play_land();
        assert!(!player.can_play_land());

        player.reset_lands_played();
        assert!(player.can_play_land());
    }
}
