//! Main game state structure

use crate::core::{
    Card, CardDefinition, CardId, EntityId, EntityStore, Keyword, Player, PlayerId,
};
use crate::game::config::EngineConfig;
use crate::game::triggers::TriggerManager;
use crate::game::{CombatState, GameLogger, PrioritySystem, Stack, TurnStructure};
use crate::journal::{ActionJournal, GameAction};
use crate::zones::{CardZone, PlayerZones, Zone};
use crate::{MtgError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::sync::Arc;

/// Complete game state
///
/// This is the authoritative state owned by the engine. Callers outside the
/// engine see it only through `StateSnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub config: EngineConfig,

    /// All cards in the game
    pub cards: EntityStore<Card>,

    /// All players in turn order (Vec for stable ordering, small count)
    pub players: Vec<Player>,

    /// Zones for each player
    pub player_zones: Vec<(PlayerId, PlayerZones)>,

    /// Shared battlefield (all players)
    pub battlefield: CardZone,

    pub stack: Stack,

    pub turn: TurnStructure,

    pub priority: PrioritySystem,

    /// Combat state (active during the combat phase)
    pub combat: CombatState,

    pub triggers: TriggerManager,

    /// Game RNG, serialized with the state for deterministic replay
    ///
    /// In a RefCell so shuffles can happen behind `&self` borrows.
    pub rng: RefCell<ChaCha12Rng>,

    /// Unified entity ID generator (shared across all entity types)
    next_entity_id: u32,

    pub journal: ActionJournal,

    pub logger: GameLogger,

    /// Set once the game has ended
    pub game_over: bool,

    pub winner: Option<PlayerId>,
}

impl GameState {
    /// Create a game with the given players in turn order
    pub fn new(player_names: &[&str], config: EngineConfig) -> Self {
        let mut next_id = 0;
        let mut players = Vec::with_capacity(player_names.len());
        let mut player_zones = Vec::with_capacity(player_names.len());

        for name in player_names {
            let id = PlayerId::new(next_id);
            next_id += 1;
            players.push(Player::new(id, *name, config.starting_life));
            player_zones.push((id, PlayerZones::new(id)));
        }

        let first = players.first().map(|p| p.id).unwrap_or(PlayerId::new(0));
        let rng = ChaCha12Rng::seed_from_u64(config.seed);
        let logger = GameLogger::with_verbosity(config.verbosity);

        GameState {
            config,
            cards: EntityStore::new(),
            players,
            player_zones,
            battlefield: CardZone::new(Zone::Battlefield, None),
            stack: Stack::new(),
            turn: TurnStructure::new_with_idx(first, 0),
            priority: PrioritySystem::new(),
            combat: CombatState::new(),
            triggers: TriggerManager::new(),
            rng: RefCell::new(rng),
            next_entity_id: next_id,
            journal: ActionJournal::new(),
            logger,
            game_over: false,
            winner: None,
        }
    }

    /// Create a two-player game with default rules
    pub fn new_two_player(player1_name: &str, player2_name: &str, starting_life: i32) -> Self {
        Self::new(
            &[player1_name, player2_name],
            EngineConfig::default().with_starting_life(starting_life),
        )
    }

    /// Reseed the game RNG
    pub fn seed_rng(&mut self, seed: u64) {
        *self.rng.borrow_mut() = ChaCha12Rng::seed_from_u64(seed);
    }

    /// Get next entity ID (unified across all entity types)
    pub fn next_id<T>(&mut self) -> EntityId<T> {
        let id = EntityId::new(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    pub fn next_card_id(&mut self) -> CardId {
        self.next_id()
    }

    /// Create a card instance in its owner's library
    pub fn create_card_in_library(
        &mut self,
        definition: Arc<CardDefinition>,
        owner: PlayerId,
    ) -> Result<CardId> {
        let card_id = self.next_card_id();
        let card = Card::new(card_id, definition, owner);
        self.get_player_zones_mut(owner)
            .ok_or(MtgError::EntityNotFound(owner.as_u32()))?
            .library
            .add(card_id);
        self.cards.insert(card_id, card);
        Ok(card_id)
    }

    /// Create a card instance directly in a hand (setup and tests)
    pub fn create_card_in_hand(
        &mut self,
        definition: Arc<CardDefinition>,
        owner: PlayerId,
    ) -> Result<CardId> {
        let card_id = self.create_card_in_library(definition, owner)?;
        self.move_card(card_id, Zone::Hand)?;
        Ok(card_id)
    }

    pub fn get_player_zones(&self, player_id: PlayerId) -> Option<&PlayerZones> {
        self.player_zones
            .iter()
            .find(|(id, _)| *id == player_id)
            .map(|(_, zones)| zones)
    }

    pub fn get_player_zones_mut(&mut self, player_id: PlayerId) -> Option<&mut PlayerZones> {
        self.player_zones
            .iter_mut()
            .find(|(id, _)| *id == player_id)
            .map(|(_, zones)| zones)
    }

    pub fn get_player(&self, id: PlayerId) -> Result<&Player> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or(MtgError::EntityNotFound(id.as_u32()))
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(MtgError::EntityNotFound(id.as_u32()))
    }

    pub fn get_player_idx(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn player_name(&self, id: PlayerId) -> &str {
        self.get_player(id).map(|p| p.name.as_str()).unwrap_or("?")
    }

    pub fn card_name(&self, id: CardId) -> &str {
        self.cards.get(id).map(|c| c.name().as_str()).unwrap_or("?")
    }

    /// Players still in the game, in turn order starting after the seat
    /// at `start_idx` wraps around
    pub fn alive_players_from(&self, start_idx: usize) -> Vec<PlayerId> {
        let n = self.players.len();
        (0..n)
            .map(|offset| &self.players[(start_idx + offset) % n])
            .filter(|p| p.is_alive())
            .map(|p| p.id)
            .collect()
    }

    /// Players still in the game, starting with the active player (APNAP order)
    pub fn apnap_order(&self) -> Vec<PlayerId> {
        self.alive_players_from(self.turn.active_player_idx)
    }

    pub fn opponents_of(&self, player: PlayerId) -> Vec<PlayerId> {
        self.apnap_order()
            .into_iter()
            .filter(|p| *p != player)
            .collect()
    }

    pub fn hand(&self, player: PlayerId) -> &[CardId] {
        self.get_player_zones(player)
            .map(|z| z.hand.cards.as_slice())
            .unwrap_or(&[])
    }

    pub fn library_size(&self, player: PlayerId) -> usize {
        self.get_player_zones(player)
            .map(|z| z.library.len())
            .unwrap_or(0)
    }

    /// Permanents a player controls, in battlefield order
    pub fn permanents_controlled_by(&self, player: PlayerId) -> Vec<CardId> {
        self.battlefield
            .iter()
            .filter(|id| self.cards.get(*id).is_ok_and(|c| c.controller == player))
            .collect()
    }

    /// Keyword check including Aura and Equipment grants
    pub fn has_keyword(&self, card_id: CardId, keyword: Keyword) -> bool {
        let Ok(card) = self.cards.get(card_id) else {
            return false;
        };
        if card.has_keyword(keyword) {
            return true;
        }
        card.zone == Zone::Battlefield
            && self.attachments_of(card_id).any(|attachment| {
                attachment
                    .definition
                    .attached_buff
                    .as_ref()
                    .is_some_and(|buff| buff.keywords.contains(&keyword))
            })
    }

    /// A creature that came under its controller's control this turn can't
    /// attack or use `{T}` abilities unless it has haste from any source
    pub fn is_summoning_sick(&self, card_id: CardId) -> bool {
        self.cards.get(card_id).is_ok_and(|card| {
            card.is_creature()
                && card.arrived_this_turn(self.turn.turn_number)
                && !self.has_keyword(card_id, Keyword::Haste)
        })
    }

    /// Printed, end-of-turn and attachment-granted keywords, without repeats
    pub fn keywords_of(&self, card_id: CardId) -> Vec<Keyword> {
        let Ok(card) = self.cards.get(card_id) else {
            return Vec::new();
        };
        let granted = self
            .attachments_of(card_id)
            .filter_map(|attachment| attachment.definition.attached_buff.as_ref())
            .flat_map(|buff| buff.keywords.iter());
        let mut keywords: Vec<Keyword> = Vec::new();
        for &k in card
            .definition
            .keywords
            .iter()
            .chain(card.eot_keywords.iter())
            .chain(granted)
        {
            if !keywords.contains(&k) {
                keywords.push(k);
            }
        }
        keywords
    }

    fn attachments_of(&self, card_id: CardId) -> impl Iterator<Item = &Card> + '_ {
        self.battlefield
            .iter()
            .filter_map(|id| self.cards.get(id).ok())
            .filter(move |c| c.attached_to == Some(card_id))
    }

    fn attachment_bonus(&self, card_id: CardId) -> (i32, i32) {
        self.attachments_of(card_id)
            .filter_map(|c| c.definition.attached_buff.as_ref())
            .fold((0, 0), |(p, t), buff| (p + buff.power, t + buff.toughness))
    }

    /// Power including counters, until-end-of-turn effects and attachments
    pub fn effective_power(&self, card_id: CardId) -> i32 {
        self.cards
            .get(card_id)
            .map(|c| c.current_power() + self.attachment_bonus(card_id).0)
            .unwrap_or(0)
    }

    pub fn effective_toughness(&self, card_id: CardId) -> i32 {
        self.cards
            .get(card_id)
            .map(|c| c.current_toughness() + self.attachment_bonus(card_id).1)
            .unwrap_or(0)
    }

    /// Sorcery timing: the player is active, holds priority, the stack is
    /// empty, and it is a main phase
    pub fn can_cast_sorcery_speed(&self, player: PlayerId) -> bool {
        self.turn.active_player == player
            && self.priority.holder() == Some(player)
            && self.stack.is_empty()
            && self.turn.current_step.is_sorcery_speed()
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn get_winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// End the game if at most one player remains
    pub(crate) fn check_game_over(&mut self) {
        if self.game_over {
            return;
        }
        let alive: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| p.id)
            .collect();
        if alive.len() <= 1 {
            self.game_over = true;
            self.winner = alive.first().copied();
            self.priority.clear();
            self.journal.log(GameAction::GameOver {
                winner: self.winner,
            });
            match self.winner {
                Some(winner) => self.logger.log(
                    crate::game::VerbosityLevel::Minimal,
                    Some(crate::game::LogCategory::GameOver),
                    format_args!("{} wins the game", self.player_name(winner)),
                ),
                None => self.logger.log(
                    crate::game::VerbosityLevel::Minimal,
                    Some(crate::game::LogCategory::GameOver),
                    format_args!("The game is a draw"),
                ),
            }
        }
    }

    /// Every card is in exactly one zone and its `zone` field agrees
    pub fn verify_zone_uniqueness(&self) -> Result<()> {
        let mut seen = rustc_hash::FxHashMap::default();
        let mut record = |card: CardId, zone: Zone| -> Result<()> {
            if let Some(previous) = seen.insert(card, zone) {
                return Err(MtgError::InvariantViolation(format!(
                    "card {card} is in both {previous} and {zone}"
                )));
            }
            Ok(())
        };

        for (_, zones) in &self.player_zones {
            for zone in zones.all() {
                for card in zone.iter() {
                    record(card, zone.zone_type)?;
                }
            }
        }
        for card in self.battlefield.iter() {
            record(card, Zone::Battlefield)?;
        }
        for item in self.stack.iter() {
            if let Some(card) = item.spell_card() {
                record(card, Zone::Stack)?;
            }
        }

        for (id, card) in self.cards.iter() {
            match seen.get(id) {
                Some(zone) if *zone == card.zone => {}
                Some(zone) => {
                    return Err(MtgError::InvariantViolation(format!(
                        "card {id} is listed in {zone} but records {}",
                        card.zone
                    )))
                }
                None => {
                    return Err(MtgError::InvariantViolation(format!(
                        "card {id} is in no zone"
                    )))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManaCost;

    fn bear() -> Arc<CardDefinition> {
        Arc::new(
            CardDefinition::new("Grizzly Bears", ManaCost::parse("1G").unwrap()).creature(2, 2),
        )
    }

    #[test]
    fn test_new_game() {
        let game = GameState::new_two_player("Alice", "Bob", 20);
        assert_eq!(game.players.len(), 2);
        assert_eq!(game.players[0].life, 20);
        assert_eq!(game.turn.turn_number, 1);
        assert!(!game.is_game_over());
        assert_eq!(game.apnap_order().len(), 2);
    }

    #[test]
    fn test_card_creation_and_uniqueness() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let card = game.create_card_in_library(bear(), alice).unwrap();
        assert_eq!(game.library_size(alice), 1);
        assert_eq!(game.cards.get(card).unwrap().zone, Zone::Library);
        game.verify_zone_uniqueness().unwrap();

        // Corrupt the state: same card listed twice
        game.battlefield.add(card);
        assert!(game.verify_zone_uniqueness().is_err());
    }

    #[test]
    fn test_apnap_order_skips_eliminated() {
        let mut game = GameState::new(&["A", "B", "C"], EngineConfig::default());
        let ids: Vec<_> = game.players.iter().map(|p| p.id).collect();
        game.turn.active_player_idx = 1;
        game.turn.active_player = ids[1];
        assert_eq!(game.apnap_order(), vec![ids[1], ids[2], ids[0]]);

        game.players[2].has_lost = true;
        assert_eq!(game.apnap_order(), vec![ids[1], ids[0]]);
        assert_eq!(game.opponents_of(ids[1]), vec![ids[0]]);
    }
}
