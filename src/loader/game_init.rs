//! Game initialization from decks
//!
//! Creates games from deck lists and a card data provider

use crate::core::PlayerId;
use crate::game::{EngineConfig, GameEngine, GameState};
use crate::loader::{builtin, CardDataProvider, CardDatabase, DeckList};
use crate::{MtgError, Result};

/// Game builder for initializing games from decks
pub struct GameInitializer<P: CardDataProvider = CardDatabase> {
    provider: P,
    config: EngineConfig,
}

impl GameInitializer<CardDatabase> {
    /// Initializer over the built-in card set
    pub fn builtin() -> Result<Self> {
        Ok(GameInitializer::new(CardDatabase::builtin()?))
    }

    /// Two-player game between built-in decks, ready to `start`
    pub fn two_player_game(
        &self,
        player1: &str,
        player2: &str,
        deck1: &str,
        deck2: &str,
        seed: u64,
    ) -> Result<GameEngine> {
        let decks = [builtin::builtin_deck(deck1)?, builtin::builtin_deck(deck2)?];
        let config = self.config.clone().with_seed(seed);
        let game = self.init_game_with_config(&[(player1, &decks[0]), (player2, &decks[1])], config)?;
        Ok(GameEngine::new(game))
    }
}

impl<P: CardDataProvider> GameInitializer<P> {
    pub fn new(provider: P) -> Self {
        GameInitializer {
            provider,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Build a game with one deck per player, in turn order
    pub fn init_game(&self, players: &[(&str, &DeckList)]) -> Result<GameState> {
        self.init_game_with_config(players, self.config.clone())
    }

    fn init_game_with_config(
        &self,
        players: &[(&str, &DeckList)],
        config: EngineConfig,
    ) -> Result<GameState> {
        if players.len() < 2 {
            return Err(MtgError::InvalidAction(
                "a game needs at least two players".to_string(),
            ));
        }
        let names: Vec<&str> = players.iter().map(|(name, _)| *name).collect();
        let mut game = GameState::new(&names, config);
        let ids: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();

        for (&player_id, (_, deck)) in ids.iter().zip(players) {
            self.load_deck_into_game(&mut game, player_id, deck)?;
        }
        Ok(game)
    }

    /// Load a deck into a player's library
    fn load_deck_into_game(
        &self,
        game: &mut GameState,
        player_id: PlayerId,
        deck: &DeckList,
    ) -> Result<()> {
        for entry in &deck.main_deck {
            let card_def = self
                .provider
                .get_card(&entry.card_name)
                .ok_or_else(|| MtgError::UnknownCard(entry.card_name.clone()))?;
            for _ in 0..entry.count {
                game.create_card_in_library(card_def.clone(), player_id)?;
            }
        }
        Ok(())
    }
}
