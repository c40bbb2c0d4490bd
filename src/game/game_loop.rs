//! Synchronous game driver
//!
//! Runs a `GameEngine` to completion by routing each decision to the
//! `DecisionProvider` of the player the engine is waiting for.

use crate::core::{LossReason, PlayerId};
use crate::game::controller::DecisionProvider;
use crate::game::engine::GameEngine;
use crate::game::intent::{Decision, DecisionKind};
use crate::game::{LogCategory, VerbosityLevel};
use crate::{log_if_verbose, MtgError, Result};
use serde::{Deserialize, Serialize};

/// Result of running a game to completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// Winner of the game (None if draw or game didn't complete)
    pub winner: Option<PlayerId>,
    pub turns_played: u32,
    /// Intents submitted over the whole game
    pub decisions: u32,
    pub end_reason: GameEndReason,
}

/// Reason the game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEndReason {
    /// The last opponent's life reached 0
    PlayerDeath(PlayerId),
    /// The last opponent drew from an empty library
    Decking(PlayerId),
    /// The last opponent reached the poison threshold
    Poison(PlayerId),
    /// Every remaining player lost at once
    Draw,
    /// Game reached the maximum turn count
    TurnLimit,
    /// Game reached the maximum decision count
    DecisionLimit,
}

/// Game loop manager
pub struct GameLoop<'a> {
    pub engine: &'a mut GameEngine,
    /// Maximum turns before stopping without a winner
    max_turns: u32,
    /// Safety net against providers that never pass
    max_decisions: u32,
    decisions: u32,
}

impl<'a> GameLoop<'a> {
    pub fn new(engine: &'a mut GameEngine) -> Self {
        GameLoop {
            engine,
            max_turns: 200,
            max_decisions: 100_000,
            decisions: 0,
        }
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_max_decisions(mut self, max_decisions: u32) -> Self {
        self.max_decisions = max_decisions;
        self
    }

    /// Set verbosity on the game's logger
    pub fn with_verbosity(self, verbosity: VerbosityLevel) -> Self {
        self.engine.state_mut().logger.set_verbosity(verbosity);
        self
    }

    /// Run the game with one provider per player
    ///
    /// Providers are matched to players by `player_id`. The engine is started
    /// if it has not been already.
    pub fn run_game(&mut self, providers: &mut [Box<dyn DecisionProvider>]) -> Result<GameResult> {
        for player in &self.engine.state().players {
            if !providers.iter().any(|p| p.player_id() == player.id) {
                return Err(MtgError::InvalidAction(format!(
                    "no decision provider for {}",
                    player.name
                )));
            }
        }

        self.engine.start()?;

        loop {
            if let Some(result) = self.step(providers)? {
                self.notify_game_end(providers, result.winner);
                return Ok(result);
            }
        }
    }

    /// Make one decision; returns the result once the game is over or a
    /// limit is reached
    fn step(&mut self, providers: &mut [Box<dyn DecisionProvider>]) -> Result<Option<GameResult>> {
        if self.engine.turn_number() > self.max_turns {
            return Ok(Some(self.result(GameEndReason::TurnLimit, None)));
        }
        if self.decisions >= self.max_decisions {
            return Ok(Some(self.result(GameEndReason::DecisionLimit, None)));
        }

        let (player, kind, options) = match self.engine.decision() {
            Decision::GameOver { winner } => {
                let reason = self.end_reason(winner);
                return Ok(Some(self.result(reason, winner)));
            }
            Decision::WaitingForDecision {
                player,
                kind,
                options,
            } => (player, kind, options),
        };
        if options.is_empty() {
            return Err(MtgError::InvariantViolation(format!(
                "{kind:?} decision for player {player} has no options"
            )));
        }

        let provider = providers
            .iter_mut()
            .find(|p| p.player_id() == player)
            .ok_or_else(|| MtgError::InvalidAction(format!("no provider for player {player}")))?;
        let view = self.engine.query_game_view(player);
        let choice = provider.choose(&view, kind, &options);
        let index = if choice < options.len() {
            choice
        } else {
            options.len() - 1
        };
        let intent = options[index].clone();

        log_if_verbose!(
            self.engine.state().logger,
            LogCategory::Decision,
            "{} ({}) chooses {} of {}: {}",
            self.engine.state().player_name(player),
            provider.name(),
            index + 1,
            options.len(),
            intent
        );

        self.decisions += 1;
        if let Err(violation) = self.engine.submit_intent(player, intent) {
            if violation.is_fatal() {
                return Err(violation.into());
            }
            // Candidates are validated, so this means a provider bug; fall
            // back to the default option so the game can continue
            let fallback = match kind {
                DecisionKind::Priority => options.len() - 1,
                _ => 0,
            };
            self.engine.submit_intent(player, options[fallback].clone())?;
        }
        Ok(None)
    }

    fn end_reason(&self, winner: Option<PlayerId>) -> GameEndReason {
        let Some(winner) = winner else {
            return GameEndReason::Draw;
        };
        // The loss reason of any losing player; in a two-player game the
        // only one
        let loss = self
            .engine
            .state()
            .players
            .iter()
            .filter(|p| p.id != winner)
            .filter_map(|p| p.loss_reason)
            .last();
        match loss {
            Some(LossReason::DrewFromEmptyLibrary) => GameEndReason::Decking(winner),
            Some(LossReason::Poison) => GameEndReason::Poison(winner),
            _ => GameEndReason::PlayerDeath(winner),
        }
    }

    fn result(&self, end_reason: GameEndReason, winner: Option<PlayerId>) -> GameResult {
        GameResult {
            winner,
            turns_played: self.engine.turn_number(),
            decisions: self.decisions,
            end_reason,
        }
    }

    fn notify_game_end(
        &self,
        providers: &mut [Box<dyn DecisionProvider>],
        winner: Option<PlayerId>,
    ) {
        for provider in providers.iter_mut() {
            let player = provider.player_id();
            let view = self.engine.query_game_view(player);
            provider.on_game_end(&view, winner == Some(player));
        }
        let state = self.engine.state();
        state.logger.log(
            VerbosityLevel::Minimal,
            Some(LogCategory::GameOver),
            format_args!(
                "Game over after {} turns: {}",
                state.turn.turn_number,
                match winner {
                    Some(w) => format!("{} wins", state.player_name(w)),
                    None => "no winner".to_string(),
                }
            ),
        );
    }
}
