//! Game engine: the command and query boundary
//!
//! The engine owns the `GameState`. Hosts ask `decision()` who must act,
//! submit that player's `Intent` with `submit_intent`, and get back the
//! `StateDelta` of everything that changed. An intent is validated in full
//! before anything is mutated, so a rejected intent leaves the game exactly
//! as it was.
//!
//! After every accepted intent the engine settles: state-based actions run
//! to a fixpoint, pending triggers go on the stack in APNAP order, and steps
//! with nothing to do are advanced until some player has a decision to make.

use crate::core::{CardId, Color, CounterType, PlayerId, StackItemId};
use crate::error::{ReasonCode, RulesViolation};
use crate::game::actions::ResolutionContext;
use crate::game::combat::{AttackTarget, CombatPhase};
use crate::game::intent::{Decision, DecisionKind, Intent, StateDelta};
use crate::game::mana_payment::TapPlan;
use crate::game::priority::PassOutcome;
use crate::game::snapshot::StateSnapshot;
use crate::game::stack::{StackItem, StackItemKind};
use crate::game::targeting::TargetRef;
use crate::game::triggers::TriggerEvent;
use crate::game::{GameState, LogCategory, Step, TurnStructure, VerbosityLevel};
use crate::journal::GameAction;
use crate::zones::Zone;
use crate::{MtgError, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

type RulesResult<T> = std::result::Result<T, RulesViolation>;

/// Upper bound on automatic step advances between two decisions
const MAX_SETTLE_ITERATIONS: u32 = 256;

/// Target combinations offered per spell or ability by `query_legal_actions`
const MAX_TARGET_COMBINATIONS: usize = 16;

/// Attackers up to which every subset is offered as a candidate
const MAX_ATTACK_SUBSET_ATTACKERS: usize = 4;

fn illegal(code: ReasonCode) -> RulesViolation {
    RulesViolation::IllegalIntent(code)
}

/// A validated spell cast, ready to commit
struct CastPlan {
    card: CardId,
    targets: Vec<TargetRef>,
    x_value: u32,
    tap_plan: TapPlan,
}

/// A validated ability activation, ready to commit
struct ActivationPlan {
    card: CardId,
    ability: usize,
    targets: Vec<TargetRef>,
    tap_plan: Option<TapPlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEngine {
    state: GameState,
    /// Opening hands were drawn
    started: bool,
    /// Turn one has begun (all mulligan decisions are made)
    turns_started: bool,
}

impl GameEngine {
    /// Wrap a prepared game (decks in libraries); call `start` to deal
    pub fn new(state: GameState) -> Self {
        GameEngine {
            state,
            started: false,
            turns_started: false,
        }
    }

    /// Read-only access to the full state (tests, benchmarks, harness
    /// statistics). Players should use `query_game_view`.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable access for scenario setup; bypasses all rules checks
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn into_state(self) -> GameState {
        self.state
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over()
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.state.get_winner()
    }

    pub fn turn_number(&self) -> u32 {
        self.state.turn.turn_number
    }

    /// Shuffle libraries, deal opening hands and run until the first
    /// decision (a mulligan, or priority in the first upkeep)
    pub fn start(&mut self) -> RulesResult<StateDelta> {
        let mark = self.state.journal.mark();
        if self.started {
            return Ok(StateDelta::from_journal(&self.state.journal, mark));
        }
        self.started = true;

        let players: Vec<PlayerId> = self.state.players.iter().map(|p| p.id).collect();
        for &player in &players {
            self.state.shuffle_library(player)?;
            self.draw_opening_hand(player, self.state.config.opening_hand_size)?;
        }
        if self.state.config.allow_mulligans {
            for player in &mut self.state.players {
                player.deciding_mulligan = true;
            }
        }

        self.settle()?;
        Ok(StateDelta::from_journal(&self.state.journal, mark))
    }

    /// Opening hands draw what the library has; a short library is not a
    /// draw from an empty library
    fn draw_opening_hand(&mut self, player: PlayerId, size: usize) -> Result<()> {
        let available = self.state.library_size(player);
        self.state.draw_cards(player, size.min(available))
    }

    // ---- decisions -------------------------------------------------------

    /// Who has to act next, and how
    fn pending_decision(&self) -> Option<(PlayerId, DecisionKind)> {
        let state = &self.state;
        if state.is_game_over() || !self.started {
            return None;
        }
        if let Some(player) = self.mulligan_decider() {
            return Some((player, DecisionKind::Mulligan));
        }
        if self.attackers_pending() {
            return Some((state.turn.active_player, DecisionKind::DeclareAttackers));
        }
        if state.turn.current_step == Step::DeclareBlockers {
            if let Some(player) = state.pending_blocker_declarer() {
                return Some((player, DecisionKind::DeclareBlockers));
            }
        }
        state
            .priority
            .holder()
            .map(|player| (player, DecisionKind::Priority))
    }

    /// First player in turn order still deciding on their opening hand
    fn mulligan_decider(&self) -> Option<PlayerId> {
        self.state
            .players
            .iter()
            .find(|p| p.is_alive() && p.deciding_mulligan)
            .map(|p| p.id)
    }

    fn attackers_pending(&self) -> bool {
        self.state.turn.current_step == Step::DeclareAttackers
            && self.state.combat.phase == CombatPhase::Idle
    }

    /// The engine's current waiting state
    pub fn decision(&self) -> Decision {
        if self.state.is_game_over() {
            return Decision::GameOver {
                winner: self.state.get_winner(),
            };
        }
        match self.pending_decision() {
            Some((player, kind)) => Decision::WaitingForDecision {
                player,
                kind,
                options: self.query_legal_actions(player),
            },
            // Only before `start`
            None => Decision::WaitingForDecision {
                player: self.state.turn.active_player,
                kind: DecisionKind::Mulligan,
                options: Vec::new(),
            },
        }
    }

    // ---- commands --------------------------------------------------------

    /// Apply one player's intent
    ///
    /// On success returns every atomic change the intent caused, including
    /// everything that happened automatically until the next decision.
    pub fn submit_intent(&mut self, player: PlayerId, intent: Intent) -> RulesResult<StateDelta> {
        if self.state.is_game_over() {
            return Err(illegal(ReasonCode::GameOver));
        }
        let Some((waiting, kind)) = self.pending_decision() else {
            return Err(illegal(ReasonCode::NotWaitingForPlayer));
        };
        if waiting != player {
            return Err(illegal(if kind == DecisionKind::Priority {
                ReasonCode::NotPriorityHolder
            } else {
                ReasonCode::NotWaitingForPlayer
            }));
        }
        if intent.kind() != kind {
            return Err(illegal(ReasonCode::WrongDecisionKind));
        }

        let mark = self.state.journal.mark();
        match intent {
            Intent::PlayLand { card } => {
                self.validate_play_land(player, card)?;
                self.commit_play_land(player, card)?;
            }
            Intent::CastSpell { card, targets, x } => {
                let plan = self.validate_cast(player, card, targets, x)?;
                self.commit_cast(player, plan)?;
            }
            Intent::ActivateAbility {
                card,
                ability,
                targets,
            } => {
                let plan = self.validate_activation(player, card, ability, targets)?;
                self.commit_activation(player, plan)?;
            }
            Intent::PassPriority => self.commit_pass(player)?,
            Intent::DeclareAttackers { attackers } => {
                self.state.validate_attackers(player, &attackers)?;
                self.state.declare_attackers(player, &attackers)?;
            }
            Intent::DeclareBlockers { blocks } => {
                self.state.validate_blockers(player, &blocks)?;
                self.state.declare_blockers(player, &blocks)?;
            }
            Intent::Mulligan { keep } => {
                self.validate_mulligan(player, keep)?;
                self.commit_mulligan(player, keep)?;
            }
        }

        self.settle()?;
        Ok(StateDelta::from_journal(&self.state.journal, mark))
    }

    fn validate_play_land(&self, player: PlayerId, card: CardId) -> RulesResult<()> {
        let state = &self.state;
        if !state.hand(player).contains(&card) {
            return Err(illegal(ReasonCode::CardNotInHand));
        }
        if !state.cards.get(card)?.is_land() {
            return Err(illegal(ReasonCode::NotALand));
        }
        if state.turn.active_player != player {
            return Err(illegal(ReasonCode::NotActivePlayer));
        }
        if !state.turn.current_step.can_play_lands() {
            return Err(illegal(ReasonCode::WrongStep));
        }
        if !state.stack.is_empty() {
            return Err(illegal(ReasonCode::NotSorcerySpeed));
        }
        if !state.get_player(player)?.can_play_land() {
            return Err(illegal(ReasonCode::LandAlreadyPlayed));
        }
        Ok(())
    }

    fn commit_play_land(&mut self, player: PlayerId, card: CardId) -> Result<()> {
        let state = &mut self.state;
        state.move_card(card, Zone::Battlefield)?;
        state.get_player_mut(player)?.play_land();
        state.journal.log(GameAction::PlayLand {
            player_id: player,
            card_id: card,
        });
        state.logger.event(
            LogCategory::Cast,
            format_args!(
                "{} plays {}",
                state.player_name(player),
                state.card_name(card)
            ),
        );
        state.priority.on_stack_mutation(player);
        Ok(())
    }

    fn validate_cast(
        &self,
        player: PlayerId,
        card: CardId,
        targets: Vec<TargetRef>,
        x: Option<u32>,
    ) -> RulesResult<CastPlan> {
        let state = &self.state;
        if !state.hand(player).contains(&card) {
            return Err(illegal(ReasonCode::CardNotInHand));
        }
        let card_ref = state.cards.get(card)?;
        if card_ref.is_land() {
            return Err(illegal(ReasonCode::NotCastable));
        }
        if !card_ref.is_instant() && !state.can_cast_sorcery_speed(player) {
            return Err(illegal(ReasonCode::NotSorcerySpeed));
        }

        let printed = card_ref.mana_cost();
        let (cost, x_value) = if printed.has_x() {
            let x = x.ok_or(illegal(ReasonCode::UnboundX))?;
            let bound = printed.bind_x(x).ok_or(RulesViolation::InsufficientResources(
                ReasonCode::InsufficientMana,
            ))?;
            (bound, x)
        } else {
            (printed.clone(), 0)
        };

        state.validate_targets(
            &targets,
            &card_ref.definition.spell_targets,
            player,
            Some(card),
        )?;
        let tap_plan = state.plan_auto_tap(player, &cost)?;

        Ok(CastPlan {
            card,
            targets,
            x_value,
            tap_plan,
        })
    }

    fn commit_cast(&mut self, player: PlayerId, plan: CastPlan) -> Result<()> {
        let state = &mut self.state;
        state.execute_tap_plan(player, &plan.tap_plan)?;
        state.move_card(plan.card, Zone::Stack)?;

        let (name, colors, requirements, effects) = {
            let card = state.cards.get(plan.card)?;
            (
                card.name().clone(),
                card.colors().iter().copied().collect(),
                card.definition.spell_targets.clone(),
                card.definition.spell_effects.clone(),
            )
        };
        let id: StackItemId = state.next_id();
        state.logger.event(
            LogCategory::Cast,
            format_args!("{} casts {}", state.player_name(player), name),
        );
        state.stack.push(StackItem {
            id,
            kind: StackItemKind::Spell,
            source: Some(plan.card),
            source_name: name,
            source_colors: colors,
            controller: player,
            targets: plan.targets,
            requirements,
            effects,
            x_value: plan.x_value,
            subject: None,
            countered: false,
        });
        state.journal.log(GameAction::PushStack {
            item: id,
            source: Some(plan.card),
            controller: player,
        });
        state.fire_trigger(TriggerEvent::SpellCast {
            card: plan.card,
            controller: player,
        });
        state.priority.on_stack_mutation(player);
        Ok(())
    }

    fn validate_activation(
        &self,
        player: PlayerId,
        card: CardId,
        index: usize,
        targets: Vec<TargetRef>,
    ) -> RulesResult<ActivationPlan> {
        let state = &self.state;
        if !state.battlefield.contains(card) {
            return Err(illegal(ReasonCode::CardNotOnBattlefield));
        }
        let card_ref = state.cards.get(card)?;
        if card_ref.controller != player {
            return Err(illegal(ReasonCode::NotController));
        }
        let ability = card_ref
            .definition
            .activated_abilities
            .get(index)
            .ok_or(illegal(ReasonCode::NoSuchAbility))?;

        if ability.cost.tap {
            if card_ref.tapped {
                return Err(illegal(ReasonCode::AlreadyTapped));
            }
            if state.is_summoning_sick(card) {
                return Err(illegal(ReasonCode::SummoningSick));
            }
        }
        if (ability.sorcery_speed || ability.is_loyalty_ability())
            && !state.can_cast_sorcery_speed(player)
        {
            return Err(illegal(ReasonCode::NotSorcerySpeed));
        }
        if let Some(change) = ability.cost.loyalty {
            if card_ref.loyalty_activated_turn == Some(state.turn.turn_number) {
                return Err(illegal(ReasonCode::LoyaltyAbilityUsed));
            }
            if change < 0 && card_ref.loyalty() < -change {
                return Err(RulesViolation::InsufficientResources(
                    ReasonCode::InsufficientLoyalty,
                ));
            }
        }

        state.validate_targets(&targets, &ability.targets, player, Some(card))?;

        let tap_plan = if ability.cost.mana.is_zero() {
            None
        } else {
            let exclude = ability.cost.tap.then_some(card);
            Some(state.plan_auto_tap_except(player, &ability.cost.mana, exclude)?)
        };

        Ok(ActivationPlan {
            card,
            ability: index,
            targets,
            tap_plan,
        })
    }

    fn commit_activation(&mut self, player: PlayerId, plan: ActivationPlan) -> Result<()> {
        let state = &mut self.state;
        let (ability, name, colors) = {
            let card = state.cards.get(plan.card)?;
            let ability = card
                .definition
                .activated_abilities
                .get(plan.ability)
                .cloned()
                .ok_or_else(|| MtgError::InvalidAction("ability vanished".to_string()))?;
            let colors: SmallVec<[Color; 2]> = card.colors().iter().copied().collect();
            (ability, card.name().clone(), colors)
        };

        if let Some(tap_plan) = &plan.tap_plan {
            state.execute_tap_plan(player, tap_plan)?;
        }
        if ability.cost.tap {
            state.tap_card(plan.card)?;
        }
        if let Some(change) = ability.cost.loyalty {
            if change >= 0 {
                state.add_counters(plan.card, CounterType::Loyalty, change as u32)?;
            } else {
                state.remove_counters(
                    plan.card,
                    CounterType::Loyalty,
                    change.unsigned_abs(),
                )?;
            }
            let turn = state.turn.turn_number;
            state.cards.get_mut(plan.card)?.loyalty_activated_turn = Some(turn);
        }
        if ability.cost.sacrifice_self {
            state.move_card(plan.card, Zone::Graveyard)?;
        }

        if ability.is_mana_ability() {
            let ctx = ResolutionContext {
                controller: player,
                source: Some(plan.card),
                source_colors: colors,
                targets: Vec::new(),
                x: 0,
                subject: None,
            };
            for effect in &ability.effects {
                state.execute_effect(&ctx, effect)?;
            }
            state.logger.detail(
                LogCategory::Mana,
                format_args!(
                    "{} activates {}: {}",
                    state.player_name(player),
                    name,
                    ability.description
                ),
            );
        } else {
            let id: StackItemId = state.next_id();
            state.logger.event(
                LogCategory::Cast,
                format_args!(
                    "{} activates {}: {}",
                    state.player_name(player),
                    name,
                    ability.description
                ),
            );
            state.stack.push(StackItem {
                id,
                kind: StackItemKind::ActivatedAbility {
                    index: plan.ability,
                },
                source: Some(plan.card),
                source_name: name,
                source_colors: colors,
                controller: player,
                targets: plan.targets,
                requirements: ability.targets.clone(),
                effects: ability.effects.clone(),
                x_value: 0,
                subject: None,
                countered: false,
            });
            state.journal.log(GameAction::PushStack {
                item: id,
                source: Some(plan.card),
                controller: player,
            });
        }
        state.priority.on_stack_mutation(player);
        Ok(())
    }

    fn commit_pass(&mut self, player: PlayerId) -> Result<()> {
        let state = &mut self.state;
        state.journal.log(GameAction::PassPriority { player_id: player });
        let order = state.apnap_order();
        match state.priority.pass(player, &order) {
            PassOutcome::NextPlayer(next) => {
                state.journal.log(GameAction::PriorityTo { player_id: next });
                state.logger.detail(
                    LogCategory::Priority,
                    format_args!(
                        "{} passes; priority to {}",
                        state.player_name(player),
                        state.player_name(next)
                    ),
                );
            }
            PassOutcome::AllPassed => {
                if self.state.stack.is_empty() {
                    self.advance_step()?;
                } else {
                    self.state.resolve_top()?;
                }
            }
        }
        Ok(())
    }

    fn validate_mulligan(&self, player: PlayerId, keep: bool) -> RulesResult<()> {
        if !keep
            && (!self.state.config.allow_mulligans || self.state.hand(player).is_empty())
        {
            return Err(illegal(ReasonCode::MulliganNotAllowed));
        }
        Ok(())
    }

    fn commit_mulligan(&mut self, player: PlayerId, keep: bool) -> Result<()> {
        if keep {
            self.state.get_player_mut(player)?.deciding_mulligan = false;
            self.state.journal.log(GameAction::KeepHand { player_id: player });
            self.state.logger.event(
                LogCategory::Decision,
                format_args!(
                    "{} keeps {} cards",
                    self.state.player_name(player),
                    self.state.hand(player).len()
                ),
            );
            return Ok(());
        }

        let hand: Vec<CardId> = self.state.hand(player).to_vec();
        let new_size = hand.len() - 1;
        for card in hand {
            self.state.move_card(card, Zone::Library)?;
        }
        self.state.shuffle_library(player)?;
        self.draw_opening_hand(player, new_size)?;
        self.state.get_player_mut(player)?.mulligans_taken += 1;
        self.state.journal.log(GameAction::Mulligan {
            player_id: player,
            new_hand_size: new_size,
        });
        self.state.logger.event(
            LogCategory::Decision,
            format_args!(
                "{} mulligans to {}",
                self.state.player_name(player),
                new_size
            ),
        );
        Ok(())
    }

    // ---- turn flow -------------------------------------------------------

    /// Run automatic game actions until some player has a decision
    fn settle(&mut self) -> RulesResult<()> {
        for _ in 0..MAX_SETTLE_ITERATIONS {
            self.state.check_state_based_actions()?;
            if self.state.is_game_over() || self.mulligan_decider().is_some() {
                return Ok(());
            }
            if !self.turns_started {
                self.begin_first_turn()?;
                continue;
            }

            let active = self.state.turn.active_player;
            if !self.state.get_player(active)?.is_alive() {
                // The active player left the game; their turn ends
                self.start_next_turn()?;
                continue;
            }

            if self.attackers_pending()
                || (self.state.turn.current_step == Step::DeclareBlockers
                    && self.state.pending_blocker_declarer().is_some())
            {
                return Ok(());
            }

            if self.state.place_pending_triggers() {
                match self.state.priority.holder() {
                    Some(holder) => self.state.priority.on_stack_mutation(holder),
                    None => self.give_priority(active),
                }
                continue;
            }

            if self.state.priority.holder().is_some() {
                return Ok(());
            }
            if self.state.turn.current_step.grants_priority() || !self.state.stack.is_empty() {
                self.give_priority(active);
                return Ok(());
            }
            self.advance_step()?;
        }
        Err(RulesViolation::EngineInvariantViolation(format!(
            "no decision reached after {MAX_SETTLE_ITERATIONS} automatic steps"
        )))
    }

    fn give_priority(&mut self, player: PlayerId) {
        self.state.priority.reset(player);
        self.state
            .journal
            .log(GameAction::PriorityTo { player_id: player });
    }

    fn begin_first_turn(&mut self) -> Result<()> {
        self.turns_started = true;
        let first = self
            .state
            .players
            .iter()
            .position(|p| p.is_alive())
            .ok_or_else(|| MtgError::InvariantViolation("no players in the game".to_string()))?;
        let first_id = self.state.players[first].id;
        self.state.turn = TurnStructure::new_with_idx(first_id, first);
        self.state.journal.log(GameAction::ChangeTurn {
            from_player: first_id,
            to_player: first_id,
            turn_number: 1,
        });
        self.log_turn_start();
        self.enter_step()
    }

    fn start_next_turn(&mut self) -> Result<()> {
        let state = &mut self.state;
        let n = state.players.len();
        let from = state.turn.active_player;
        let next_idx = (1..=n)
            .map(|offset| (state.turn.active_player_idx + offset) % n)
            .find(|&i| state.players[i].is_alive())
            .ok_or_else(|| MtgError::InvariantViolation("no players in the game".to_string()))?;
        let next = state.players[next_idx].id;

        state.empty_mana_pools();
        state.priority.clear();
        state.combat.clear();
        state.turn.next_turn(next, next_idx);
        state.journal.log(GameAction::ChangeTurn {
            from_player: from,
            to_player: next,
            turn_number: state.turn.turn_number,
        });
        self.log_turn_start();
        self.enter_step()
    }

    fn log_turn_start(&self) {
        let state = &self.state;
        state.logger.log(
            VerbosityLevel::Normal,
            Some(LogCategory::Turn),
            format_args!(
                "Turn {} ({})",
                state.turn.turn_number,
                state.player_name(state.turn.active_player)
            ),
        );
    }

    /// Move to the next step, skipping combat steps that cannot happen
    fn advance_step(&mut self) -> Result<()> {
        let state = &mut self.state;
        state.empty_mana_pools();
        state.priority.clear();

        let from = state.turn.current_step;
        let active = state.turn.active_player;
        let next = match from {
            Step::BeginCombat if state.potential_attackers(active).is_empty() => {
                Some(Step::EndCombat)
            }
            Step::DeclareAttackers if !state.combat.has_attackers() => Some(Step::EndCombat),
            Step::DeclareBlockers => Some(if state.needs_first_strike_step() {
                Step::FirstStrikeDamage
            } else {
                Step::CombatDamage
            }),
            other => other.next(),
        };

        match next {
            Some(to) => {
                state.turn.current_step = to;
                state.journal.log(GameAction::AdvanceStep {
                    from_step: from,
                    to_step: to,
                });
                state
                    .logger
                    .detail(LogCategory::Step, format_args!("Step: {to}"));
                self.enter_step()
            }
            None => self.start_next_turn(),
        }
    }

    /// Turn-based actions at the start of a step
    fn enter_step(&mut self) -> Result<()> {
        let state = &mut self.state;
        let active = state.turn.active_player;
        match state.turn.current_step {
            Step::Untap => {
                state.get_player_mut(active)?.reset_lands_played();
                state.combat.clear();
                state.untap_permanents(active)?;
            }
            Step::Upkeep => state.fire_trigger(TriggerEvent::BeginningOfUpkeep { player: active }),
            Step::Draw => {
                if !(state.turn.turn_number == 1 && state.config.skip_first_draw) {
                    state.draw_card(active)?;
                }
            }
            Step::BeginCombat => state.combat.begin(),
            Step::DeclareBlockers => state.begin_declare_blockers(),
            Step::FirstStrikeDamage => state.combat_damage_step(true)?,
            Step::CombatDamage => state.combat_damage_step(false)?,
            Step::EndCombat => state.combat.clear(),
            Step::End => state.fire_trigger(TriggerEvent::BeginningOfEndStep { player: active }),
            Step::Cleanup => state.cleanup_step()?,
            Step::Main1 | Step::Main2 | Step::DeclareAttackers => {}
        }
        Ok(())
    }

    // ---- queries ---------------------------------------------------------

    /// Every legal intent for `player` right now
    ///
    /// Empty unless the engine is waiting for this player. Priority options
    /// list land plays, casts and non-mana activations (with legal target
    /// combinations and the largest affordable X), then `PassPriority` last.
    /// Mana abilities are not listed: casting taps mana automatically.
    pub fn query_legal_actions(&self, player: PlayerId) -> Vec<Intent> {
        let Some((waiting, kind)) = self.pending_decision() else {
            return Vec::new();
        };
        if waiting != player {
            return Vec::new();
        }

        let candidates = match kind {
            DecisionKind::Mulligan => {
                let mut options = vec![Intent::Mulligan { keep: true }];
                if self.validate_mulligan(player, false).is_ok() {
                    options.push(Intent::Mulligan { keep: false });
                }
                options
            }
            DecisionKind::Priority => self.priority_candidates(player),
            DecisionKind::DeclareAttackers => self.attack_candidates(player),
            DecisionKind::DeclareBlockers => self.block_candidates(player),
        };

        let mut seen = FxHashSet::default();
        candidates
            .into_iter()
            .filter(|intent| seen.insert(intent.clone()))
            .collect()
    }

    fn priority_candidates(&self, player: PlayerId) -> Vec<Intent> {
        let state = &self.state;
        let mut options = Vec::new();

        for &card in state.hand(player) {
            let Ok(card_ref) = state.cards.get(card) else {
                continue;
            };
            if card_ref.is_land() {
                if self.validate_play_land(player, card).is_ok() {
                    options.push(Intent::PlayLand { card });
                }
                continue;
            }
            // Cheap timing check before target enumeration
            if !card_ref.is_instant() && !state.can_cast_sorcery_speed(player) {
                continue;
            }
            let x = if card_ref.mana_cost().has_x() {
                match state.max_affordable_x(player, card_ref.mana_cost()) {
                    Some(x) => Some(x),
                    None => continue,
                }
            } else {
                None
            };
            for targets in state.target_combinations(
                &card_ref.definition.spell_targets,
                player,
                Some(card),
                MAX_TARGET_COMBINATIONS,
            ) {
                if self.validate_cast(player, card, targets.clone(), x).is_ok() {
                    options.push(Intent::CastSpell { card, targets, x });
                }
            }
        }

        for card in state.permanents_controlled_by(player) {
            let Ok(card_ref) = state.cards.get(card) else {
                continue;
            };
            for (ability, def) in card_ref.definition.activated_abilities.iter().enumerate() {
                if def.is_mana_ability() {
                    continue;
                }
                for targets in state.target_combinations(
                    &def.targets,
                    player,
                    Some(card),
                    MAX_TARGET_COMBINATIONS,
                ) {
                    if self
                        .validate_activation(player, card, ability, targets.clone())
                        .is_ok()
                    {
                        options.push(Intent::ActivateAbility {
                            card,
                            ability,
                            targets,
                        });
                    }
                }
            }
        }

        options.push(Intent::PassPriority);
        options
    }

    fn attack_candidates(&self, player: PlayerId) -> Vec<Intent> {
        let state = &self.state;
        let attackers = state.potential_attackers(player);
        let targets = state.attack_targets(player);
        let limit = state.config.max_attack_candidates.max(1);
        let mut sets: Vec<Vec<(CardId, AttackTarget)>> = vec![Vec::new()];

        for &attacker in &attackers {
            for &target in &targets {
                sets.push(vec![(attacker, target)]);
            }
        }
        for &target in targets.iter().filter(|t| matches!(t, AttackTarget::Player(_))) {
            if attackers.len() > 1 {
                sets.push(attackers.iter().map(|&a| (a, target)).collect());
            }
        }
        if let Some(&first) = targets.first() {
            if attackers.len() <= MAX_ATTACK_SUBSET_ATTACKERS {
                for mask in 1u32..(1 << attackers.len()) {
                    if mask.count_ones() < 2 {
                        continue;
                    }
                    sets.push(
                        attackers
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| mask & (1 << i) != 0)
                            .map(|(_, &a)| (a, first))
                            .collect(),
                    );
                }
            }
        }

        sets.into_iter()
            .filter(|set| state.validate_attackers(player, set).is_ok())
            .take(limit)
            .map(|attackers| Intent::DeclareAttackers { attackers })
            .collect()
    }

    fn block_candidates(&self, player: PlayerId) -> Vec<Intent> {
        let state = &self.state;
        let blockers = state.potential_blockers(player);
        let attackers: Vec<CardId> = state
            .combat
            .attack_order
            .iter()
            .copied()
            .filter(|&a| {
                state
                    .combat
                    .attack_target(a)
                    .and_then(|t| state.defending_player(t))
                    == Some(player)
            })
            .collect();
        let limit = state.config.max_attack_candidates.max(1);

        let mut sets: Vec<Vec<(CardId, CardId)>> = vec![Vec::new()];
        for &attacker in &attackers {
            let able: Vec<CardId> = blockers
                .iter()
                .copied()
                .filter(|&b| state.can_block(b, attacker).is_ok())
                .collect();
            for &blocker in &able {
                sets.push(vec![(blocker, attacker)]);
            }
            if able.len() >= 2 {
                sets.push(vec![(able[0], attacker), (able[1], attacker)]);
            }
        }

        sets.into_iter()
            .filter(|set| state.validate_blockers(player, set).is_ok())
            .take(limit)
            .map(|blocks| Intent::DeclareBlockers { blocks })
            .collect()
    }

    /// The game as `player` may see it
    pub fn query_game_view(&self, player: PlayerId) -> StateSnapshot {
        StateSnapshot::for_viewer(&self.state, player)
    }
}
