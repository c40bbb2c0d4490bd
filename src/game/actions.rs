//! Game actions and mechanics
//!
//! Low-level mutations of `GameState`: zone moves, damage, life, draws,
//! effect execution and stack resolution. Each primitive records itself in
//! the action journal. None of these check timing or legality; the engine
//! validates intents before calling them.

use crate::core::{
    Card, CardDefinition, CardId, Color, CounterType, Effect, EffectTarget, Keyword, PlayerId,
};
use crate::game::stack::StackItem;
use crate::game::targeting::{fizzle_outcome, FizzleOutcome, TargetRef};
use crate::game::triggers::TriggerEvent;
use crate::game::{GameState, LogCategory};
use crate::journal::GameAction;
use crate::zones::Zone;
use crate::{MtgError, Result};
use smallvec::SmallVec;
use std::sync::Arc;

/// The characteristics of whatever is dealing damage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageSource {
    pub card: Option<CardId>,
    pub controller: PlayerId,
    pub colors: SmallVec<[Color; 2]>,
    pub deathtouch: bool,
    pub lifelink: bool,
    pub infect: bool,
}

/// Bindings available to effects while a stack item resolves
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionContext {
    pub controller: PlayerId,
    pub source: Option<CardId>,
    pub source_colors: SmallVec<[Color; 2]>,
    /// Chosen targets; slots whose target became illegal hold `TargetRef::None`
    pub targets: Vec<TargetRef>,
    pub x: u32,
    pub subject: Option<TargetRef>,
}

impl ResolutionContext {
    pub fn from_item(item: &StackItem) -> Self {
        ResolutionContext {
            controller: item.controller,
            source: item.source,
            source_colors: item.source_colors.clone(),
            targets: item.targets.clone(),
            x: item.x_value,
            subject: item.subject,
        }
    }
}

impl GameState {
    // ---- zone changes ----------------------------------------------------

    /// Move a card to another zone
    ///
    /// Cards always go to their owner's personal zones. Leaving the
    /// battlefield fires leave (and dies) triggers before the card's own
    /// watchers are removed, then clears all permanent state and returns
    /// control to the owner.
    pub fn move_card(&mut self, card_id: CardId, to: Zone) -> Result<()> {
        let (from, owner, controller) = {
            let card = self.cards.get(card_id)?;
            (card.zone, card.owner, card.controller)
        };

        match from {
            Zone::Battlefield => {
                self.fire_trigger(TriggerEvent::LeavesBattlefield {
                    card: card_id,
                    controller,
                    to,
                });
                if to == Zone::Graveyard {
                    self.fire_trigger(TriggerEvent::Dies {
                        card: card_id,
                        controller,
                    });
                }
                self.triggers.unregister_source(card_id);
                self.combat.remove_from_combat(card_id);
                self.battlefield.remove(card_id);
            }
            // Stack membership is tracked by stack items, not a card list
            Zone::Stack => {}
            _ => {
                if let Some(zone) = self
                    .get_player_zones_mut(owner)
                    .and_then(|zones| zones.get_zone_mut(from))
                {
                    zone.remove(card_id);
                }
            }
        }

        {
            let card = self.cards.get_mut(card_id)?;
            if from == Zone::Battlefield {
                card.reset_permanent_state();
                card.controller = card.owner;
            }
            card.zone = to;
        }

        match to {
            Zone::Battlefield => self.battlefield.add(card_id),
            Zone::Stack => {}
            _ => self
                .get_player_zones_mut(owner)
                .and_then(|zones| zones.get_zone_mut(to))
                .ok_or(MtgError::EntityNotFound(owner.as_u32()))?
                .add(card_id),
        }

        self.journal.log(GameAction::MoveCard {
            card_id,
            from_zone: from,
            to_zone: to,
            owner,
        });

        if to == Zone::Battlefield {
            self.enter_battlefield(card_id)?;
        }
        Ok(())
    }

    /// Bookkeeping for a permanent that just arrived
    fn enter_battlefield(&mut self, card_id: CardId) -> Result<()> {
        let turn = self.turn.turn_number;
        let (controller, loyalty) = {
            let card = self.cards.get_mut(card_id)?;
            card.turn_entered_battlefield = Some(turn);
            (card.controller, card.definition.loyalty)
        };
        if let Some(loyalty) = loyalty.filter(|l| *l > 0) {
            self.add_counters(card_id, CounterType::Loyalty, loyalty as u32)?;
        }
        self.register_card_triggers(card_id)?;
        self.fire_trigger(TriggerEvent::EntersBattlefield {
            card: card_id,
            controller,
        });
        Ok(())
    }

    /// Create a token directly on the battlefield
    pub fn create_token(
        &mut self,
        definition: Arc<CardDefinition>,
        controller: PlayerId,
    ) -> Result<CardId> {
        let card_id = self.next_card_id();
        let mut card = Card::new(card_id, definition, controller);
        card.is_token = true;
        card.zone = Zone::Battlefield;
        self.cards.insert(card_id, card);
        self.battlefield.add(card_id);
        self.journal.log(GameAction::CreateToken {
            card_id,
            owner: controller,
        });
        self.logger.detail(
            LogCategory::Effect,
            format_args!(
                "{} creates a {} token",
                self.player_name(controller),
                self.card_name(card_id)
            ),
        );
        self.enter_battlefield(card_id)?;
        Ok(card_id)
    }

    /// Draw the top card of a library
    ///
    /// Drawing from an empty library only flags the player; the loss
    /// happens at the next state-based action check.
    pub fn draw_card(&mut self, player_id: PlayerId) -> Result<Option<CardId>> {
        let top = self
            .get_player_zones(player_id)
            .ok_or(MtgError::EntityNotFound(player_id.as_u32()))?
            .library
            .peek_top();

        match top {
            Some(card_id) => {
                self.move_card(card_id, Zone::Hand)?;
                self.logger.detail(
                    LogCategory::Effect,
                    format_args!(
                        "{} draws {}",
                        self.player_name(player_id),
                        self.card_name(card_id)
                    ),
                );
                self.fire_trigger(TriggerEvent::CardDrawn {
                    player: player_id,
                    card: card_id,
                });
                Ok(Some(card_id))
            }
            None => {
                self.get_player_mut(player_id)?.drew_from_empty_library = true;
                self.logger.event(
                    LogCategory::Effect,
                    format_args!(
                        "{} tries to draw from an empty library",
                        self.player_name(player_id)
                    ),
                );
                Ok(None)
            }
        }
    }

    pub fn draw_cards(&mut self, player_id: PlayerId, count: usize) -> Result<()> {
        for _ in 0..count {
            self.draw_card(player_id)?;
        }
        Ok(())
    }

    /// Put the top `count` cards of a library into the graveyard
    pub fn mill(&mut self, player_id: PlayerId, count: usize) -> Result<()> {
        for _ in 0..count {
            let top = self
                .get_player_zones(player_id)
                .and_then(|zones| zones.library.peek_top());
            match top {
                Some(card_id) => self.move_card(card_id, Zone::Graveyard)?,
                None => break,
            }
        }
        Ok(())
    }

    pub fn shuffle_library(&mut self, player_id: PlayerId) -> Result<()> {
        let mut rng = self.rng.borrow_mut();
        self.player_zones
            .iter_mut()
            .find(|(id, _)| *id == player_id)
            .ok_or(MtgError::EntityNotFound(player_id.as_u32()))?
            .1
            .library
            .shuffle(&mut *rng);
        drop(rng);
        self.journal.log(GameAction::Shuffle { player_id });
        Ok(())
    }

    // ---- permanents ------------------------------------------------------

    pub fn tap_card(&mut self, card_id: CardId) -> Result<()> {
        self.cards.get_mut(card_id)?.tap();
        self.journal.log(GameAction::TapCard {
            card_id,
            tapped: true,
        });
        Ok(())
    }

    pub fn untap_card(&mut self, card_id: CardId) -> Result<()> {
        self.cards.get_mut(card_id)?.untap();
        self.journal.log(GameAction::TapCard {
            card_id,
            tapped: false,
        });
        Ok(())
    }

    /// Untap step: untap everything the player controls
    pub(crate) fn untap_permanents(&mut self, player_id: PlayerId) -> Result<()> {
        for card_id in self.permanents_controlled_by(player_id) {
            if self.cards.get(card_id)?.tapped {
                self.untap_card(card_id)?;
            }
        }
        Ok(())
    }

    pub fn add_counters(&mut self, card_id: CardId, counter_type: CounterType, amount: u32) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.cards
            .get_mut(card_id)?
            .add_counter(counter_type.clone(), amount);
        self.journal.log(GameAction::AddCounter {
            card_id,
            counter_type,
            amount,
        });
        Ok(())
    }

    /// Remove up to `amount` counters; returns how many were removed
    pub fn remove_counters(
        &mut self,
        card_id: CardId,
        counter_type: CounterType,
        amount: u32,
    ) -> Result<u32> {
        let removed = self
            .cards
            .get_mut(card_id)?
            .remove_counter(&counter_type, amount);
        if removed > 0 {
            self.journal.log(GameAction::RemoveCounter {
                card_id,
                counter_type,
                amount: removed,
            });
        }
        Ok(removed)
    }

    /// Attach an Aura or Equipment (or unattach with `None`)
    pub fn attach(&mut self, card_id: CardId, attached_to: Option<CardId>) -> Result<()> {
        self.cards.get_mut(card_id)?.attached_to = attached_to;
        self.journal.log(GameAction::Attach {
            card_id,
            attached_to,
        });
        Ok(())
    }

    /// Cleanup step: discard to hand size, remove damage, end
    /// until-end-of-turn effects
    pub(crate) fn cleanup_step(&mut self) -> Result<()> {
        let active = self.turn.active_player;
        let max_hand = self.config.max_hand_size;
        while self.hand(active).len() > max_hand {
            let Some(&card_id) = self.hand(active).last() else {
                break;
            };
            self.logger.event(
                LogCategory::Step,
                format_args!(
                    "{} discards {} to hand size",
                    self.player_name(active),
                    self.card_name(card_id)
                ),
            );
            self.move_card(card_id, Zone::Graveyard)?;
        }

        let permanents: Vec<CardId> = self.battlefield.iter().collect();
        for card_id in permanents {
            let card = self.cards.get_mut(card_id)?;
            if card.damage != 0 || card.deathtouch_damage {
                card.damage = 0;
                card.deathtouch_damage = false;
                self.journal.log(GameAction::RemoveDamage { card_id });
            }
            let card = self.cards.get_mut(card_id)?;
            if card.eot_power != 0 || card.eot_toughness != 0 || !card.eot_keywords.is_empty() {
                card.clear_end_of_turn_effects();
                self.journal.log(GameAction::EndTurnEffects { card_id });
            }
        }
        Ok(())
    }

    // ---- players ---------------------------------------------------------

    pub fn gain_life(&mut self, player_id: PlayerId, amount: i32) -> Result<()> {
        if amount <= 0 {
            return Ok(());
        }
        self.get_player_mut(player_id)?.gain_life(amount);
        self.journal.log(GameAction::ModifyLife { player_id, amount });
        self.fire_trigger(TriggerEvent::LifeGained {
            player: player_id,
            amount,
        });
        Ok(())
    }

    pub fn lose_life(&mut self, player_id: PlayerId, amount: i32) -> Result<()> {
        if amount <= 0 {
            return Ok(());
        }
        self.get_player_mut(player_id)?.lose_life(amount);
        self.journal.log(GameAction::ModifyLife {
            player_id,
            amount: -amount,
        });
        Ok(())
    }

    pub fn add_poison(&mut self, player_id: PlayerId, amount: u32) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.get_player_mut(player_id)?.poison_counters += amount;
        self.journal.log(GameAction::AddPoison { player_id, amount });
        Ok(())
    }

    pub fn add_mana(&mut self, player_id: PlayerId, color: Color, amount: u32) -> Result<()> {
        self.get_player_mut(player_id)?.mana_pool.add(color, amount);
        self.journal.log(GameAction::AddMana {
            player_id,
            color,
            amount,
        });
        Ok(())
    }

    /// Empty every mana pool (step boundary)
    pub(crate) fn empty_mana_pools(&mut self) {
        if self.players.iter().all(|p| p.mana_pool.is_empty()) {
            return;
        }
        for player in &mut self.players {
            player.empty_mana_pool();
        }
        self.journal.log(GameAction::EmptyManaPools);
    }

    // ---- damage ----------------------------------------------------------

    pub fn damage_source(&self, card_id: CardId) -> Result<DamageSource> {
        let card = self.cards.get(card_id)?;
        Ok(DamageSource {
            card: Some(card_id),
            controller: card.controller,
            colors: card.colors().iter().copied().collect(),
            deathtouch: self.has_keyword(card_id, Keyword::Deathtouch),
            lifelink: self.has_keyword(card_id, Keyword::Lifelink),
            infect: self.has_keyword(card_id, Keyword::Infect),
        })
    }

    /// Deal damage; returns the amount actually dealt (0 when prevented)
    pub fn deal_damage(&mut self, source: &DamageSource, target: TargetRef, amount: i32) -> Result<i32> {
        if amount <= 0 {
            return Ok(0);
        }
        match target {
            TargetRef::Player(player_id) => {
                if !self.get_player(player_id)?.is_alive() {
                    return Ok(0);
                }
                if source.infect {
                    self.add_poison(player_id, amount as u32)?;
                } else {
                    self.lose_life(player_id, amount)?;
                }
            }
            TargetRef::Permanent(card_id) => {
                if !self.battlefield.contains(card_id) {
                    return Ok(0);
                }
                if source
                    .colors
                    .iter()
                    .any(|&color| self.has_keyword(card_id, Keyword::ProtectionFrom(color)))
                {
                    self.logger.detail(
                        LogCategory::Effect,
                        format_args!(
                            "Protection prevents {amount} damage to {}",
                            self.card_name(card_id)
                        ),
                    );
                    return Ok(0);
                }
                let (is_creature, is_planeswalker) = {
                    let card = self.cards.get(card_id)?;
                    (card.is_creature(), card.is_planeswalker())
                };
                if is_planeswalker {
                    self.remove_counters(card_id, CounterType::Loyalty, amount as u32)?;
                }
                if is_creature {
                    if source.infect {
                        self.add_counters(card_id, CounterType::MinusOneMinusOne, amount as u32)?;
                    } else {
                        self.cards.get_mut(card_id)?.damage += amount;
                    }
                    if source.deathtouch {
                        self.cards.get_mut(card_id)?.deathtouch_damage = true;
                    }
                    self.journal.log(GameAction::MarkDamage {
                        card_id,
                        amount,
                        deathtouch: source.deathtouch,
                    });
                }
            }
            TargetRef::Spell(_) | TargetRef::None => return Ok(0),
        }

        let source_name = source.card.map_or("an effect", |card| self.card_name(card));
        self.logger.event(
            LogCategory::Combat,
            format_args!(
                "{source_name} deals {amount} damage to {}",
                self.target_name(target)
            ),
        );

        if source.lifelink {
            self.gain_life(source.controller, amount)?;
        }
        Ok(amount)
    }

    pub fn target_name(&self, target: TargetRef) -> &str {
        match target {
            TargetRef::Player(p) => self.player_name(p),
            TargetRef::Permanent(c) => self.card_name(c),
            TargetRef::Spell(item) => self
                .stack
                .get(item)
                .map_or("a spell", |i| i.source_name.as_str()),
            TargetRef::None => "nothing",
        }
    }

    // ---- effects ---------------------------------------------------------

    /// Bind an `EffectTarget` to concrete objects at resolution
    fn bind_effect_target(&self, ctx: &ResolutionContext, target: EffectTarget) -> Vec<TargetRef> {
        match target {
            EffectTarget::Target(i) => ctx
                .targets
                .get(i)
                .copied()
                .filter(|t| *t != TargetRef::None)
                .into_iter()
                .collect(),
            EffectTarget::Controller => vec![TargetRef::Player(ctx.controller)],
            EffectTarget::EachOpponent => self
                .opponents_of(ctx.controller)
                .into_iter()
                .map(TargetRef::Player)
                .collect(),
            EffectTarget::EachPlayer => self
                .apnap_order()
                .into_iter()
                .map(TargetRef::Player)
                .collect(),
            EffectTarget::Source => ctx
                .source
                .filter(|id| self.battlefield.contains(*id))
                .map(TargetRef::Permanent)
                .into_iter()
                .collect(),
            EffectTarget::TriggerSubject => ctx.subject.into_iter().collect(),
            EffectTarget::AllCreatures => self.creatures_where(|_| true),
            EffectTarget::OpponentCreatures => {
                self.creatures_where(|controller| controller != ctx.controller)
            }
        }
    }

    fn creatures_where(&self, controller_ok: impl Fn(PlayerId) -> bool) -> Vec<TargetRef> {
        self.battlefield
            .iter()
            .filter(|id| {
                self.cards
                    .get(*id)
                    .is_ok_and(|c| c.is_creature() && controller_ok(c.controller))
            })
            .map(TargetRef::Permanent)
            .collect()
    }

    fn bound_players(&self, ctx: &ResolutionContext, target: EffectTarget) -> Vec<PlayerId> {
        self.bind_effect_target(ctx, target)
            .into_iter()
            .filter_map(|t| match t {
                TargetRef::Player(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn bound_permanents(&self, ctx: &ResolutionContext, target: EffectTarget) -> Vec<CardId> {
        self.bind_effect_target(ctx, target)
            .into_iter()
            .filter_map(|t| match t {
                TargetRef::Permanent(c) if self.battlefield.contains(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    fn effect_damage_source(&self, ctx: &ResolutionContext) -> DamageSource {
        let has = |keyword| ctx.source.is_some_and(|id| self.has_keyword(id, keyword));
        DamageSource {
            card: ctx.source,
            controller: ctx.controller,
            colors: ctx.source_colors.clone(),
            deathtouch: has(Keyword::Deathtouch),
            lifelink: has(Keyword::Lifelink),
            infect: has(Keyword::Infect),
        }
    }

    /// Execute a single effect
    pub fn execute_effect(&mut self, ctx: &ResolutionContext, effect: &Effect) -> Result<()> {
        match effect {
            Effect::DealDamage { target, amount } => {
                let source = self.effect_damage_source(ctx);
                let amount = amount.resolve(ctx.x);
                for t in self.bind_effect_target(ctx, *target) {
                    self.deal_damage(&source, t, amount)?;
                }
            }
            Effect::GainLife { target, amount } => {
                for player in self.bound_players(ctx, *target) {
                    self.gain_life(player, amount.resolve(ctx.x))?;
                }
            }
            Effect::LoseLife { target, amount } => {
                for player in self.bound_players(ctx, *target) {
                    self.lose_life(player, amount.resolve(ctx.x))?;
                }
            }
            Effect::DrawCards { target, amount } => {
                let count = amount.resolve(ctx.x).max(0) as usize;
                for player in self.bound_players(ctx, *target) {
                    self.draw_cards(player, count)?;
                }
            }
            Effect::Mill { target, amount } => {
                let count = amount.resolve(ctx.x).max(0) as usize;
                for player in self.bound_players(ctx, *target) {
                    self.mill(player, count)?;
                }
            }
            Effect::Destroy { target } => {
                for card_id in self.bound_permanents(ctx, *target) {
                    if self.has_keyword(card_id, Keyword::Indestructible) {
                        self.logger.detail(
                            LogCategory::Effect,
                            format_args!("{} is indestructible", self.card_name(card_id)),
                        );
                        continue;
                    }
                    self.move_card(card_id, Zone::Graveyard)?;
                }
            }
            Effect::Exile { target } => {
                for card_id in self.bound_permanents(ctx, *target) {
                    self.move_card(card_id, Zone::Exile)?;
                }
            }
            Effect::ReturnToHand { target } => {
                for card_id in self.bound_permanents(ctx, *target) {
                    self.move_card(card_id, Zone::Hand)?;
                }
            }
            Effect::Tap { target } => {
                for card_id in self.bound_permanents(ctx, *target) {
                    self.tap_card(card_id)?;
                }
            }
            Effect::Untap { target } => {
                for card_id in self.bound_permanents(ctx, *target) {
                    self.untap_card(card_id)?;
                }
            }
            Effect::Pump {
                target,
                power,
                toughness,
            } => {
                for card_id in self.bound_permanents(ctx, *target) {
                    let card = self.cards.get_mut(card_id)?;
                    card.eot_power += power;
                    card.eot_toughness += toughness;
                    self.journal.log(GameAction::ModifyPowerToughness {
                        card_id,
                        power: *power,
                        toughness: *toughness,
                    });
                }
            }
            Effect::GrantKeyword { target, keyword } => {
                for card_id in self.bound_permanents(ctx, *target) {
                    let card = self.cards.get_mut(card_id)?;
                    if !card.eot_keywords.contains(keyword) {
                        card.eot_keywords.push(*keyword);
                    }
                    self.journal.log(GameAction::GrantKeyword {
                        card_id,
                        keyword: *keyword,
                    });
                }
            }
            Effect::AddCounters {
                target,
                counter,
                amount,
            } => {
                let amount = amount.resolve(ctx.x).max(0) as u32;
                for card_id in self.bound_permanents(ctx, *target) {
                    self.add_counters(card_id, counter.clone(), amount)?;
                }
            }
            Effect::AddPoison { target, amount } => {
                let amount = amount.resolve(ctx.x).max(0) as u32;
                for player in self.bound_players(ctx, *target) {
                    self.add_poison(player, amount)?;
                }
            }
            Effect::AddMana { color, amount } => {
                self.add_mana(ctx.controller, *color, *amount)?;
            }
            Effect::CounterSpell { target } => {
                for t in self.bind_effect_target(ctx, *target) {
                    if let TargetRef::Spell(item) = t {
                        if self.stack.counter(item) {
                            self.journal.log(GameAction::CounterStackItem { item });
                            self.logger.event(
                                LogCategory::Resolve,
                                format_args!("{} is countered", self.target_name(t)),
                            );
                        }
                    }
                }
            }
            Effect::CreateToken { token, count } => {
                for _ in 0..*count {
                    self.create_token(token.clone(), ctx.controller)?;
                }
            }
            Effect::AttachSource { target } => {
                let Some(source) = ctx.source.filter(|id| self.battlefield.contains(*id)) else {
                    return Ok(());
                };
                if let Some(&host) = self.bound_permanents(ctx, *target).first() {
                    self.attach(source, Some(host))?;
                }
            }
            Effect::Unrecognized { description } => {
                self.logger.event(
                    LogCategory::Effect,
                    format_args!("Unrecognized effect ignored: {description}"),
                );
            }
        }
        Ok(())
    }

    // ---- stack resolution ------------------------------------------------

    /// Resolve the top item of the stack
    ///
    /// Countered items do nothing; items whose targets all became illegal
    /// fizzle. A spell card ends on the battlefield (permanents) or in its
    /// owner's graveyard.
    pub(crate) fn resolve_top(&mut self) -> Result<()> {
        let item = self
            .stack
            .pop()
            .ok_or_else(|| MtgError::InvalidAction("resolve with an empty stack".to_string()))?;
        let spell_card = item.spell_card();

        if item.countered {
            self.journal.log(GameAction::RemoveStackItem { item: item.id });
            self.logger.event(
                LogCategory::Resolve,
                format_args!("{} leaves the stack countered", item.source_name),
            );
            if let Some(card_id) = spell_card {
                self.move_card(card_id, Zone::Graveyard)?;
            }
            return Ok(());
        }

        let legal = self.validate_all_targets(&item);
        let outcome = fizzle_outcome(self.config.fizzle_policy, &legal);
        if outcome == FizzleOutcome::Fizzle {
            self.journal.log(GameAction::Fizzle { item: item.id });
            self.logger.event(
                LogCategory::Fizzle,
                format_args!("{} fizzles (no legal targets)", item.source_name),
            );
            if let Some(card_id) = spell_card {
                self.move_card(card_id, Zone::Graveyard)?;
            }
            return Ok(());
        }

        self.journal.log(GameAction::ResolveStack { item: item.id });
        self.logger.event(
            LogCategory::Resolve,
            format_args!(
                "{}'s {} resolves",
                self.player_name(item.controller),
                item.source_name
            ),
        );

        let mut ctx = ResolutionContext::from_item(&item);
        if outcome == FizzleOutcome::ResolvePartial {
            for (target, ok) in ctx.targets.iter_mut().zip(&legal) {
                if !ok {
                    *target = TargetRef::None;
                }
            }
        }

        for effect in &item.effects {
            self.execute_effect(&ctx, effect)?;
        }

        if let Some(card_id) = spell_card {
            let (permanent, aura) = {
                let card = self.cards.get(card_id)?;
                (card.is_permanent(), card.is_aura())
            };
            if permanent {
                self.move_card(card_id, Zone::Battlefield)?;
                if aura {
                    if let Some(TargetRef::Permanent(host)) = ctx.targets.first().copied() {
                        self.attach(card_id, Some(host))?;
                    }
                }
            } else {
                self.move_card(card_id, Zone::Graveyard)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Amount, CardType, ManaCost, StackItemId, TargetKind, TargetRequirement, TriggerEventKind,
        TriggeredAbilityDef,
    };
    use crate::game::stack::StackItemKind;

    fn def(name: &str, cost: &str) -> CardDefinition {
        CardDefinition::new(name, ManaCost::parse(cost).unwrap())
    }

    fn onto_battlefield(game: &mut GameState, definition: CardDefinition, owner: PlayerId) -> CardId {
        let card = game.create_card_in_library(Arc::new(definition), owner).unwrap();
        game.move_card(card, Zone::Battlefield).unwrap();
        card
    }

    fn spell_item(game: &mut GameState, card: CardId, targets: Vec<TargetRef>) -> StackItem {
        let (name, colors, controller, requirements, effects) = {
            let c = game.cards.get(card).unwrap();
            (
                c.name().clone(),
                c.colors().iter().copied().collect(),
                c.controller,
                c.definition.spell_targets.clone(),
                c.definition.spell_effects.clone(),
            )
        };
        game.move_card(card, Zone::Stack).unwrap();
        StackItem {
            id: game.next_id::<StackItem>(),
            kind: StackItemKind::Spell,
            source: Some(card),
            source_name: name,
            source_colors: colors,
            controller,
            targets,
            requirements,
            effects,
            x_value: 0,
            subject: None,
            countered: false,
        }
    }

    #[test]
    fn test_move_card_battlefield_to_graveyard() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let bear = onto_battlefield(&mut game, def("Grizzly Bears", "1G").creature(2, 2), alice);
        game.cards.get_mut(bear).unwrap().tapped = true;

        game.move_card(bear, Zone::Graveyard).unwrap();
        assert!(!game.battlefield.contains(bear));
        assert!(game.get_player_zones(alice).unwrap().graveyard.contains(bear));
        let card = game.cards.get(bear).unwrap();
        assert!(!card.tapped);
        assert_eq!(card.zone, Zone::Graveyard);
        game.verify_zone_uniqueness().unwrap();
    }

    #[test]
    fn test_draw_from_empty_library_flags_player() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        assert_eq!(game.draw_card(alice).unwrap(), None);
        assert!(game.get_player(alice).unwrap().drew_from_empty_library);
        // No immediate loss
        assert!(game.get_player(alice).unwrap().is_alive());
    }

    #[test]
    fn test_lifelink_and_infect_damage() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let bob = game.players[1].id;
        let linker = onto_battlefield(
            &mut game,
            def("Vampire Nighthawk", "1BB")
                .creature(2, 3)
                .with_keyword(Keyword::Lifelink),
            alice,
        );
        let source = game.damage_source(linker).unwrap();
        assert_eq!(game.deal_damage(&source, TargetRef::Player(bob), 2).unwrap(), 2);
        assert_eq!(game.get_player(bob).unwrap().life, 18);
        assert_eq!(game.get_player(alice).unwrap().life, 22);

        let infector = onto_battlefield(
            &mut game,
            def("Plague Stinger", "1B").creature(1, 1).with_keyword(Keyword::Infect),
            alice,
        );
        let bear = onto_battlefield(&mut game, def("Grizzly Bears", "1G").creature(2, 2), bob);
        let source = game.damage_source(infector).unwrap();
        game.deal_damage(&source, TargetRef::Player(bob), 1).unwrap();
        game.deal_damage(&source, TargetRef::Permanent(bear), 1).unwrap();
        assert_eq!(game.get_player(bob).unwrap().poison_counters, 1);
        assert_eq!(game.get_player(bob).unwrap().life, 18);
        assert_eq!(game.effective_toughness(bear), 1);
        assert_eq!(game.cards.get(bear).unwrap().damage, 0);
    }

    #[test]
    fn test_protection_prevents_damage() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let bob = game.players[1].id;
        let knight = onto_battlefield(
            &mut game,
            def("White Knight", "WW")
                .creature(2, 2)
                .with_keyword(Keyword::ProtectionFrom(Color::Black)),
            bob,
        );
        let source = DamageSource {
            card: None,
            controller: alice,
            colors: SmallVec::from_slice(&[Color::Black]),
            deathtouch: false,
            lifelink: false,
            infect: false,
        };
        assert_eq!(game.deal_damage(&source, TargetRef::Permanent(knight), 5).unwrap(), 0);
        assert_eq!(game.cards.get(knight).unwrap().damage, 0);
    }

    #[test]
    fn test_resolve_damage_spell() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let bob = game.players[1].id;
        let bolt = game
            .create_card_in_hand(
                Arc::new(
                    def("Lightning Bolt", "R").with_type(CardType::Instant).with_spell(
                        vec![TargetRequirement::new(TargetKind::Any)],
                        vec![Effect::DealDamage {
                            target: EffectTarget::Target(0),
                            amount: Amount::Fixed(3),
                        }],
                    ),
                ),
                alice,
            )
            .unwrap();
        let item = spell_item(&mut game, bolt, vec![TargetRef::Player(bob)]);
        game.stack.push(item);

        game.resolve_top().unwrap();
        assert_eq!(game.get_player(bob).unwrap().life, 17);
        assert!(game.get_player_zones(alice).unwrap().graveyard.contains(bolt));
        assert!(game.stack.is_empty());
    }

    #[test]
    fn test_countered_spell_goes_to_graveyard_without_effect() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let bear = game
            .create_card_in_hand(Arc::new(def("Grizzly Bears", "1G").creature(2, 2)), alice)
            .unwrap();
        let item = spell_item(&mut game, bear, vec![]);
        let id: StackItemId = item.id;
        game.stack.push(item);
        assert!(game.stack.counter(id));

        game.resolve_top().unwrap();
        assert!(!game.battlefield.contains(bear));
        assert!(game.get_player_zones(alice).unwrap().graveyard.contains(bear));
    }

    #[test]
    fn test_spell_fizzles_when_target_leaves() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let bob = game.players[1].id;
        let bear = onto_battlefield(&mut game, def("Grizzly Bears", "1G").creature(2, 2), bob);
        let murder = game
            .create_card_in_hand(
                Arc::new(
                    def("Murder", "1BB").with_type(CardType::Instant).with_spell(
                        vec![TargetRequirement::new(TargetKind::Creature)],
                        vec![Effect::Destroy {
                            target: EffectTarget::Target(0),
                        }],
                    ),
                ),
                alice,
            )
            .unwrap();
        let item = spell_item(&mut game, murder, vec![TargetRef::Permanent(bear)]);
        game.stack.push(item);

        // The target is bounced in response
        game.move_card(bear, Zone::Hand).unwrap();
        game.resolve_top().unwrap();

        assert!(game
            .journal
            .actions()
            .iter()
            .any(|a| matches!(a, GameAction::Fizzle { .. })));
        assert!(game.get_player_zones(alice).unwrap().graveyard.contains(murder));
        assert!(game.get_player_zones(bob).unwrap().hand.contains(bear));
    }

    #[test]
    fn test_aura_attaches_on_resolution() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let bear = onto_battlefield(&mut game, def("Grizzly Bears", "1G").creature(2, 2), alice);
        let aura = game
            .create_card_in_hand(
                Arc::new(
                    def("Rancor", "G")
                        .with_type(CardType::Enchantment)
                        .with_subtype("Aura")
                        .with_spell(vec![TargetRequirement::new(TargetKind::Creature)], vec![])
                        .with_attached_buff(crate::core::AttachedBuff {
                            power: 2,
                            toughness: 0,
                            keywords: vec![Keyword::Trample],
                        }),
                ),
                alice,
            )
            .unwrap();
        let item = spell_item(&mut game, aura, vec![TargetRef::Permanent(bear)]);
        game.stack.push(item);
        game.resolve_top().unwrap();

        assert_eq!(game.cards.get(aura).unwrap().attached_to, Some(bear));
        assert_eq!(game.effective_power(bear), 4);
        assert!(game.has_keyword(bear, Keyword::Trample));
    }

    #[test]
    fn test_etb_trigger_queued_on_enter() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        onto_battlefield(
            &mut game,
            def("Healer", "1W").creature(1, 1).with_trigger(TriggeredAbilityDef::new(
                TriggerEventKind::EntersBattlefield,
                vec![Effect::GainLife {
                    target: EffectTarget::Controller,
                    amount: Amount::Fixed(2),
                }],
            )),
            alice,
        );
        assert_eq!(game.triggers.pending().len(), 1);
        assert!(game.place_pending_triggers());
        assert_eq!(game.stack.len(), 1);

        game.resolve_top().unwrap();
        assert_eq!(game.get_player(alice).unwrap().life, 22);
    }

    #[test]
    fn test_cleanup_discards_highest_index_and_heals() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        game.config.max_hand_size = 2;
        let hand: Vec<CardId> = (0..4)
            .map(|i| {
                game.create_card_in_hand(Arc::new(def(&format!("Card {i}"), "1")), alice)
                    .unwrap()
            })
            .collect();
        let bear = onto_battlefield(&mut game, def("Grizzly Bears", "1G").creature(2, 2), alice);
        game.cards.get_mut(bear).unwrap().damage = 1;
        game.cards.get_mut(bear).unwrap().eot_power = 3;

        game.cleanup_step().unwrap();
        assert_eq!(game.hand(alice), &hand[..2]);
        let card = game.cards.get(bear).unwrap();
        assert_eq!(card.damage, 0);
        assert_eq!(card.current_power(), 2);
    }
}
