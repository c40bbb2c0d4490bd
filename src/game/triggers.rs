//! Triggered abilities
//!
//! Watchers are registered for permanents with triggered abilities. When an
//! event fires, matching watchers only enqueue a `PendingTrigger`; pending
//! triggers are put on the stack at the next point a player would receive
//! priority, in APNAP order.

use crate::core::{
    CardId, CardName, Color, Effect, PlayerId, TargetController, TriggerEventKind, TriggerFilter,
    TriggerId, TriggerSubject, TriggeredAbilityDef,
};
use crate::game::stack::{StackItem, StackItemKind};
use crate::game::targeting::TargetRef;
use crate::game::{GameState, LogCategory};
use crate::journal::GameAction;
use crate::zones::Zone;
use crate::Result;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Something that happened in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    EntersBattlefield { card: CardId, controller: PlayerId },
    LeavesBattlefield { card: CardId, controller: PlayerId, to: Zone },
    Dies { card: CardId, controller: PlayerId },
    SpellCast { card: CardId, controller: PlayerId },
    BeginningOfUpkeep { player: PlayerId },
    BeginningOfEndStep { player: PlayerId },
    Attacks { card: CardId, controller: PlayerId },
    Blocks { card: CardId, controller: PlayerId },
    DealsCombatDamageToPlayer {
        card: CardId,
        controller: PlayerId,
        player: PlayerId,
        amount: i32,
    },
    LifeGained { player: PlayerId, amount: i32 },
    CardDrawn { player: PlayerId, card: CardId },
}

impl TriggerEvent {
    pub fn kind(&self) -> TriggerEventKind {
        match self {
            TriggerEvent::EntersBattlefield { .. } => TriggerEventKind::EntersBattlefield,
            TriggerEvent::LeavesBattlefield { .. } => TriggerEventKind::LeavesBattlefield,
            TriggerEvent::Dies { .. } => TriggerEventKind::Dies,
            TriggerEvent::SpellCast { .. } => TriggerEventKind::SpellCast,
            TriggerEvent::BeginningOfUpkeep { .. } => TriggerEventKind::BeginningOfUpkeep,
            TriggerEvent::BeginningOfEndStep { .. } => TriggerEventKind::BeginningOfEndStep,
            TriggerEvent::Attacks { .. } => TriggerEventKind::Attacks,
            TriggerEvent::Blocks { .. } => TriggerEventKind::Blocks,
            TriggerEvent::DealsCombatDamageToPlayer { .. } => {
                TriggerEventKind::DealsCombatDamageToPlayer
            }
            TriggerEvent::LifeGained { .. } => TriggerEventKind::LifeGained,
            TriggerEvent::CardDrawn { .. } => TriggerEventKind::CardDrawn,
        }
    }

    /// The card the event is about, for object events
    pub fn subject_card(&self) -> Option<CardId> {
        match *self {
            TriggerEvent::EntersBattlefield { card, .. }
            | TriggerEvent::LeavesBattlefield { card, .. }
            | TriggerEvent::Dies { card, .. }
            | TriggerEvent::SpellCast { card, .. }
            | TriggerEvent::Attacks { card, .. }
            | TriggerEvent::Blocks { card, .. }
            | TriggerEvent::DealsCombatDamageToPlayer { card, .. } => Some(card),
            TriggerEvent::BeginningOfUpkeep { .. }
            | TriggerEvent::BeginningOfEndStep { .. }
            | TriggerEvent::LifeGained { .. }
            | TriggerEvent::CardDrawn { .. } => None,
        }
    }

    /// The player the event belongs to: the object's controller, or the
    /// player the step or life change is about
    pub fn subject_player(&self) -> PlayerId {
        match *self {
            TriggerEvent::EntersBattlefield { controller, .. }
            | TriggerEvent::LeavesBattlefield { controller, .. }
            | TriggerEvent::Dies { controller, .. }
            | TriggerEvent::SpellCast { controller, .. }
            | TriggerEvent::Attacks { controller, .. }
            | TriggerEvent::Blocks { controller, .. }
            | TriggerEvent::DealsCombatDamageToPlayer { controller, .. } => controller,
            TriggerEvent::BeginningOfUpkeep { player }
            | TriggerEvent::BeginningOfEndStep { player }
            | TriggerEvent::LifeGained { player, .. }
            | TriggerEvent::CardDrawn { player, .. } => player,
        }
    }

    /// What `EffectTarget::TriggerSubject` refers to
    pub fn subject_ref(&self) -> TargetRef {
        match *self {
            TriggerEvent::DealsCombatDamageToPlayer { player, .. } => TargetRef::Player(player),
            _ => match self.subject_card() {
                Some(card) => TargetRef::Permanent(card),
                None => TargetRef::Player(self.subject_player()),
            },
        }
    }
}

/// A registered triggered ability of a permanent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerWatcher {
    pub id: TriggerId,
    pub source: CardId,
    pub controller: PlayerId,
    pub event: TriggerEventKind,
    pub filter: TriggerFilter,
    pub effects: Vec<Effect>,
    pub description: String,
}

impl TriggerWatcher {
    /// Does `event` match this watcher?
    ///
    /// `is_creature` reports whether the event's subject card is a creature.
    pub fn matches(&self, event: &TriggerEvent, is_creature: impl Fn(CardId) -> bool) -> bool {
        if event.kind() != self.event {
            return false;
        }

        let player = event.subject_player();
        let controller_ok = match self.filter.controller {
            TargetController::Any => true,
            TargetController::You => player == self.controller,
            TargetController::Opponent => player != self.controller,
        };
        if !controller_ok {
            return false;
        }

        match event.subject_card() {
            Some(card) => {
                let subject_ok = match self.filter.subject {
                    TriggerSubject::This => card == self.source,
                    TriggerSubject::Another => card != self.source,
                    TriggerSubject::Any => true,
                };
                subject_ok && (!self.filter.creature_only || is_creature(card))
            }
            None => true,
        }
    }
}

/// A trigger waiting to be put on the stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTrigger {
    pub trigger: TriggerId,
    pub source: CardId,
    pub source_name: CardName,
    pub source_colors: SmallVec<[Color; 2]>,
    pub controller: PlayerId,
    pub effects: Vec<Effect>,
    pub subject: TargetRef,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerManager {
    watchers: Vec<TriggerWatcher>,
    /// In firing order
    pending: Vec<PendingTrigger>,
}

impl TriggerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_trigger(
        &mut self,
        id: TriggerId,
        source: CardId,
        controller: PlayerId,
        def: &TriggeredAbilityDef,
    ) {
        self.watchers.push(TriggerWatcher {
            id,
            source,
            controller,
            event: def.event,
            filter: def.filter,
            effects: def.effects.clone(),
            description: def.description.clone(),
        });
    }

    /// Remove every watcher of a source (it left the battlefield)
    pub fn unregister_source(&mut self, source: CardId) {
        self.watchers.retain(|w| w.source != source);
    }

    /// Remove watchers controlled by an eliminated player
    pub fn unregister_controller(&mut self, controller: PlayerId) {
        self.watchers.retain(|w| w.controller != controller);
        self.pending.retain(|p| p.controller != controller);
    }

    pub fn watchers(&self) -> &[TriggerWatcher] {
        &self.watchers
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> &[PendingTrigger] {
        &self.pending
    }

    pub fn enqueue(&mut self, trigger: PendingTrigger) {
        self.pending.push(trigger);
    }

    /// Drain pending triggers in stack-push order
    ///
    /// `apnap` lists players starting with the active player. The active
    /// player's triggers come first so they end up lowest on the stack;
    /// within one controller, firing order is kept.
    pub fn take_pending_apnap(&mut self, apnap: &[PlayerId]) -> Vec<PendingTrigger> {
        let mut pending = std::mem::take(&mut self.pending);
        let rank = |player: PlayerId| {
            apnap
                .iter()
                .position(|p| *p == player)
                .unwrap_or(apnap.len())
        };
        // Stable sort keeps firing order within a controller
        pending.sort_by_key(|t| rank(t.controller));
        pending
    }
}

impl GameState {
    /// Register the triggered abilities of a permanent that just entered
    pub(crate) fn register_card_triggers(&mut self, card_id: CardId) -> Result<()> {
        let card = self.cards.get(card_id)?;
        let controller = card.controller;
        let definition = card.definition.clone();
        for def in &definition.triggered_abilities {
            let id = self.next_id();
            self.triggers.register_trigger(id, card_id, controller, def);
        }
        Ok(())
    }

    /// Enqueue every trigger matching `event`
    pub fn fire_trigger(&mut self, event: TriggerEvent) {
        let cards = &self.cards;
        let is_creature = |id: CardId| cards.get(id).is_ok_and(|c| c.is_creature());
        let matched: Vec<PendingTrigger> = self
            .triggers
            .watchers()
            .iter()
            .filter(|w| w.matches(&event, is_creature))
            .map(|w| {
                let (source_name, source_colors) = cards
                    .get(w.source)
                    .map(|c| (c.name().clone(), c.colors().iter().copied().collect()))
                    .unwrap_or_else(|_| (CardName::new("?"), SmallVec::new()));
                PendingTrigger {
                    trigger: w.id,
                    source: w.source,
                    source_name,
                    source_colors,
                    controller: w.controller,
                    effects: w.effects.clone(),
                    subject: event.subject_ref(),
                    description: w.description.clone(),
                }
            })
            .collect();

        for trigger in matched {
            self.logger.detail(
                LogCategory::Trigger,
                format_args!("{} triggers: {}", trigger.source_name, trigger.description),
            );
            self.triggers.enqueue(trigger);
        }
    }

    /// Put pending triggers on the stack in APNAP order
    ///
    /// Returns true when anything was placed.
    pub(crate) fn place_pending_triggers(&mut self) -> bool {
        if !self.triggers.has_pending() {
            return false;
        }
        let apnap = self.apnap_order();
        let pending = self.triggers.take_pending_apnap(&apnap);
        for trigger in pending {
            let id = self.next_id();
            self.journal.log(GameAction::PushStack {
                item: id,
                source: Some(trigger.source),
                controller: trigger.controller,
            });
            self.logger.event(
                LogCategory::Trigger,
                format_args!(
                    "{}'s {} trigger goes on the stack",
                    self.player_name(trigger.controller),
                    trigger.source_name
                ),
            );
            self.stack.push(StackItem {
                id,
                kind: StackItemKind::TriggeredAbility {
                    trigger: trigger.trigger,
                },
                source: Some(trigger.source),
                source_name: trigger.source_name,
                source_colors: trigger.source_colors,
                controller: trigger.controller,
                targets: Vec::new(),
                requirements: Vec::new(),
                effects: trigger.effects,
                x_value: 0,
                subject: Some(trigger.subject),
                countered: false,
            });
        }
        true
    }
}
