//! Combat: attack and block declarations, and combat damage
//!
//! `CombatState` holds the assignment for the current combat. The rules that
//! validate declarations and assign damage are implemented on `GameState`.

use crate::core::{CardId, Keyword, PlayerId};
use crate::error::{ReasonCode, RulesViolation};
use crate::game::actions::DamageSource;
use crate::game::targeting::TargetRef;
use crate::game::triggers::TriggerEvent;
use crate::game::{GameState, LogCategory};
use crate::journal::GameAction;
use crate::Result;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// What an attacking creature is attacking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttackTarget {
    Player(PlayerId),
    Planeswalker(CardId),
}

impl fmt::Display for AttackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackTarget::Player(p) => write!(f, "player {p}"),
            AttackTarget::Planeswalker(c) => write!(f, "planeswalker {c}"),
        }
    }
}

/// Where the current combat is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CombatPhase {
    #[default]
    Idle,
    AttackersDeclared,
    BlockersDeclared,
    DamageAssigned,
}

/// Combat state for the current combat phase
///
/// Uses BTreeMap for deterministic iteration order. Reset at end of combat.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CombatState {
    /// Attacker -> what it attacks
    pub attackers: BTreeMap<CardId, AttackTarget>,

    /// Attackers in declaration order
    pub attack_order: Vec<CardId>,

    /// Blocker -> the attacker it blocks
    pub blockers: BTreeMap<CardId, CardId>,

    /// Attacker -> blockers in damage assignment order (declaration order)
    ///
    /// An entry stays after its blockers leave: the attacker remains blocked.
    pub attacker_blockers: BTreeMap<CardId, SmallVec<[CardId; 4]>>,

    /// Creatures that dealt damage in the first-strike step
    pub dealt_first_strike: BTreeSet<CardId>,

    /// Defending players who have declared blockers
    pub blocks_declared: SmallVec<[PlayerId; 4]>,

    pub phase: CombatPhase,

    /// Whether combat has started this turn
    pub combat_active: bool,
}

impl CombatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) {
        self.clear();
        self.combat_active = true;
    }

    pub fn declare_attacker(&mut self, attacker: CardId, target: AttackTarget) {
        self.attackers.insert(attacker, target);
        self.attack_order.push(attacker);
    }

    pub fn declare_blocker(&mut self, blocker: CardId, attacker: CardId) {
        self.blockers.insert(blocker, attacker);
        self.attacker_blockers
            .entry(attacker)
            .or_default()
            .push(blocker);
    }

    pub fn is_attacking(&self, card_id: CardId) -> bool {
        self.attackers.contains_key(&card_id)
    }

    pub fn is_blocking(&self, card_id: CardId) -> bool {
        self.blockers.contains_key(&card_id)
    }

    /// An attacker is blocked once any blocker was declared for it
    pub fn is_blocked(&self, attacker: CardId) -> bool {
        self.attacker_blockers.contains_key(&attacker)
    }

    pub fn get_blockers(&self, attacker: CardId) -> SmallVec<[CardId; 4]> {
        self.attacker_blockers
            .get(&attacker)
            .cloned()
            .unwrap_or_default()
    }

    pub fn attack_target(&self, attacker: CardId) -> Option<AttackTarget> {
        self.attackers.get(&attacker).copied()
    }

    pub fn has_attackers(&self) -> bool {
        !self.attackers.is_empty()
    }

    /// Drop a creature that left combat (left the battlefield)
    pub fn remove_from_combat(&mut self, card_id: CardId) {
        self.attackers.remove(&card_id);
        self.attack_order.retain(|id| *id != card_id);
        self.blockers.remove(&card_id);
        for blockers in self.attacker_blockers.values_mut() {
            blockers.retain(|id| *id != card_id);
        }
    }

    pub fn clear(&mut self) {
        self.attackers.clear();
        self.attack_order.clear();
        self.blockers.clear();
        self.attacker_blockers.clear();
        self.dealt_first_strike.clear();
        self.blocks_declared.clear();
        self.phase = CombatPhase::Idle;
        self.combat_active = false;
    }
}

fn illegal(code: ReasonCode) -> RulesViolation {
    RulesViolation::IllegalIntent(code)
}

impl GameState {
    /// Creatures `player` could declare as attackers right now
    pub fn potential_attackers(&self, player: PlayerId) -> Vec<CardId> {
        self.permanents_controlled_by(player)
            .into_iter()
            .filter(|&id| {
                self.cards.get(id).is_ok_and(|c| {
                    c.is_creature()
                        && !c.tapped
                        && !self.is_summoning_sick(id)
                        && !self.has_keyword(id, Keyword::Defender)
                })
            })
            .collect()
    }

    /// Opponents still in the game and the planeswalkers they control
    pub fn attack_targets(&self, player: PlayerId) -> Vec<AttackTarget> {
        let opponents = self.opponents_of(player);
        let mut targets: Vec<AttackTarget> =
            opponents.iter().map(|p| AttackTarget::Player(*p)).collect();
        targets.extend(
            self.battlefield
                .iter()
                .filter(|&id| {
                    self.cards
                        .get(id)
                        .is_ok_and(|c| c.is_planeswalker() && opponents.contains(&c.controller))
                })
                .map(AttackTarget::Planeswalker),
        );
        targets
    }

    /// The player defending against an attack target
    pub fn defending_player(&self, target: AttackTarget) -> Option<PlayerId> {
        match target {
            AttackTarget::Player(p) => Some(p),
            AttackTarget::Planeswalker(card) => self.cards.get(card).ok().map(|c| c.controller),
        }
    }

    pub fn validate_attackers(
        &self,
        player: PlayerId,
        declarations: &[(CardId, AttackTarget)],
    ) -> std::result::Result<(), RulesViolation> {
        if self.combat.phase != CombatPhase::Idle {
            return Err(illegal(ReasonCode::AlreadyDeclared));
        }
        let targets = self.attack_targets(player);
        for (i, (attacker, target)) in declarations.iter().enumerate() {
            if declarations[..i].iter().any(|(a, _)| a == attacker) {
                return Err(illegal(ReasonCode::DuplicateDeclaration));
            }
            let card = self
                .cards
                .get(*attacker)
                .map_err(|_| illegal(ReasonCode::CardNotOnBattlefield))?;
            if !self.battlefield.contains(*attacker) {
                return Err(illegal(ReasonCode::CardNotOnBattlefield));
            }
            if card.controller != player {
                return Err(illegal(ReasonCode::NotController));
            }
            if !card.is_creature() {
                return Err(illegal(ReasonCode::NotACreature));
            }
            // Vigilance only means attacking doesn't tap; tapped creatures can't attack
            if card.tapped {
                return Err(illegal(ReasonCode::AlreadyTapped));
            }
            if self.is_summoning_sick(*attacker) {
                return Err(illegal(ReasonCode::SummoningSick));
            }
            if self.has_keyword(*attacker, Keyword::Defender) {
                return Err(illegal(ReasonCode::HasDefender));
            }
            if !targets.contains(target) {
                return Err(illegal(ReasonCode::InvalidAttackTarget));
            }
        }
        Ok(())
    }

    /// Commit a validated attack declaration
    pub(crate) fn declare_attackers(
        &mut self,
        player: PlayerId,
        declarations: &[(CardId, AttackTarget)],
    ) -> Result<()> {
        for &(attacker, target) in declarations {
            if !self.has_keyword(attacker, Keyword::Vigilance) {
                self.tap_card(attacker)?;
            }
            self.combat.declare_attacker(attacker, target);
            self.journal.log(GameAction::DeclareAttacker { attacker, target });
            self.logger.event(
                LogCategory::Combat,
                format_args!(
                    "{} attacks {} with {}",
                    self.player_name(player),
                    self.attack_target_name(target),
                    self.card_name(attacker)
                ),
            );
        }
        self.combat.phase = CombatPhase::AttackersDeclared;
        for &(attacker, _) in declarations {
            self.fire_trigger(TriggerEvent::Attacks {
                card: attacker,
                controller: player,
            });
        }
        Ok(())
    }

    fn attack_target_name(&self, target: AttackTarget) -> &str {
        match target {
            AttackTarget::Player(p) => self.player_name(p),
            AttackTarget::Planeswalker(c) => self.card_name(c),
        }
    }

    /// Players being attacked (directly or through a planeswalker), APNAP
    /// order
    pub fn defending_players(&self) -> Vec<PlayerId> {
        let attacked: BTreeSet<PlayerId> = self
            .combat
            .attackers
            .values()
            .filter_map(|t| self.defending_player(*t))
            .collect();
        self.apnap_order()
            .into_iter()
            .filter(|p| attacked.contains(p))
            .collect()
    }

    /// Next defending player who still has to declare blockers
    pub fn pending_blocker_declarer(&self) -> Option<PlayerId> {
        if self.combat.phase != CombatPhase::AttackersDeclared {
            return None;
        }
        self.defending_players()
            .into_iter()
            .find(|p| !self.combat.blocks_declared.contains(p))
    }

    /// Start of the declare blockers step: defenders with nothing that
    /// could block are treated as having declared no blocks
    pub(crate) fn begin_declare_blockers(&mut self) {
        for player in self.defending_players() {
            if self.potential_blockers(player).is_empty() {
                self.combat.blocks_declared.push(player);
            }
        }
        if self.pending_blocker_declarer().is_none() {
            self.combat.phase = CombatPhase::BlockersDeclared;
        }
    }

    /// Untapped creatures `player` could block with
    pub fn potential_blockers(&self, player: PlayerId) -> Vec<CardId> {
        self.permanents_controlled_by(player)
            .into_iter()
            .filter(|&id| self.cards.get(id).is_ok_and(|c| c.is_creature() && !c.tapped))
            .collect()
    }

    /// Can `blocker` block `attacker`, ignoring menace (which depends on
    /// the whole declaration)?
    pub fn can_block(&self, blocker: CardId, attacker: CardId) -> std::result::Result<(), RulesViolation> {
        if self.has_keyword(attacker, Keyword::Flying)
            && !self.has_keyword(blocker, Keyword::Flying)
            && !self.has_keyword(blocker, Keyword::Reach)
        {
            return Err(illegal(ReasonCode::CannotBlockFlyer));
        }
        let blocker_card = self.cards.get(blocker).map_err(RulesViolation::from)?;
        if blocker_card
            .colors()
            .iter()
            .any(|&color| self.has_keyword(attacker, Keyword::ProtectionFrom(color)))
        {
            return Err(illegal(ReasonCode::ProtectionForbidsBlock));
        }
        Ok(())
    }

    pub fn validate_blockers(
        &self,
        player: PlayerId,
        blocks: &[(CardId, CardId)],
    ) -> std::result::Result<(), RulesViolation> {
        if self.combat.blocks_declared.contains(&player) {
            return Err(illegal(ReasonCode::AlreadyDeclared));
        }
        for (i, (blocker, attacker)) in blocks.iter().enumerate() {
            if blocks[..i].iter().any(|(b, _)| b == blocker) {
                return Err(illegal(ReasonCode::DuplicateDeclaration));
            }
            let card = self
                .cards
                .get(*blocker)
                .map_err(|_| illegal(ReasonCode::CardNotOnBattlefield))?;
            if !self.battlefield.contains(*blocker) {
                return Err(illegal(ReasonCode::CardNotOnBattlefield));
            }
            if card.controller != player {
                return Err(illegal(ReasonCode::NotController));
            }
            if !card.is_creature() {
                return Err(illegal(ReasonCode::NotACreature));
            }
            if card.tapped {
                return Err(illegal(ReasonCode::AlreadyTapped));
            }
            let Some(target) = self.combat.attack_target(*attacker) else {
                return Err(illegal(ReasonCode::NotAttacking));
            };
            if self.defending_player(target) != Some(player) {
                return Err(illegal(ReasonCode::NotDefending));
            }
            self.can_block(*blocker, *attacker)?;
        }

        // Menace: every menace attacker blocked here needs two or more blockers
        let mut per_attacker: BTreeMap<CardId, usize> = BTreeMap::new();
        for (_, attacker) in blocks {
            *per_attacker.entry(*attacker).or_default() += 1;
        }
        for (attacker, count) in per_attacker {
            if count == 1 && self.has_keyword(attacker, Keyword::Menace) {
                return Err(illegal(ReasonCode::MenaceNeedsTwoBlockers));
            }
        }
        Ok(())
    }

    /// Commit a validated block declaration
    pub(crate) fn declare_blockers(&mut self, player: PlayerId, blocks: &[(CardId, CardId)]) -> Result<()> {
        for &(blocker, attacker) in blocks {
            self.combat.declare_blocker(blocker, attacker);
            self.journal.log(GameAction::DeclareBlocker { blocker, attacker });
            self.logger.event(
                LogCategory::Combat,
                format_args!(
                    "{} blocks {} with {}",
                    self.player_name(player),
                    self.card_name(attacker),
                    self.card_name(blocker)
                ),
            );
        }
        self.combat.blocks_declared.push(player);
        if self.pending_blocker_declarer().is_none() {
            self.combat.phase = CombatPhase::BlockersDeclared;
        }
        for &(blocker, _) in blocks {
            self.fire_trigger(TriggerEvent::Blocks {
                card: blocker,
                controller: player,
            });
        }
        Ok(())
    }

    /// Is a first-strike damage step needed this combat?
    pub fn needs_first_strike_step(&self) -> bool {
        self.combat
            .attackers
            .keys()
            .chain(self.combat.blockers.keys())
            .any(|&id| {
                self.has_keyword(id, Keyword::FirstStrike) || self.has_keyword(id, Keyword::DoubleStrike)
            })
    }

    fn deals_damage_this_step(&self, creature: CardId, first_strike_step: bool) -> bool {
        if !self.battlefield.contains(creature) {
            return false;
        }
        let double = self.has_keyword(creature, Keyword::DoubleStrike);
        if first_strike_step {
            double || self.has_keyword(creature, Keyword::FirstStrike)
        } else {
            double || !self.combat.dealt_first_strike.contains(&creature)
        }
    }

    /// Damage still needed to destroy `blocker`, counting damage already
    /// marked and damage assigned earlier in this step
    fn lethal_damage(&self, blocker: CardId, assigned: i32, deathtouch: bool) -> i32 {
        if deathtouch {
            return if assigned > 0 { 0 } else { 1 };
        }
        let marked = self.cards.get(blocker).map(|c| c.damage).unwrap_or(0);
        (self.effective_toughness(blocker) - marked - assigned).max(0)
    }

    /// Compute and apply one combat damage step
    ///
    /// All assignments are computed from the state at the start of the step
    /// and then dealt simultaneously.
    pub(crate) fn combat_damage_step(&mut self, first_strike_step: bool) -> Result<()> {
        let mut assignments: Vec<(DamageSource, TargetRef, i32)> = Vec::new();
        let mut dealers: Vec<CardId> = Vec::new();

        let attack_order = self.combat.attack_order.clone();
        for attacker in attack_order {
            if !self.deals_damage_this_step(attacker, first_strike_step) {
                continue;
            }
            let Some(target) = self.combat.attack_target(attacker) else {
                continue;
            };
            let power = self.effective_power(attacker);
            dealers.push(attacker);
            if power <= 0 {
                continue;
            }
            let source = self.damage_source(attacker)?;
            let target_ref = match target {
                AttackTarget::Player(p) => TargetRef::Player(p),
                AttackTarget::Planeswalker(c) => TargetRef::Permanent(c),
            };
            let trample = self.has_keyword(attacker, Keyword::Trample);

            if !self.combat.is_blocked(attacker) {
                assignments.push((source, target_ref, power));
                continue;
            }

            let blockers: Vec<CardId> = self
                .combat
                .get_blockers(attacker)
                .into_iter()
                .filter(|b| self.battlefield.contains(*b))
                .collect();
            if blockers.is_empty() {
                // Blocked, but nothing left to hit: only trample reaches through
                if trample {
                    assignments.push((source, target_ref, power));
                }
                continue;
            }

            let mut remaining = power;
            let last = blockers.len() - 1;
            for (i, blocker) in blockers.iter().enumerate() {
                if remaining == 0 {
                    break;
                }
                let lethal = self.lethal_damage(*blocker, 0, source.deathtouch);
                let amount = if i == last && !trample {
                    remaining
                } else {
                    lethal.min(remaining)
                };
                if amount > 0 {
                    assignments.push((source.clone(), TargetRef::Permanent(*blocker), amount));
                }
                remaining -= amount;
            }
            if remaining > 0 {
                assignments.push((source, target_ref, remaining));
            }
        }

        let blockers: Vec<(CardId, CardId)> =
            self.combat.blockers.iter().map(|(b, a)| (*b, *a)).collect();
        for (blocker, attacker) in blockers {
            if !self.deals_damage_this_step(blocker, first_strike_step) {
                continue;
            }
            dealers.push(blocker);
            let power = self.effective_power(blocker);
            if power > 0 && self.battlefield.contains(attacker) {
                let source = self.damage_source(blocker)?;
                assignments.push((source, TargetRef::Permanent(attacker), power));
            }
        }

        if first_strike_step {
            self.combat.dealt_first_strike.extend(dealers.iter().copied());
        }

        for (source, target, amount) in assignments {
            let dealt = self.deal_damage(&source, target, amount)?;
            if let Some(card) = source.card {
                self.journal.log(GameAction::CombatDamage {
                    source: card,
                    amount: dealt,
                    first_strike: first_strike_step,
                });
                if let TargetRef::Player(player) = target {
                    if dealt > 0 {
                        self.fire_trigger(TriggerEvent::DealsCombatDamageToPlayer {
                            card,
                            controller: source.controller,
                            player,
                            amount: dealt,
                        });
                    }
                }
            }
        }

        if !first_strike_step {
            self.combat.phase = CombatPhase::DamageAssigned;
        }
        Ok(())
    }
}
