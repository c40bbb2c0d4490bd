//! Targeting: legal target enumeration and resolution-time re-checks

use crate::core::{
    Card, CardId, CardType, Color, Keyword, PlayerId, StackItemId, TargetController, TargetKind,
    TargetRequirement,
};
use crate::error::{ReasonCode, RulesViolation};
use crate::game::config::FizzlePolicy;
use crate::game::{GameState, StackItem};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A chosen target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    Player(PlayerId),
    Permanent(CardId),
    Spell(StackItemId),
    /// An emptied slot (the target became illegal)
    None,
}

/// What resolution does after re-checking targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FizzleOutcome {
    Resolve,
    /// Resolve with the illegal targets removed
    ResolvePartial,
    Fizzle,
}

/// Apply the fizzle policy to per-target legality
pub fn fizzle_outcome(policy: FizzlePolicy, legal: &[bool]) -> FizzleOutcome {
    if legal.is_empty() || legal.iter().all(|&ok| ok) {
        return FizzleOutcome::Resolve;
    }
    if legal.iter().all(|&ok| !ok) {
        return FizzleOutcome::Fizzle;
    }
    let partial_ok = match policy {
        FizzlePolicy::AllOrNothing => false,
        FizzlePolicy::RemoveIllegalSubset => true,
        FizzlePolicy::Auto => legal.len() > 1,
    };
    if partial_ok {
        FizzleOutcome::ResolvePartial
    } else {
        FizzleOutcome::Fizzle
    }
}

fn controller_matches(restriction: TargetController, target_controller: PlayerId, chooser: PlayerId) -> bool {
    match restriction {
        TargetController::Any => true,
        TargetController::You => target_controller == chooser,
        TargetController::Opponent => target_controller != chooser,
    }
}

fn permanent_matches_kind(card: &Card, kind: TargetKind) -> bool {
    match kind {
        TargetKind::Any => card.is_creature() || card.is_planeswalker(),
        TargetKind::Player | TargetKind::Spell => false,
        TargetKind::Creature => card.is_creature(),
        TargetKind::Planeswalker => card.is_planeswalker(),
        TargetKind::Permanent => true,
        TargetKind::Artifact => card.is_type(CardType::Artifact),
        TargetKind::Enchantment => card.is_type(CardType::Enchantment),
        TargetKind::Land => card.is_land(),
    }
}

impl GameState {
    /// Does `card_id` have protection from any color of `source`?
    fn is_protected_from(&self, card_id: CardId, source: Option<CardId>) -> bool {
        self.source_colors(source)
            .iter()
            .any(|&color| self.has_keyword(card_id, Keyword::ProtectionFrom(color)))
    }

    /// May `attachment` stay on `host`?
    ///
    /// An Aura must still satisfy its enchant requirement and an Equipment
    /// must be on a creature. Protection from the attachment's colors makes
    /// the host illegal for both. Hexproof and shroud only stop targeting, so
    /// they are not checked here.
    pub fn is_legal_attachment(&self, attachment: CardId, host: CardId) -> bool {
        if attachment == host || !self.battlefield.contains(host) {
            return false;
        }
        let (Ok(attached), Ok(host_card)) = (self.cards.get(attachment), self.cards.get(host)) else {
            return false;
        };
        let host_ok = if attached.is_aura() {
            attached.definition.spell_targets.first().map_or(true, |enchant| {
                permanent_matches_kind(host_card, enchant.kind)
                    && controller_matches(enchant.controller, host_card.controller, attached.controller)
            })
        } else {
            host_card.is_creature()
        };
        host_ok && !self.is_protected_from(host, Some(attachment))
    }

    fn source_colors(&self, source: Option<CardId>) -> SmallVec<[Color; 2]> {
        source
            .and_then(|id| self.cards.get(id).ok())
            .map(|card| card.colors().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Is `target` a legal choice for `requirement` when chosen by
    /// `controller` for a spell or ability from `source`?
    pub fn is_legal_target(
        &self,
        target: TargetRef,
        requirement: &TargetRequirement,
        controller: PlayerId,
        source: Option<CardId>,
    ) -> bool {
        match target {
            TargetRef::None => false,
            TargetRef::Player(player_id) => {
                matches!(requirement.kind, TargetKind::Any | TargetKind::Player)
                    && self.get_player(player_id).is_ok_and(|p| p.is_alive())
                    && controller_matches(requirement.controller, player_id, controller)
            }
            TargetRef::Permanent(card_id) => {
                let Ok(card) = self.cards.get(card_id) else {
                    return false;
                };
                if !self.battlefield.contains(card_id) {
                    return false;
                }
                if !permanent_matches_kind(card, requirement.kind)
                    || !controller_matches(requirement.controller, card.controller, controller)
                {
                    return false;
                }
                if self.has_keyword(card_id, Keyword::Shroud) {
                    return false;
                }
                if card.controller != controller && self.has_keyword(card_id, Keyword::Hexproof) {
                    return false;
                }
                !self.is_protected_from(card_id, source)
            }
            TargetRef::Spell(item_id) => {
                let Some(item) = self.stack.get(item_id) else {
                    return false;
                };
                requirement.kind == TargetKind::Spell
                    && item.is_spell()
                    && item.source != source
                    && controller_matches(requirement.controller, item.controller, controller)
            }
        }
    }

    /// Enumerate every legal target for one requirement, players first in
    /// turn order, then permanents in battlefield order, then spells
    pub fn get_legal_targets(
        &self,
        requirement: &TargetRequirement,
        controller: PlayerId,
        source: Option<CardId>,
    ) -> Vec<TargetRef> {
        let players = self.players.iter().map(|p| TargetRef::Player(p.id));
        let permanents = self.battlefield.iter().map(TargetRef::Permanent);
        let spells = self.stack.iter().rev().map(|item| TargetRef::Spell(item.id));

        players
            .chain(permanents)
            .chain(spells)
            .filter(|&t| self.is_legal_target(t, requirement, controller, source))
            .collect()
    }

    /// Validate targets chosen when a spell or ability is put on the stack
    pub fn validate_targets(
        &self,
        targets: &[TargetRef],
        requirements: &[TargetRequirement],
        controller: PlayerId,
        source: Option<CardId>,
    ) -> std::result::Result<(), RulesViolation> {
        if targets.len() != requirements.len() {
            return Err(RulesViolation::InvalidTarget(ReasonCode::WrongTargetCount));
        }
        for (i, target) in targets.iter().enumerate() {
            if targets[..i].contains(target) {
                return Err(RulesViolation::InvalidTarget(ReasonCode::DuplicateTarget));
            }
        }
        for (target, requirement) in targets.iter().zip(requirements) {
            if !self.is_legal_target(*target, requirement, controller, source) {
                return Err(RulesViolation::InvalidTarget(ReasonCode::TargetNotLegal));
            }
        }
        Ok(())
    }

    /// Re-check each target of a stack item at resolution
    pub fn validate_all_targets(&self, item: &StackItem) -> Vec<bool> {
        item.targets
            .iter()
            .zip(&item.requirements)
            .map(|(target, requirement)| {
                self.is_legal_target(*target, requirement, item.controller, item.source)
            })
            .collect()
    }

    /// Every combination of legal targets for a requirement list, capped at
    /// `limit` combinations (used to enumerate candidate intents)
    pub fn target_combinations(
        &self,
        requirements: &[TargetRequirement],
        controller: PlayerId,
        source: Option<CardId>,
        limit: usize,
    ) -> Vec<Vec<TargetRef>> {
        let mut combos: Vec<Vec<TargetRef>> = vec![Vec::new()];
        for requirement in requirements {
            let options = self.get_legal_targets(requirement, controller, source);
            let mut next = Vec::new();
            'outer: for combo in &combos {
                for option in &options {
                    if combo.contains(option) {
                        continue;
                    }
                    let mut extended = combo.clone();
                    extended.push(*option);
                    next.push(extended);
                    if next.len() >= limit {
                        break 'outer;
                    }
                }
            }
            combos = next;
            if combos.is_empty() {
                break;
            }
        }
        combos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fizzle_outcome_policies() {
        assert_eq!(fizzle_outcome(FizzlePolicy::Auto, &[]), FizzleOutcome::Resolve);
        assert_eq!(fizzle_outcome(FizzlePolicy::Auto, &[true]), FizzleOutcome::Resolve);
        assert_eq!(fizzle_outcome(FizzlePolicy::Auto, &[false]), FizzleOutcome::Fizzle);
        assert_eq!(
            fizzle_outcome(FizzlePolicy::Auto, &[true, false]),
            FizzleOutcome::ResolvePartial
        );
        assert_eq!(
            fizzle_outcome(FizzlePolicy::AllOrNothing, &[true, false]),
            FizzleOutcome::Fizzle
        );
        assert_eq!(
            fizzle_outcome(FizzlePolicy::RemoveIllegalSubset, &[false, false]),
            FizzleOutcome::Fizzle
        );
    }
}
