//! State-based actions
//!
//! State-based actions are checked whenever a player would receive priority.
//! They don't use the stack. One pass collects every action that applies to
//! the current state, then performs them all as a batch; passes repeat until
//! one finds nothing.

use crate::core::{CardId, CounterType, Keyword, LossReason, PlayerId};
use crate::error::RulesViolation;
use crate::game::config::LegendRulePolicy;
use crate::game::{GameState, LogCategory, VerbosityLevel};
use crate::journal::GameAction;
use crate::zones::Zone;
use crate::Result;
use rustc_hash::FxHashMap;

/// A state-based action that needs to be performed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateBasedAction {
    /// Life total 0 or less, poison at the threshold, or drew from an
    /// empty library
    PlayerLoses {
        player: PlayerId,
        reason: LossReason,
    },

    /// A creature with toughness 0 or less goes to the graveyard
    ZeroToughness(CardId),

    /// A creature with lethal damage (or any deathtouch damage) is destroyed
    LethalDamage(CardId),

    /// A planeswalker with no loyalty goes to the graveyard
    PlaneswalkerDies(CardId),

    /// A legendary permanent that lost the legend rule
    LegendRule(CardId),

    /// An Aura attached to nothing goes to the graveyard
    AuraFallsOff(CardId),

    /// An Equipment attached to an illegal permanent becomes unattached
    EquipmentFallsOff(CardId),

    /// +1/+1 and -1/-1 counters on a permanent annihilate in pairs
    CountersAnnihilate { permanent: CardId, count: u32 },

    /// A token outside the battlefield ceases to exist
    TokenCeasesToExist(CardId),
}

/// Collect every state-based action that applies to `game`
pub fn check_state_based_actions(game: &GameState) -> Vec<StateBasedAction> {
    let mut actions = Vec::new();
    check_player_sbas(game, &mut actions);
    check_permanent_sbas(game, &mut actions);
    check_legend_rule(game, &mut actions);
    check_token_cleanup(game, &mut actions);
    actions
}

fn check_player_sbas(game: &GameState, actions: &mut Vec<StateBasedAction>) {
    for player in game.players.iter().filter(|p| p.is_alive()) {
        let reason = if player.life <= 0 {
            Some(LossReason::ZeroLife)
        } else if player.poison_counters >= game.config.poison_threshold {
            Some(LossReason::Poison)
        } else if player.drew_from_empty_library {
            Some(LossReason::DrewFromEmptyLibrary)
        } else {
            None
        };
        if let Some(reason) = reason {
            actions.push(StateBasedAction::PlayerLoses {
                player: player.id,
                reason,
            });
        }
    }
}

fn check_permanent_sbas(game: &GameState, actions: &mut Vec<StateBasedAction>) {
    for card_id in game.battlefield.iter() {
        let Ok(card) = game.cards.get(card_id) else {
            continue;
        };

        if card.is_creature() {
            let toughness = game.effective_toughness(card_id);
            if toughness <= 0 {
                actions.push(StateBasedAction::ZeroToughness(card_id));
                continue;
            }
            let lethal = card.damage >= toughness || card.deathtouch_damage;
            if lethal && !game.has_keyword(card_id, Keyword::Indestructible) {
                actions.push(StateBasedAction::LethalDamage(card_id));
                continue;
            }
        }

        if card.is_planeswalker() && card.loyalty() <= 0 {
            actions.push(StateBasedAction::PlaneswalkerDies(card_id));
            continue;
        }

        if card.is_aura() {
            let attached_ok = card
                .attached_to
                .is_some_and(|host| game.is_legal_attachment(card_id, host));
            if !attached_ok {
                actions.push(StateBasedAction::AuraFallsOff(card_id));
                continue;
            }
        } else if card.is_equipment() {
            if let Some(host) = card.attached_to {
                if !game.is_legal_attachment(card_id, host) {
                    actions.push(StateBasedAction::EquipmentFallsOff(card_id));
                }
            }
        }

        let plus = card.get_counter(&CounterType::PlusOnePlusOne);
        let minus = card.get_counter(&CounterType::MinusOneMinusOne);
        if plus > 0 && minus > 0 {
            actions.push(StateBasedAction::CountersAnnihilate {
                permanent: card_id,
                count: plus.min(minus),
            });
        }
    }
}

/// Two or more legendary permanents with the same name under one controller:
/// all but one go to the graveyard
fn check_legend_rule(game: &GameState, actions: &mut Vec<StateBasedAction>) {
    let mut groups: FxHashMap<(PlayerId, &str), Vec<CardId>> = FxHashMap::default();
    // Battlefield order is arrival order
    let mut order: Vec<(PlayerId, &str)> = Vec::new();
    for card_id in game.battlefield.iter() {
        let Ok(card) = game.cards.get(card_id) else {
            continue;
        };
        if !card.is_legendary() {
            continue;
        }
        let key = (card.controller, card.name().as_str());
        let group = groups.entry(key).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(card_id);
    }

    for key in order {
        let Some(group) = groups.get(&key) else {
            continue;
        };
        if group.len() < 2 {
            continue;
        }
        let keep = match game.config.legend_rule {
            LegendRulePolicy::KeepNewest => group.len() - 1,
            LegendRulePolicy::KeepOldest => 0,
        };
        for (i, card_id) in group.iter().enumerate() {
            if i != keep {
                actions.push(StateBasedAction::LegendRule(*card_id));
            }
        }
    }
}

fn check_token_cleanup(game: &GameState, actions: &mut Vec<StateBasedAction>) {
    let mut tokens: Vec<CardId> = game
        .cards
        .iter()
        .filter(|(_, card)| card.is_token && card.zone != Zone::Battlefield)
        .map(|(id, _)| *id)
        .collect();
    // Entity store iteration order is unspecified
    tokens.sort();
    actions.extend(tokens.into_iter().map(StateBasedAction::TokenCeasesToExist));
}

impl GameState {
    /// Run state-based actions until none apply
    ///
    /// Returns the number of actions performed. Not reaching a fixpoint
    /// within `max_sba_iterations` passes, or a broken zone invariant, is an
    /// engine invariant violation.
    pub fn check_state_based_actions(&mut self) -> std::result::Result<usize, RulesViolation> {
        let mut performed = 0;
        for _ in 0..self.config.max_sba_iterations {
            let actions = check_state_based_actions(self);
            if actions.is_empty() {
                self.check_game_over();
                return Ok(performed);
            }
            performed += actions.len();
            for action in actions {
                self.apply_state_based_action(action)?;
            }
            if self.config.verify_invariants {
                self.verify_zone_uniqueness()?;
            }
        }
        Err(RulesViolation::EngineInvariantViolation(format!(
            "state-based actions did not settle after {} passes",
            self.config.max_sba_iterations
        )))
    }

    fn apply_state_based_action(&mut self, action: StateBasedAction) -> Result<()> {
        match action {
            StateBasedAction::PlayerLoses { player, reason } => {
                self.eliminate_player(player, reason)?;
            }
            StateBasedAction::ZeroToughness(card_id)
            | StateBasedAction::LethalDamage(card_id)
            | StateBasedAction::PlaneswalkerDies(card_id)
            | StateBasedAction::LegendRule(card_id)
            | StateBasedAction::AuraFallsOff(card_id) => {
                // An earlier action of this batch may already have moved it
                if self.battlefield.contains(card_id) {
                    self.logger.event(
                        LogCategory::StateBased,
                        format_args!(
                            "{} is put into the graveyard ({})",
                            self.card_name(card_id),
                            sba_reason(&action)
                        ),
                    );
                    self.move_card(card_id, Zone::Graveyard)?;
                }
            }
            StateBasedAction::EquipmentFallsOff(card_id) => {
                self.attach(card_id, None)?;
            }
            StateBasedAction::CountersAnnihilate { permanent, count } => {
                self.remove_counters(permanent, CounterType::PlusOnePlusOne, count)?;
                self.remove_counters(permanent, CounterType::MinusOneMinusOne, count)?;
            }
            StateBasedAction::TokenCeasesToExist(card_id) => {
                let (owner, zone) = {
                    let card = self.cards.get(card_id)?;
                    (card.owner, card.zone)
                };
                if let Some(cards) = self
                    .get_player_zones_mut(owner)
                    .and_then(|zones| zones.get_zone_mut(zone))
                {
                    cards.remove(card_id);
                }
                self.cards.remove(card_id);
                self.journal.log(GameAction::TokenCeasedToExist { card_id });
            }
        }
        Ok(())
    }

    /// Take a player out of the game
    ///
    /// Their permanents and spells are exiled, their abilities on the stack
    /// and their trigger watchers are removed.
    fn eliminate_player(&mut self, player_id: PlayerId, reason: LossReason) -> Result<()> {
        self.get_player_mut(player_id)?.eliminate(reason);
        self.journal.log(GameAction::PlayerLost {
            player_id,
            reason,
        });
        self.logger.log(
            VerbosityLevel::Minimal,
            Some(LogCategory::StateBased),
            format_args!("{} loses the game ({reason:?})", self.player_name(player_id)),
        );

        let owned: Vec<CardId> = self
            .battlefield
            .iter()
            .filter(|id| self.cards.get(*id).is_ok_and(|c| c.owner == player_id))
            .collect();
        for card_id in owned {
            self.move_card(card_id, Zone::Exile)?;
        }

        let items: Vec<_> = self
            .stack
            .iter()
            .filter(|item| item.controller == player_id)
            .map(|item| (item.id, item.spell_card()))
            .collect();
        for (item, spell_card) in items {
            self.stack.remove(item);
            self.journal.log(GameAction::RemoveStackItem { item });
            if let Some(card_id) = spell_card {
                self.move_card(card_id, Zone::Exile)?;
            }
        }

        self.triggers.unregister_controller(player_id);
        self.priority.remove_player(player_id);
        Ok(())
    }
}

fn sba_reason(action: &StateBasedAction) -> &'static str {
    match action {
        StateBasedAction::ZeroToughness(_) => "zero toughness",
        StateBasedAction::LethalDamage(_) => "lethal damage",
        StateBasedAction::PlaneswalkerDies(_) => "no loyalty",
        StateBasedAction::LegendRule(_) => "legend rule",
        StateBasedAction::AuraFallsOff(_) => "illegally attached",
        _ => "state-based action",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        CardDefinition, CardType, Color, ManaCost, TargetController, TargetKind,
        TargetRequirement,
    };
    use crate::game::config::EngineConfig;
    use std::sync::Arc;

    fn onto_battlefield(game: &mut GameState, definition: CardDefinition, owner: PlayerId) -> CardId {
        let card = game.create_card_in_library(Arc::new(definition), owner).unwrap();
        game.move_card(card, Zone::Battlefield).unwrap();
        card
    }

    fn bear() -> CardDefinition {
        CardDefinition::new("Grizzly Bears", ManaCost::parse("1G").unwrap()).creature(2, 2)
    }

    #[test]
    fn test_player_loses_at_zero_life_and_game_ends() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let bob = game.players[1].id;
        game.get_player_mut(bob).unwrap().life = 0;

        let actions = check_state_based_actions(&game);
        assert_eq!(
            actions,
            vec![StateBasedAction::PlayerLoses {
                player: bob,
                reason: LossReason::ZeroLife
            }]
        );
        game.check_state_based_actions().unwrap();
        assert!(game.is_game_over());
        assert_eq!(game.get_winner(), Some(alice));
    }

    #[test]
    fn test_simultaneous_loss_is_a_draw() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        game.players[0].poison_counters = 10;
        game.players[1].drew_from_empty_library = true;
        game.check_state_based_actions().unwrap();
        assert!(game.is_game_over());
        assert_eq!(game.get_winner(), None);
        assert_eq!(game.players[0].loss_reason, Some(LossReason::Poison));
        assert_eq!(
            game.players[1].loss_reason,
            Some(LossReason::DrewFromEmptyLibrary)
        );
    }

    #[test]
    fn test_lethal_damage_and_indestructible() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let dead = onto_battlefield(&mut game, bear(), alice);
        let tough = onto_battlefield(
            &mut game,
            bear().with_keyword(Keyword::Indestructible),
            alice,
        );
        game.cards.get_mut(dead).unwrap().damage = 2;
        game.cards.get_mut(tough).unwrap().damage = 5;

        assert_eq!(game.check_state_based_actions().unwrap(), 1);
        assert!(game.get_player_zones(alice).unwrap().graveyard.contains(dead));
        assert!(game.battlefield.contains(tough));
    }

    #[test]
    fn test_deathtouch_damage_destroys() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let big = onto_battlefield(
            &mut game,
            CardDefinition::new("Colossal Dreadmaw", ManaCost::parse("4GG").unwrap()).creature(6, 6),
            alice,
        );
        let card = game.cards.get_mut(big).unwrap();
        card.damage = 1;
        card.deathtouch_damage = true;

        game.check_state_based_actions().unwrap();
        assert!(!game.battlefield.contains(big));
    }

    #[test]
    fn test_planeswalker_without_loyalty_dies() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let walker = onto_battlefield(
            &mut game,
            CardDefinition::new("Chandra", ManaCost::parse("2RR").unwrap())
                .with_type(CardType::Planeswalker)
                .with_loyalty(3),
            alice,
        );
        assert_eq!(game.cards.get(walker).unwrap().loyalty(), 3);
        game.remove_counters(walker, CounterType::Loyalty, 3).unwrap();

        game.check_state_based_actions().unwrap();
        assert!(game.get_player_zones(alice).unwrap().graveyard.contains(walker));
    }

    #[test]
    fn test_legend_rule_policies() {
        for (policy, survivor_idx) in [
            (LegendRulePolicy::KeepNewest, 1),
            (LegendRulePolicy::KeepOldest, 0),
        ] {
            let mut game = GameState::new(
                &["Alice", "Bob"],
                EngineConfig::default().with_legend_rule(policy),
            );
            let alice = game.players[0].id;
            let legend = || {
                CardDefinition::new("Isamaru", ManaCost::parse("W").unwrap())
                    .legendary()
                    .creature(2, 1)
            };
            let copies = [
                onto_battlefield(&mut game, legend(), alice),
                onto_battlefield(&mut game, legend(), alice),
            ];

            game.check_state_based_actions().unwrap();
            assert!(game.battlefield.contains(copies[survivor_idx]));
            assert!(!game.battlefield.contains(copies[1 - survivor_idx]));
        }
    }

    #[test]
    fn test_aura_falls_off_and_equipment_unattaches() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let host = onto_battlefield(&mut game, bear(), alice);
        let aura = onto_battlefield(
            &mut game,
            CardDefinition::new("Holy Strength", ManaCost::parse("W").unwrap())
                .with_type(CardType::Enchantment)
                .with_subtype("Aura"),
            alice,
        );
        let sword = onto_battlefield(
            &mut game,
            CardDefinition::new("Short Sword", ManaCost::parse("1").unwrap())
                .with_type(CardType::Artifact)
                .with_subtype("Equipment"),
            alice,
        );
        game.attach(aura, Some(host)).unwrap();
        game.attach(sword, Some(host)).unwrap();
        assert_eq!(game.check_state_based_actions().unwrap(), 0);

        game.move_card(host, Zone::Graveyard).unwrap();
        game.check_state_based_actions().unwrap();
        assert!(game.get_player_zones(alice).unwrap().graveyard.contains(aura));
        assert!(game.battlefield.contains(sword));
        assert_eq!(game.cards.get(sword).unwrap().attached_to, None);
    }

    #[test]
    fn test_protection_and_enchant_requirement_make_attachments_illegal() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let bob = game.players[1].id;
        let host = onto_battlefield(&mut game, bear(), alice);
        let guarded = onto_battlefield(&mut game, bear().with_keyword(Keyword::Hexproof), alice);
        let aura = |name: &str, cost: &str, controller| {
            CardDefinition::new(name, ManaCost::parse(cost).unwrap())
                .with_type(CardType::Enchantment)
                .with_subtype("Aura")
                .with_spell(
                    vec![TargetRequirement::controlled_by(TargetKind::Creature, controller)],
                    Vec::new(),
                )
        };
        let ours = onto_battlefield(&mut game, aura("Rancor", "G", TargetController::You), alice);
        let theirs = onto_battlefield(&mut game, aura("Pacifism", "1W", TargetController::Any), bob);
        let sword = onto_battlefield(
            &mut game,
            CardDefinition::new("Knight's Blade", ManaCost::parse("1W").unwrap())
                .with_type(CardType::Artifact)
                .with_subtype("Equipment"),
            alice,
        );
        game.attach(ours, Some(host)).unwrap();
        game.attach(sword, Some(host)).unwrap();
        // Hexproof only stops targeting
        game.attach(theirs, Some(guarded)).unwrap();
        assert_eq!(game.check_state_based_actions().unwrap(), 0);

        // "Enchant creature you control" no longer holds
        game.cards.get_mut(host).unwrap().controller = bob;
        game.check_state_based_actions().unwrap();
        assert!(game.get_player_zones(alice).unwrap().graveyard.contains(ours));
        assert_eq!(game.cards.get(sword).unwrap().attached_to, Some(host));

        game.cards
            .get_mut(host)
            .unwrap()
            .eot_keywords
            .push(Keyword::ProtectionFrom(Color::White));
        game.check_state_based_actions().unwrap();
        assert!(game.battlefield.contains(sword));
        assert_eq!(game.cards.get(sword).unwrap().attached_to, None);
        assert_eq!(game.cards.get(theirs).unwrap().attached_to, Some(guarded));
    }

    #[test]
    fn test_counters_annihilate() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let card = onto_battlefield(&mut game, bear(), alice);
        game.add_counters(card, CounterType::PlusOnePlusOne, 2).unwrap();
        game.add_counters(card, CounterType::MinusOneMinusOne, 3).unwrap();

        game.check_state_based_actions().unwrap();
        let card = game.cards.get(card).unwrap();
        assert_eq!(card.get_counter(&CounterType::PlusOnePlusOne), 0);
        assert_eq!(card.get_counter(&CounterType::MinusOneMinusOne), 1);
        assert_eq!(card.current_toughness(), 1);
    }

    #[test]
    fn test_token_ceases_to_exist() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let token = game
            .create_token(
                Arc::new(CardDefinition::new("Soldier", ManaCost::new()).creature(1, 1)),
                alice,
            )
            .unwrap();
        game.move_card(token, Zone::Graveyard).unwrap();

        game.check_state_based_actions().unwrap();
        assert!(!game.cards.contains(token));
        assert!(game.get_player_zones(alice).unwrap().graveyard.is_empty());
        game.verify_zone_uniqueness().unwrap();
    }

    #[test]
    fn test_eliminated_player_leaves_three_player_game() {
        let mut game = GameState::new(&["A", "B", "C"], EngineConfig::default());
        let b = game.players[1].id;
        let permanent = onto_battlefield(&mut game, bear(), b);
        game.get_player_mut(b).unwrap().life = -3;

        game.check_state_based_actions().unwrap();
        assert!(!game.is_game_over());
        assert!(!game.get_player(b).unwrap().is_alive());
        assert!(game.get_player_zones(b).unwrap().exile.contains(permanent));
        assert_eq!(game.apnap_order().len(), 2);
    }
}
