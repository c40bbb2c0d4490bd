//! Redacted views of the game for one player
//!
//! A `StateSnapshot` is what a player (or an AI acting for them) is allowed
//! to see: every public zone in full, their own hand, and only the sizes of
//! opponents' hands and of all libraries.

use crate::core::{CardId, CardName, CounterType, Keyword, ManaPool, PlayerId, StackItemId};
use crate::game::combat::AttackTarget;
use crate::game::stack::StackItemKind;
use crate::game::targeting::TargetRef;
use crate::game::{GameState, Step};
use crate::zones::Zone;
use serde::{Deserialize, Serialize};

/// A card in a zone the viewer may see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardView {
    pub id: CardId,
    pub name: CardName,
    pub owner: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermanentView {
    pub id: CardId,
    pub name: CardName,
    pub owner: PlayerId,
    pub controller: PlayerId,
    pub tapped: bool,
    pub summoning_sick: bool,
    pub is_creature: bool,
    pub power: i32,
    pub toughness: i32,
    pub damage: i32,
    pub loyalty: Option<i32>,
    pub counters: Vec<(CounterType, u32)>,
    pub keywords: Vec<Keyword>,
    pub attached_to: Option<CardId>,
    pub is_token: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackItemView {
    pub id: StackItemId,
    pub kind: StackItemKind,
    pub source: Option<CardId>,
    pub source_name: CardName,
    pub controller: PlayerId,
    pub targets: Vec<TargetRef>,
    pub x_value: u32,
    pub countered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub life: i32,
    pub poison_counters: u32,
    pub mana_pool: ManaPool,
    pub has_lost: bool,
    /// Present only in the viewer's own view
    pub hand: Option<Vec<CardView>>,
    pub hand_size: usize,
    pub library_size: usize,
    pub graveyard: Vec<CardView>,
    pub exile: Vec<CardView>,
}

/// Everything one player may know about the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub viewer: PlayerId,
    pub turn_number: u32,
    pub step: Step,
    pub active_player: PlayerId,
    pub priority_holder: Option<PlayerId>,
    pub players: Vec<PlayerView>,
    pub battlefield: Vec<PermanentView>,
    /// Bottom first
    pub stack: Vec<StackItemView>,
    pub attackers: Vec<(CardId, AttackTarget)>,
    /// (blocker, attacker)
    pub blocks: Vec<(CardId, CardId)>,
    pub game_over: bool,
    pub winner: Option<PlayerId>,
}

fn card_views(state: &GameState, cards: impl Iterator<Item = CardId>) -> Vec<CardView> {
    cards
        .filter_map(|id| state.cards.get(id).ok())
        .map(|card| CardView {
            id: card.id,
            name: card.name().clone(),
            owner: card.owner,
        })
        .collect()
}

impl StateSnapshot {
    pub fn for_viewer(state: &GameState, viewer: PlayerId) -> Self {
        let turn = state.turn.turn_number;

        let players = state
            .players
            .iter()
            .map(|player| {
                let zones = state.get_player_zones(player.id);
                let zone_cards = |zone: Zone| -> Vec<CardView> {
                    zones
                        .and_then(|z| z.get_zone(zone))
                        .map(|z| card_views(state, z.iter()))
                        .unwrap_or_default()
                };
                let hand_size = state.hand(player.id).len();
                PlayerView {
                    id: player.id,
                    name: player.name.as_str().to_string(),
                    life: player.life,
                    poison_counters: player.poison_counters,
                    mana_pool: player.mana_pool,
                    has_lost: player.has_lost,
                    hand: (player.id == viewer)
                        .then(|| card_views(state, state.hand(player.id).iter().copied())),
                    hand_size,
                    library_size: state.library_size(player.id),
                    graveyard: zone_cards(Zone::Graveyard),
                    exile: zone_cards(Zone::Exile),
                }
            })
            .collect();

        let battlefield = state
            .battlefield
            .iter()
            .filter_map(|id| state.cards.get(id).ok())
            .map(|card| {
                let keywords = state.keywords_of(card.id);
                PermanentView {
                    id: card.id,
                    name: card.name().clone(),
                    owner: card.owner,
                    controller: card.controller,
                    tapped: card.tapped,
                    summoning_sick: state.is_summoning_sick(card.id),
                    is_creature: card.is_creature(),
                    power: state.effective_power(card.id),
                    toughness: state.effective_toughness(card.id),
                    damage: card.damage,
                    loyalty: card.is_planeswalker().then(|| card.loyalty()),
                    counters: card.counters.to_vec(),
                    keywords,
                    attached_to: card.attached_to,
                    is_token: card.is_token,
                }
            })
            .collect();

        let stack = state
            .stack
            .iter()
            .map(|item| StackItemView {
                id: item.id,
                kind: item.kind,
                source: item.source,
                source_name: item.source_name.clone(),
                controller: item.controller,
                targets: item.targets.clone(),
                x_value: item.x_value,
                countered: item.countered,
            })
            .collect();

        let attackers = state
            .combat
            .attack_order
            .iter()
            .filter_map(|&a| state.combat.attack_target(a).map(|t| (a, t)))
            .collect();
        let blocks = state
            .combat
            .blockers
            .iter()
            .map(|(&blocker, &attacker)| (blocker, attacker))
            .collect();

        StateSnapshot {
            viewer,
            turn_number: turn,
            step: state.turn.current_step,
            active_player: state.turn.active_player,
            priority_holder: state.priority.holder(),
            players,
            battlefield,
            stack,
            attackers,
            blocks,
            game_over: state.is_game_over(),
            winner: state.get_winner(),
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }

    /// The viewer's own hand
    pub fn my_hand(&self) -> &[CardView] {
        self.player(self.viewer)
            .and_then(|p| p.hand.as_deref())
            .unwrap_or(&[])
    }

    pub fn permanent(&self, id: CardId) -> Option<&PermanentView> {
        self.battlefield.iter().find(|p| p.id == id)
    }

    /// Text summary for logs and the self-play binary
    pub fn summary(&self) -> String {
        let mut out = format!("Turn {} {}", self.turn_number, self.step);
        for player in &self.players {
            out.push_str(&format!(
                " | {} life {} hand {} library {}",
                player.name, player.life, player.hand_size, player.library_size
            ));
            if player.poison_counters > 0 {
                out.push_str(&format!(" poison {}", player.poison_counters));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardDefinition, ManaCost};
    use std::sync::Arc;

    #[test]
    fn test_opponent_hand_and_libraries_redacted() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let bob = game.players[1].id;
        let bear = Arc::new(CardDefinition::new("Grizzly Bears", ManaCost::parse("1G").unwrap()).creature(2, 2));
        game.create_card_in_hand(bear.clone(), alice).unwrap();
        game.create_card_in_hand(bear.clone(), bob).unwrap();
        game.create_card_in_library(bear, bob).unwrap();

        let view = StateSnapshot::for_viewer(&game, alice);
        assert_eq!(view.my_hand().len(), 1);
        let bob_view = view.player(bob).unwrap();
        assert!(bob_view.hand.is_none());
        assert_eq!(bob_view.hand_size, 1);
        assert_eq!(bob_view.library_size, 1);

        let json = serde_json::to_string(&view).unwrap();
        let bob_card = game.hand(bob)[0];
        assert!(!json.contains(&format!("\"id\":{}", bob_card.as_u32())));
    }

    #[test]
    fn test_battlefield_view_reports_effective_stats() {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        let def = Arc::new(
            CardDefinition::new("Serra Angel", ManaCost::parse("3WW").unwrap())
                .creature(4, 4)
                .with_keyword(Keyword::Flying),
        );
        let card = game.create_card_in_hand(def, alice).unwrap();
        game.move_card(card, Zone::Battlefield).unwrap();
        game.add_counters(card, CounterType::PlusOnePlusOne, 1).unwrap();

        let view = StateSnapshot::for_viewer(&game, alice);
        let permanent = view.permanent(card).unwrap();
        assert_eq!(permanent.power, 5);
        assert_eq!(permanent.keywords, vec![Keyword::Flying]);
    }
}
