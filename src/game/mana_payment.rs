//! Mana payment resolution
//!
//! Finds the permanents a player can tap for mana and computes a
//! deterministic auto-tap plan covering whatever the mana pool lacks.
//!
//! # Algorithm
//!
//! 1. If the floating pool already pays the cost, tap nothing.
//! 2. Otherwise check the cost against the pool plus every available
//!    source. If even that fails, the cost is unpayable.
//! 3. Greedily drop sources, last first (creatures are ordered after
//!    lands), while the remaining set still pays the cost without paying
//!    more life for Phyrexian symbols.

use crate::core::{CardId, Color, Effect, ManaCost, ManaPayment, ManaPool, PlayerId};
use crate::error::{ReasonCode, RulesViolation};
use crate::game::{GameState, LogCategory};
use crate::Result;

/// A permanent that can be tapped for mana right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManaSource {
    pub card: CardId,
    /// Index into the card's activated abilities
    pub ability_index: usize,
    /// Mana the ability adds
    pub produces: ManaPool,
    pub is_creature: bool,
}

/// Sources to tap and the payment to take afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapPlan {
    pub sources: Vec<ManaSource>,
    pub payment: ManaPayment,
}

fn combined_pool(pool: &ManaPool, sources: &[ManaSource]) -> ManaPool {
    let mut total = *pool;
    for source in sources {
        total.add_pool(&source.produces);
    }
    total
}

impl GameState {
    /// Untapped permanents with a `{T}: Add ...` ability the player can use
    ///
    /// At most one ability per permanent (tapping uses it up). Lands come
    /// first, then other permanents, each group in battlefield order.
    pub fn mana_sources(&self, player: PlayerId) -> Vec<ManaSource> {
        self.mana_sources_except(player, None)
    }

    /// Mana sources other than `exclude` (a permanent about to be tapped
    /// for its own ability cost)
    pub fn mana_sources_except(&self, player: PlayerId, exclude: Option<CardId>) -> Vec<ManaSource> {
        let mut sources: Vec<ManaSource> = self
            .permanents_controlled_by(player)
            .into_iter()
            .filter(|card_id| Some(*card_id) != exclude)
            .filter_map(|card_id| {
                let card = self.cards.get(card_id).ok()?;
                if card.tapped || self.is_summoning_sick(card_id) {
                    return None;
                }
                let (ability_index, ability) = card
                    .definition
                    .activated_abilities
                    .iter()
                    .enumerate()
                    .find(|(_, a)| {
                        a.is_mana_ability()
                            && a.cost.tap
                            && a.cost.mana.is_zero()
                            && !a.cost.sacrifice_self
                    })?;
                let mut produces = ManaPool::new();
                for effect in &ability.effects {
                    if let Effect::AddMana { color, amount } = effect {
                        produces.add(*color, *amount);
                    }
                }
                Some(ManaSource {
                    card: card_id,
                    ability_index,
                    produces,
                    is_creature: card.is_creature(),
                })
            })
            .collect();
        // Stable: keeps battlefield order within each group
        sources.sort_by_key(|s| s.is_creature);
        sources
    }

    fn life_budget(&self, player: PlayerId) -> u32 {
        self.get_player(player)
            .map(|p| p.life.max(0) as u32)
            .unwrap_or(0)
    }

    /// Plan how to pay `cost` from the pool plus untapped mana sources
    pub fn plan_auto_tap(
        &self,
        player: PlayerId,
        cost: &ManaCost,
    ) -> std::result::Result<TapPlan, RulesViolation> {
        self.plan_auto_tap_except(player, cost, None)
    }

    pub fn plan_auto_tap_except(
        &self,
        player: PlayerId,
        cost: &ManaCost,
        exclude: Option<CardId>,
    ) -> std::result::Result<TapPlan, RulesViolation> {
        if cost.has_x() {
            return Err(RulesViolation::IllegalIntent(ReasonCode::UnboundX));
        }
        let pool = self.get_player(player).map_err(RulesViolation::from)?.mana_pool;
        let budget = self.life_budget(player);

        if let Ok(payment) = pool.plan_payment(cost, budget) {
            if payment.life == 0 || self.mana_sources_except(player, exclude).is_empty() {
                return Ok(TapPlan {
                    sources: Vec::new(),
                    payment,
                });
            }
        }

        let mut chosen = self.mana_sources_except(player, exclude);
        let mut best = combined_pool(&pool, &chosen).plan_payment(cost, budget)?;

        for i in (0..chosen.len()).rev() {
            let mut without = chosen.clone();
            without.remove(i);
            if let Ok(payment) = combined_pool(&pool, &without).plan_payment(cost, budget) {
                if payment.life <= best.life {
                    chosen = without;
                    best = payment;
                }
            }
        }

        Ok(TapPlan {
            sources: chosen,
            payment: best,
        })
    }

    /// Can the player pay `cost` with pool and sources together?
    pub fn can_afford(&self, player: PlayerId, cost: &ManaCost) -> bool {
        self.plan_auto_tap(player, cost).is_ok()
    }

    /// Largest X the player could pay for `cost`, if any
    pub fn max_affordable_x(&self, player: PlayerId, cost: &ManaCost) -> Option<u32> {
        let available = self.get_player(player).ok()?.mana_pool.total()
            + self
                .mana_sources(player)
                .iter()
                .map(|s| s.produces.total())
                .sum::<u32>();
        (0..=available)
            .rev()
            .find(|&x| {
                cost.bind_x(x)
                    .is_some_and(|bound| self.can_afford(player, &bound))
            })
    }

    /// Tap a mana source and add its mana to the controller's pool
    pub(crate) fn tap_mana_source(&mut self, player: PlayerId, source: &ManaSource) -> Result<()> {
        self.tap_card(source.card)?;
        for color in Color::ALL {
            let amount = source.produces.get(color);
            if amount > 0 {
                self.add_mana(player, color, amount)?;
            }
        }
        self.logger.detail(
            LogCategory::Mana,
            format_args!(
                "{} taps {} for {}",
                self.player_name(player),
                self.card_name(source.card),
                source.produces
            ),
        );
        Ok(())
    }

    /// Tap the plan's sources, then take the planned mana and life
    pub(crate) fn execute_tap_plan(&mut self, player: PlayerId, plan: &TapPlan) -> Result<()> {
        for source in &plan.sources {
            self.tap_mana_source(player, source)?;
        }
        self.pay_planned(player, &plan.payment)
    }

    /// Remove a planned payment from the pool and the life total
    pub(crate) fn pay_planned(&mut self, player: PlayerId, payment: &ManaPayment) -> Result<()> {
        let p = self.get_player_mut(player)?;
        p.mana_pool.apply_payment(payment);
        self.journal.log(crate::journal::GameAction::PayCost {
            player_id: player,
            mana: payment.mana.total(),
            life: payment.life,
        });
        if payment.life > 0 {
            self.lose_life(player, payment.life as i32)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActivatedAbility, CardDefinition, CardType};
    use crate::zones::Zone;
    use std::sync::Arc;

    fn land(name: &str, color: Color) -> CardDefinition {
        CardDefinition::new(name, ManaCost::new())
            .with_type(CardType::Land)
            .with_ability(ActivatedAbility::tap_for_mana(color))
    }

    fn setup() -> (GameState, PlayerId) {
        let mut game = GameState::new_two_player("Alice", "Bob", 20);
        let alice = game.players[0].id;
        game.turn.turn_number = 3;
        for (name, color) in [
            ("Forest", Color::Green),
            ("Mountain", Color::Red),
            ("Forest", Color::Green),
        ] {
            let card = game
                .create_card_in_library(Arc::new(land(name, color)), alice)
                .unwrap();
            game.move_card(card, Zone::Battlefield).unwrap();
            game.cards.get_mut(card).unwrap().turn_entered_battlefield = Some(1);
        }
        (game, alice)
    }

    #[test]
    fn test_sources_found() {
        let (game, alice) = setup();
        let sources = game.mana_sources(alice);
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[1].produces.get(Color::Red), 1);
    }

    #[test]
    fn test_plan_taps_minimal_sources() {
        let (game, alice) = setup();
        let plan = game.plan_auto_tap(alice, &ManaCost::parse("1G").unwrap()).unwrap();
        assert_eq!(plan.sources.len(), 2);
        assert_eq!(plan.payment.mana.total(), 2);

        let plan = game.plan_auto_tap(alice, &ManaCost::parse("R").unwrap()).unwrap();
        assert_eq!(plan.sources.len(), 1);
        assert_eq!(plan.sources[0].produces.get(Color::Red), 1);
    }

    #[test]
    fn test_unpayable_cost() {
        let (game, alice) = setup();
        let err = game.plan_auto_tap(alice, &ManaCost::parse("U").unwrap()).unwrap_err();
        assert_eq!(err.reason(), Some(ReasonCode::InsufficientMana));
        assert!(!game.can_afford(alice, &ManaCost::parse("4").unwrap()));
    }

    #[test]
    fn test_x_must_be_bound() {
        let (game, alice) = setup();
        let cost = ManaCost::parse("XR").unwrap();
        assert_eq!(
            game.plan_auto_tap(alice, &cost).unwrap_err().reason(),
            Some(ReasonCode::UnboundX)
        );
        assert_eq!(game.max_affordable_x(alice, &cost), Some(2));
    }

    #[test]
    fn test_execute_plan_taps_and_pays() {
        let (mut game, alice) = setup();
        let plan = game.plan_auto_tap(alice, &ManaCost::parse("1R").unwrap()).unwrap();
        game.execute_tap_plan(alice, &plan).unwrap();
        assert_eq!(game.get_player(alice).unwrap().mana_pool.total(), 0);
        let tapped = game
            .battlefield
            .iter()
            .filter(|id| game.cards.get(*id).unwrap().tapped)
            .count();
        assert_eq!(tapped, 2);
    }

    #[test]
    fn test_phyrexian_prefers_mana_from_lands() {
        let (game, alice) = setup();
        let plan = game.plan_auto_tap(alice, &ManaCost::parse("{G/P}").unwrap()).unwrap();
        assert_eq!(plan.payment.life, 0);
        assert_eq!(plan.sources.len(), 1);
    }
}
