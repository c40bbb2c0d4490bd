//! Card types and definitions

use crate::core::{
    ActivatedAbility, AttachedBuff, CardId, CardName, Color, CounterType, Effect, GameEntity,
    Keyword, ManaCost, PlayerId, Subtype, TargetRequirement, TriggeredAbilityDef,
};
use crate::zones::Zone;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Card types in MTG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Creature,
    Instant,
    Sorcery,
    Enchantment,
    Artifact,
    Land,
    Planeswalker,
}

impl CardType {
    pub fn is_permanent(self) -> bool {
        !matches!(self, CardType::Instant | CardType::Sorcery)
    }
}

/// Immutable card data shared by every instance of a card
///
/// Built once by the card database and referenced through `Arc` from each
/// `Card` in play, so copies of a deck share one definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDefinition {
    pub name: CardName,
    pub mana_cost: ManaCost,
    pub types: SmallVec<[CardType; 2]>,
    pub legendary: bool,
    pub subtypes: SmallVec<[Subtype; 2]>,
    /// Colors of the card (derived from the cost unless set explicitly)
    pub colors: SmallVec<[Color; 2]>,
    pub power: Option<i32>,
    pub toughness: Option<i32>,
    /// Starting loyalty (planeswalkers)
    pub loyalty: Option<i32>,
    pub keywords: SmallVec<[Keyword; 4]>,
    /// Targets chosen when the spell is cast (instants, sorceries, Auras)
    pub spell_targets: Vec<TargetRequirement>,
    /// Effects of the spell itself on resolution
    pub spell_effects: Vec<Effect>,
    pub activated_abilities: Vec<ActivatedAbility>,
    pub triggered_abilities: Vec<TriggeredAbilityDef>,
    /// Bonus for the permanent an Aura or Equipment is attached to
    pub attached_buff: Option<AttachedBuff>,
    pub text: String,
}

impl CardDefinition {
    pub fn new(name: impl Into<CardName>, mana_cost: ManaCost) -> Self {
        let colors = mana_cost.colors();
        CardDefinition {
            name: name.into(),
            mana_cost,
            types: SmallVec::new(),
            legendary: false,
            subtypes: SmallVec::new(),
            colors,
            power: None,
            toughness: None,
            loyalty: None,
            keywords: SmallVec::new(),
            spell_targets: Vec::new(),
            spell_effects: Vec::new(),
            activated_abilities: Vec::new(),
            triggered_abilities: Vec::new(),
            attached_buff: None,
            text: String::new(),
        }
    }

    pub fn with_type(mut self, card_type: CardType) -> Self {
        if !self.types.contains(&card_type) {
            self.types.push(card_type);
        }
        self
    }

    pub fn with_subtype(mut self, subtype: &str) -> Self {
        self.subtypes.push(Subtype::new(subtype));
        self
    }

    pub fn legendary(mut self) -> Self {
        self.legendary = true;
        self
    }

    pub fn with_colors(mut self, colors: &[Color]) -> Self {
        self.colors = colors.iter().copied().collect();
        self
    }

    pub fn creature(mut self, power: i32, toughness: i32) -> Self {
        self = self.with_type(CardType::Creature);
        self.power = Some(power);
        self.toughness = Some(toughness);
        self
    }

    pub fn with_loyalty(mut self, loyalty: i32) -> Self {
        self = self.with_type(CardType::Planeswalker);
        self.loyalty = Some(loyalty);
        self
    }

    pub fn with_keyword(mut self, keyword: Keyword) -> Self {
        self.keywords.push(keyword);
        self
    }

    pub fn with_spell(mut self, targets: Vec<TargetRequirement>, effects: Vec<Effect>) -> Self {
        self.spell_targets = targets;
        self.spell_effects = effects;
        self
    }

    pub fn with_ability(mut self, ability: ActivatedAbility) -> Self {
        self.activated_abilities.push(ability);
        self
    }

    pub fn with_trigger(mut self, trigger: TriggeredAbilityDef) -> Self {
        self.triggered_abilities.push(trigger);
        self
    }

    pub fn with_attached_buff(mut self, buff: AttachedBuff) -> Self {
        self.attached_buff = Some(buff);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn is_type(&self, card_type: CardType) -> bool {
        self.types.contains(&card_type)
    }

    pub fn is_permanent(&self) -> bool {
        self.types.iter().any(|t| t.is_permanent())
    }

    pub fn is_aura(&self) -> bool {
        self.is_type(CardType::Enchantment) && self.subtypes.iter().any(Subtype::is_aura)
    }

    pub fn is_equipment(&self) -> bool {
        self.is_type(CardType::Artifact) && self.subtypes.iter().any(Subtype::is_equipment)
    }
}

/// Represents a card in the game
///
/// Cards have a unique id but many cards can share the same definition.
/// This struct is the instance of a card during gameplay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,

    pub definition: Arc<CardDefinition>,

    pub owner: PlayerId,

    /// Current controller (can differ from owner)
    pub controller: PlayerId,

    /// The zone this card is in; exactly one at a time
    pub zone: Zone,

    pub tapped: bool,

    pub flipped: bool,

    /// Damage marked this turn
    pub damage: i32,

    /// Marked damage includes damage from a deathtouch source
    pub deathtouch_damage: bool,

    pub counters: SmallVec<[(CounterType, u32); 2]>,

    /// Until-end-of-turn power/toughness modifiers
    pub eot_power: i32,
    pub eot_toughness: i32,
    pub eot_keywords: SmallVec<[Keyword; 2]>,

    /// Permanent this Aura/Equipment is attached to
    pub attached_to: Option<CardId>,

    /// Turn this card entered the battlefield (summoning sickness)
    pub turn_entered_battlefield: Option<u32>,

    pub is_token: bool,

    /// Last turn a loyalty ability of this permanent was activated
    pub loyalty_activated_turn: Option<u32>,
}

impl Card {
    pub fn new(id: CardId, definition: Arc<CardDefinition>, owner: PlayerId) -> Self {
        Card {
            id,
            definition,
            owner,
            controller: owner,
            zone: Zone::Library,
            tapped: false,
            flipped: false,
            damage: 0,
            deathtouch_damage: false,
            counters: SmallVec::new(),
            eot_power: 0,
            eot_toughness: 0,
            eot_keywords: SmallVec::new(),
            attached_to: None,
            turn_entered_battlefield: None,
            is_token: false,
            loyalty_activated_turn: None,
        }
    }

    pub fn name(&self) -> &CardName {
        &self.definition.name
    }

    pub fn mana_cost(&self) -> &ManaCost {
        &self.definition.mana_cost
    }

    pub fn colors(&self) -> &[Color] {
        &self.definition.colors
    }

    pub fn has_color(&self, color: Color) -> bool {
        self.definition.colors.contains(&color)
    }

    pub fn is_type(&self, card_type: CardType) -> bool {
        self.definition.is_type(card_type)
    }

    pub fn is_creature(&self) -> bool {
        self.is_type(CardType::Creature)
    }

    pub fn is_land(&self) -> bool {
        self.is_type(CardType::Land)
    }

    pub fn is_planeswalker(&self) -> bool {
        self.is_type(CardType::Planeswalker)
    }

    pub fn is_instant(&self) -> bool {
        self.is_type(CardType::Instant)
    }

    pub fn is_permanent(&self) -> bool {
        self.definition.is_permanent()
    }

    pub fn is_legendary(&self) -> bool {
        self.definition.legendary
    }

    pub fn is_aura(&self) -> bool {
        self.definition.is_aura()
    }

    pub fn is_equipment(&self) -> bool {
        self.definition.is_equipment()
    }

    /// Printed or until-end-of-turn keyword (not counting attachments)
    pub fn has_keyword(&self, keyword: Keyword) -> bool {
        self.definition.keywords.contains(&keyword) || self.eot_keywords.contains(&keyword)
    }

    pub fn tap(&mut self) {
        self.tapped = true;
    }

    pub fn untap(&mut self) {
        self.tapped = false;
    }

    pub fn add_counter(&mut self, counter_type: CounterType, amount: u32) {
        if let Some((_, count)) = self.counters.iter_mut().find(|(t, _)| *t == counter_type) {
            *count += amount;
        } else if amount > 0 {
            self.counters.push((counter_type, amount));
        }
    }

    /// Remove up to `amount` counters, returning how many were removed
    pub fn remove_counter(&mut self, counter_type: &CounterType, amount: u32) -> u32 {
        let Some(pos) = self.counters.iter().position(|(t, _)| t == counter_type) else {
            return 0;
        };
        let removed = amount.min(self.counters[pos].1);
        self.counters[pos].1 -= removed;
        if self.counters[pos].1 == 0 {
            self.counters.remove(pos);
        }
        removed
    }

    pub fn get_counter(&self, counter_type: &CounterType) -> u32 {
        self.counters
            .iter()
            .find(|(t, _)| t == counter_type)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    fn counter_modifier(&self) -> i32 {
        self.get_counter(&CounterType::PlusOnePlusOne) as i32
            - self.get_counter(&CounterType::MinusOneMinusOne) as i32
    }

    /// Power including counters and until-end-of-turn effects
    pub fn current_power(&self) -> i32 {
        self.definition.power.unwrap_or(0) + self.counter_modifier() + self.eot_power
    }

    /// Toughness including counters and until-end-of-turn effects
    pub fn current_toughness(&self) -> i32 {
        self.definition.toughness.unwrap_or(0) + self.counter_modifier() + self.eot_toughness
    }

    pub fn loyalty(&self) -> i32 {
        self.get_counter(&CounterType::Loyalty) as i32
    }

    /// Has this permanent been under its controller's control since the
    /// start of their most recent turn? Haste is checked by
    /// `GameState::is_summoning_sick`, which also sees granted keywords.
    pub fn arrived_this_turn(&self, current_turn: u32) -> bool {
        self.turn_entered_battlefield
            .map_or(true, |turn| turn >= current_turn)
    }

    /// Clear per-zone state when the card leaves the battlefield
    pub fn reset_permanent_state(&mut self) {
        self.tapped = false;
        self.flipped = false;
        self.damage = 0;
        self.deathtouch_damage = false;
        self.counters.clear();
        self.clear_end_of_turn_effects();
        self.attached_to = None;
        self.turn_entered_battlefield = None;
        self.loyalty_activated_turn = None;
    }

    pub fn clear_end_of_turn_effects(&mut self) {
        self.eot_power = 0;
        self.eot_toughness = 0;
        self.eot_keywords.clear();
    }
}

impl GameEntity<Card> for Card {
    fn id(&self) -> CardId {
        self.id
    }

    fn name(&self) -> &str {
        self.definition.name.as_str()
    }
}
