//! Core game types and entities

pub mod card;
pub mod effects;
pub mod entity;
pub mod mana;
pub mod mana_parser;
pub mod player;
pub mod types;

pub use card::{Card, CardDefinition, CardType};
pub use effects::{
    AbilityCost, ActivatedAbility, Amount, AttachedBuff, Effect, EffectTarget, Keyword,
    TargetController, TargetKind, TargetRequirement, TriggerEventKind, TriggerFilter,
    TriggerSubject, TriggeredAbilityDef,
};
pub use entity::{EntityId, EntityStore, GameEntity};
pub use mana::{Color, HybridSymbol, ManaCost, ManaPayment, ManaPool};
pub use player::{LossReason, Player};
pub use types::{CardName, CounterType, PlayerName, Subtype};

pub type CardId = EntityId<Card>;
pub type PlayerId = EntityId<Player>;
pub type StackItemId = EntityId<crate::game::StackItem>;
pub type TriggerId = EntityId<crate::game::triggers::TriggerWatcher>;
