//! Card effects and ability system
//!
//! Effects are typed data, never card text. A spell or ability carries a list
//! of `Effect`s plus the `TargetRequirement`s its controller must satisfy when
//! putting it on the stack. Effects refer to their objects through
//! `EffectTarget`, which is bound at resolution time.

use crate::core::{CardDefinition, Color, CounterType, ManaCost};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Keyword abilities in MTG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    Flying,
    FirstStrike,
    DoubleStrike,
    Deathtouch,
    Haste,
    Hexproof,
    Indestructible,
    Lifelink,
    Menace,
    Reach,
    Trample,
    Vigilance,
    Defender,
    Shroud,
    Infect,
    ProtectionFrom(Color),
}

/// What kind of object a target slot accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    /// Creature, player or planeswalker
    Any,
    Player,
    Creature,
    Planeswalker,
    Permanent,
    Artifact,
    Enchantment,
    Land,
    /// A spell on the stack
    Spell,
}

/// Restriction on who controls the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetController {
    #[default]
    Any,
    You,
    Opponent,
}

/// One target slot of a spell or ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRequirement {
    pub kind: TargetKind,
    pub controller: TargetController,
}

impl TargetRequirement {
    pub const fn new(kind: TargetKind) -> Self {
        TargetRequirement {
            kind,
            controller: TargetController::Any,
        }
    }

    pub const fn controlled_by(kind: TargetKind, controller: TargetController) -> Self {
        TargetRequirement { kind, controller }
    }
}

/// Who or what an effect acts on, bound when the effect resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectTarget {
    /// The chosen target in this slot
    Target(usize),
    /// The controller of the spell or ability
    Controller,
    EachOpponent,
    EachPlayer,
    /// The source permanent itself
    Source,
    /// The object or player that caused the trigger
    TriggerSubject,
    /// Every creature on the battlefield
    AllCreatures,
    /// Every creature the controller's opponents control
    OpponentCreatures,
}

/// A numeric amount, fixed or read from the bound X value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Amount {
    Fixed(i32),
    X,
}

impl Amount {
    pub fn resolve(self, x: u32) -> i32 {
        match self {
            Amount::Fixed(n) => n,
            Amount::X => x as i32,
        }
    }
}

impl From<i32> for Amount {
    fn from(n: i32) -> Self {
        Amount::Fixed(n)
    }
}

/// Card effects that can be executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// "Lightning Bolt deals 3 damage to any target"
    DealDamage { target: EffectTarget, amount: Amount },
    GainLife { target: EffectTarget, amount: Amount },
    LoseLife { target: EffectTarget, amount: Amount },
    DrawCards { target: EffectTarget, amount: Amount },
    /// Library to graveyard from the top
    Mill { target: EffectTarget, amount: Amount },
    Destroy { target: EffectTarget },
    Exile { target: EffectTarget },
    /// Return a permanent to its owner's hand
    ReturnToHand { target: EffectTarget },
    Tap { target: EffectTarget },
    Untap { target: EffectTarget },
    /// "+N/+M until end of turn"
    Pump {
        target: EffectTarget,
        power: i32,
        toughness: i32,
    },
    /// Grant a keyword until end of turn
    GrantKeyword { target: EffectTarget, keyword: Keyword },
    AddCounters {
        target: EffectTarget,
        counter: CounterType,
        amount: Amount,
    },
    AddPoison { target: EffectTarget, amount: Amount },
    /// Mana ability payload; adds to the controller's pool
    AddMana { color: Color, amount: u32 },
    CounterSpell { target: EffectTarget },
    /// Create tokens under the controller's control
    CreateToken {
        token: Arc<CardDefinition>,
        count: u32,
    },
    /// Attach the source (Equipment) to the target
    AttachSource { target: EffectTarget },
    /// Anything the engine does not model; resolving it only logs
    Unrecognized { description: String },
}

impl Effect {
    pub fn is_mana(&self) -> bool {
        matches!(self, Effect::AddMana { .. })
    }
}

/// Costs of an activated ability beyond its mana cost
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilityCost {
    pub mana: ManaCost,
    /// `{T}` in the cost
    pub tap: bool,
    /// Sacrifice the source
    pub sacrifice_self: bool,
    /// Loyalty change for planeswalker abilities (+1, -3, ...)
    pub loyalty: Option<i32>,
}

/// An activated ability printed on a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivatedAbility {
    pub cost: AbilityCost,
    pub targets: Vec<TargetRequirement>,
    pub effects: Vec<Effect>,
    pub sorcery_speed: bool,
    pub description: String,
}

impl ActivatedAbility {
    pub fn new(cost: AbilityCost, effects: Vec<Effect>) -> Self {
        ActivatedAbility {
            cost,
            targets: Vec::new(),
            effects,
            sorcery_speed: false,
            description: String::new(),
        }
    }

    /// `{T}: Add {C}` style ability
    pub fn tap_for_mana(color: Color) -> Self {
        let mut ability = ActivatedAbility::new(
            AbilityCost {
                tap: true,
                ..AbilityCost::default()
            },
            vec![Effect::AddMana { color, amount: 1 }],
        );
        ability.description = format!("{{T}}: Add {{{color}}}");
        ability
    }

    pub fn with_targets(mut self, targets: Vec<TargetRequirement>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn at_sorcery_speed(mut self) -> Self {
        self.sorcery_speed = true;
        self
    }

    /// Mana abilities don't use the stack: no targets, only mana effects,
    /// and no loyalty cost
    pub fn is_mana_ability(&self) -> bool {
        self.targets.is_empty()
            && self.cost.loyalty.is_none()
            && !self.effects.is_empty()
            && self.effects.iter().all(Effect::is_mana)
    }

    pub fn is_loyalty_ability(&self) -> bool {
        self.cost.loyalty.is_some()
    }
}

/// Events a triggered ability can watch for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerEventKind {
    EntersBattlefield,
    LeavesBattlefield,
    /// Battlefield to graveyard
    Dies,
    SpellCast,
    BeginningOfUpkeep,
    BeginningOfEndStep,
    Attacks,
    Blocks,
    DealsCombatDamageToPlayer,
    LifeGained,
    CardDrawn,
}

/// Which object's event a trigger cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerSubject {
    /// "When this creature ..."
    #[default]
    This,
    /// "Whenever another creature ..."
    Another,
    /// "Whenever a creature ..."
    Any,
}

/// Narrowing of a trigger beyond its event kind
///
/// For player-scoped events (upkeep, life gain, draws) `subject` is ignored
/// and `controller` is matched against the player the event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerFilter {
    pub subject: TriggerSubject,
    pub controller: TargetController,
    pub creature_only: bool,
}

/// A triggered ability printed on a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredAbilityDef {
    pub event: TriggerEventKind,
    pub filter: TriggerFilter,
    pub effects: Vec<Effect>,
    pub description: String,
}

impl TriggeredAbilityDef {
    pub fn new(event: TriggerEventKind, effects: Vec<Effect>) -> Self {
        TriggeredAbilityDef {
            event,
            filter: TriggerFilter::default(),
            effects,
            description: String::new(),
        }
    }

    pub fn with_filter(mut self, filter: TriggerFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Static bonus an Aura or Equipment gives the permanent it is attached to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachedBuff {
    pub power: i32,
    pub toughness: i32,
    pub keywords: Vec<Keyword>,
}
