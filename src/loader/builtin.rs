//! Built-in card set and sample decks
//!
//! A small pool of real cards covering every keyword, effect and trigger
//! kind the engine models, plus four 40-card decks built from it for
//! self-play and tests.

use crate::core::{
    AbilityCost, ActivatedAbility, Amount, AttachedBuff, CardDefinition, CardType, Color,
    CounterType, Effect, EffectTarget, Keyword, ManaCost, TargetController, TargetKind,
    TargetRequirement, TriggerEventKind, TriggerFilter, TriggerSubject, TriggeredAbilityDef,
};
use crate::loader::{DeckList, DeckLoader};
use crate::{MtgError, Result};
use std::sync::Arc;

fn card(name: &str, cost: &str) -> Result<CardDefinition> {
    Ok(CardDefinition::new(name, ManaCost::parse(cost)?))
}

fn basic_land(name: &str, color: Color) -> CardDefinition {
    CardDefinition::new(name, ManaCost::new())
        .with_type(CardType::Land)
        .with_ability(ActivatedAbility::tap_for_mana(color))
}

fn any_target() -> Vec<TargetRequirement> {
    vec![TargetRequirement::new(TargetKind::Any)]
}

fn target(kind: TargetKind) -> Vec<TargetRequirement> {
    vec![TargetRequirement::new(kind)]
}

fn damage(amount: Amount) -> Vec<Effect> {
    vec![Effect::DealDamage {
        target: EffectTarget::Target(0),
        amount,
    }]
}

fn instant(def: CardDefinition) -> CardDefinition {
    def.with_type(CardType::Instant)
}

fn sorcery(def: CardDefinition) -> CardDefinition {
    def.with_type(CardType::Sorcery)
}

fn soldier_token() -> CardDefinition {
    CardDefinition::new("Soldier", ManaCost::new())
        .creature(1, 1)
        .with_subtype("Soldier")
        .with_colors(&[Color::White])
}

/// Every card in the built-in set
pub fn builtin_cards() -> Result<Vec<CardDefinition>> {
    let mut cards = vec![
        basic_land("Plains", Color::White),
        basic_land("Island", Color::Blue),
        basic_land("Swamp", Color::Black),
        basic_land("Mountain", Color::Red),
        basic_land("Forest", Color::Green),
    ];

    // Red
    cards.extend([
        card("Goblin Guide", "R")?
            .creature(2, 2)
            .with_keyword(Keyword::Haste),
        card("Raging Goblin", "R")?
            .creature(1, 1)
            .with_keyword(Keyword::Haste),
        card("Boggart Brute", "2R")?
            .creature(3, 2)
            .with_keyword(Keyword::Menace),
        card("Wall of Stone", "1RR")?
            .creature(0, 8)
            .with_keyword(Keyword::Defender),
        card("Prodigal Pyromancer", "2R")?.creature(1, 1).with_ability(
            ActivatedAbility::new(
                AbilityCost {
                    tap: true,
                    ..AbilityCost::default()
                },
                damage(Amount::Fixed(1)),
            )
            .with_targets(any_target())
            .with_description("{T}: 1 damage to any target"),
        ),
        instant(card("Lightning Bolt", "R")?).with_spell(any_target(), damage(Amount::Fixed(3))),
        instant(card("Shock", "R")?).with_spell(any_target(), damage(Amount::Fixed(2))),
        sorcery(card("Fireball", "XR")?).with_spell(any_target(), damage(Amount::X)),
        sorcery(card("Lava Axe", "4R")?)
            .with_spell(target(TargetKind::Player), damage(Amount::Fixed(5))),
        card("Chandra Nalaar", "3RR")?
            .legendary()
            .with_loyalty(6)
            .with_ability(
                ActivatedAbility::new(
                    AbilityCost {
                        loyalty: Some(1),
                        ..AbilityCost::default()
                    },
                    damage(Amount::Fixed(1)),
                )
                .with_targets(target(TargetKind::Player))
                .with_description("+1: 1 damage to target player"),
            )
            .with_ability(
                ActivatedAbility::new(
                    AbilityCost {
                        loyalty: Some(-3),
                        ..AbilityCost::default()
                    },
                    damage(Amount::Fixed(3)),
                )
                .with_targets(target(TargetKind::Creature))
                .with_description("-3: 3 damage to target creature"),
            ),
        card("Boros Recruit", "{R/W}")?
            .creature(1, 1)
            .with_keyword(Keyword::FirstStrike),
    ]);

    // Green
    cards.extend([
        card("Llanowar Elves", "G")?
            .creature(1, 1)
            .with_ability(ActivatedAbility::tap_for_mana(Color::Green)),
        card("Grizzly Bears", "1G")?.creature(2, 2),
        card("Giant Spider", "3G")?
            .creature(2, 4)
            .with_keyword(Keyword::Reach),
        card("Colossal Dreadmaw", "4GG")?
            .creature(6, 6)
            .with_keyword(Keyword::Trample),
        card("Blastoderm", "2GG")?
            .creature(5, 5)
            .with_keyword(Keyword::Shroud),
        card("Gladecover Scout", "G")?
            .creature(1, 1)
            .with_keyword(Keyword::Hexproof),
        card("Elvish Visionary", "1G")?.creature(1, 1).with_trigger(
            TriggeredAbilityDef::new(
                TriggerEventKind::EntersBattlefield,
                vec![Effect::DrawCards {
                    target: EffectTarget::Controller,
                    amount: Amount::Fixed(1),
                }],
            )
            .with_description("When this enters, draw a card"),
        ),
        instant(card("Giant Growth", "G")?).with_spell(
            target(TargetKind::Creature),
            vec![Effect::Pump {
                target: EffectTarget::Target(0),
                power: 3,
                toughness: 3,
            }],
        ),
        instant(card("Mutagenic Growth", "{G/P}")?).with_spell(
            target(TargetKind::Creature),
            vec![Effect::Pump {
                target: EffectTarget::Target(0),
                power: 2,
                toughness: 2,
            }],
        ),
        card("Rancor", "G")?
            .with_type(CardType::Enchantment)
            .with_subtype("Aura")
            .with_spell(target(TargetKind::Creature), Vec::new())
            .with_attached_buff(AttachedBuff {
                power: 2,
                toughness: 0,
                keywords: vec![Keyword::Trample],
            }),
    ]);

    // White
    cards.extend([
        card("Savannah Lions", "W")?.creature(2, 1),
        card("Youthful Knight", "1W")?
            .creature(2, 1)
            .with_keyword(Keyword::FirstStrike),
        card("White Knight", "WW")?
            .creature(2, 2)
            .with_keyword(Keyword::FirstStrike)
            .with_keyword(Keyword::ProtectionFrom(Color::Black)),
        card("Fencing Ace", "1W")?
            .creature(1, 1)
            .with_keyword(Keyword::DoubleStrike),
        card("Serra Angel", "3WW")?
            .creature(4, 4)
            .with_keyword(Keyword::Flying)
            .with_keyword(Keyword::Vigilance),
        card("Isamaru, Hound of Konda", "W")?
            .legendary()
            .creature(2, 2),
        card("Soul Warden", "W")?.creature(1, 1).with_trigger(
            TriggeredAbilityDef::new(
                TriggerEventKind::EntersBattlefield,
                vec![Effect::GainLife {
                    target: EffectTarget::Controller,
                    amount: Amount::Fixed(1),
                }],
            )
            .with_filter(TriggerFilter {
                subject: TriggerSubject::Another,
                controller: TargetController::Any,
                creature_only: true,
            })
            .with_description("Whenever another creature enters, gain 1 life"),
        ),
        card("Ajani's Pridemate", "1W")?.creature(2, 2).with_trigger(
            TriggeredAbilityDef::new(
                TriggerEventKind::LifeGained,
                vec![Effect::AddCounters {
                    target: EffectTarget::Source,
                    counter: CounterType::PlusOnePlusOne,
                    amount: Amount::Fixed(1),
                }],
            )
            .with_filter(TriggerFilter {
                controller: TargetController::You,
                ..TriggerFilter::default()
            })
            .with_description("Whenever you gain life, put a +1/+1 counter on this"),
        ),
        instant(card("Healing Salve", "W")?).with_spell(
            target(TargetKind::Player),
            vec![Effect::GainLife {
                target: EffectTarget::Target(0),
                amount: Amount::Fixed(3),
            }],
        ),
        instant(card("Raise the Alarm", "1W")?).with_spell(
            Vec::new(),
            vec![Effect::CreateToken {
                token: Arc::new(soldier_token()),
                count: 2,
            }],
        ),
        card("Bonesplitter", "1")?
            .with_type(CardType::Artifact)
            .with_subtype("Equipment")
            .with_attached_buff(AttachedBuff {
                power: 2,
                toughness: 0,
                keywords: Vec::new(),
            })
            .with_ability(
                ActivatedAbility::new(
                    AbilityCost {
                        mana: ManaCost::parse("1")?,
                        ..AbilityCost::default()
                    },
                    vec![Effect::AttachSource {
                        target: EffectTarget::Target(0),
                    }],
                )
                .with_targets(vec![TargetRequirement::controlled_by(
                    TargetKind::Creature,
                    TargetController::You,
                )])
                .at_sorcery_speed()
                .with_description("Equip {1}"),
            ),
        card("Lightning Greaves", "2")?
            .with_type(CardType::Artifact)
            .with_subtype("Equipment")
            .with_attached_buff(AttachedBuff {
                power: 0,
                toughness: 0,
                keywords: vec![Keyword::Haste, Keyword::Shroud],
            })
            .with_ability(
                ActivatedAbility::new(
                    AbilityCost::default(),
                    vec![Effect::AttachSource {
                        target: EffectTarget::Target(0),
                    }],
                )
                .with_targets(vec![TargetRequirement::controlled_by(
                    TargetKind::Creature,
                    TargetController::You,
                )])
                .at_sorcery_speed()
                .with_description("Equip {0}"),
            ),
    ]);

    // Blue and black
    cards.extend([
        instant(card("Counterspell", "UU")?).with_spell(
            target(TargetKind::Spell),
            vec![Effect::CounterSpell {
                target: EffectTarget::Target(0),
            }],
        ),
        card("Air Elemental", "3UU")?
            .creature(4, 4)
            .with_keyword(Keyword::Flying),
        card("Blighted Agent", "1U")?
            .creature(1, 1)
            .with_keyword(Keyword::Infect),
        instant(card("Thought Scour", "U")?).with_spell(
            target(TargetKind::Player),
            vec![
                Effect::Mill {
                    target: EffectTarget::Target(0),
                    amount: Amount::Fixed(2),
                },
                Effect::DrawCards {
                    target: EffectTarget::Controller,
                    amount: Amount::Fixed(1),
                },
            ],
        ),
        card("Typhoid Rats", "B")?
            .creature(1, 1)
            .with_keyword(Keyword::Deathtouch),
        card("Vampire Nighthawk", "1BB")?
            .creature(2, 3)
            .with_keyword(Keyword::Flying)
            .with_keyword(Keyword::Deathtouch)
            .with_keyword(Keyword::Lifelink),
        instant(card("Doom Blade", "1B")?).with_spell(
            target(TargetKind::Creature),
            vec![Effect::Destroy {
                target: EffectTarget::Target(0),
            }],
        ),
        card("Phyrexian Arena", "1BB")?
            .with_type(CardType::Enchantment)
            .with_trigger(
                TriggeredAbilityDef::new(
                    TriggerEventKind::BeginningOfUpkeep,
                    vec![
                        Effect::DrawCards {
                            target: EffectTarget::Controller,
                            amount: Amount::Fixed(1),
                        },
                        Effect::LoseLife {
                            target: EffectTarget::Controller,
                            amount: Amount::Fixed(1),
                        },
                    ],
                )
                .with_filter(TriggerFilter {
                    controller: TargetController::You,
                    ..TriggerFilter::default()
                })
                .with_description("At the beginning of your upkeep, draw a card and lose 1 life"),
            ),
        card("Darksteel Myr", "3")?
            .with_type(CardType::Artifact)
            .creature(0, 1)
            .with_keyword(Keyword::Indestructible),
    ]);

    Ok(cards)
}

const RED_AGGRO: &str = "\
[Main]
16 Mountain
4 Goblin Guide
4 Raging Goblin
4 Boggart Brute
2 Prodigal Pyromancer
4 Lightning Bolt
3 Shock
2 Fireball
1 Chandra Nalaar
";

const GREEN_STOMPY: &str = "\
[Main]
17 Forest
4 Llanowar Elves
4 Grizzly Bears
3 Elvish Visionary
2 Gladecover Scout
3 Giant Spider
2 Colossal Dreadmaw
3 Giant Growth
2 Rancor
";

const WHITE_WEENIE: &str = "\
[Main]
17 Plains
4 Savannah Lions
4 Youthful Knight
3 White Knight
2 Serra Angel
2 Soul Warden
3 Ajani's Pridemate
2 Raise the Alarm
1 Healing Salve
2 Bonesplitter
";

const DIMIR_INFECT: &str = "\
[Main]
9 Island
8 Swamp
4 Blighted Agent
4 Typhoid Rats
3 Vampire Nighthawk
2 Air Elemental
3 Counterspell
3 Doom Blade
2 Thought Scour
1 Phyrexian Arena
1 Darksteel Myr
";

/// Names of the built-in decks
pub const BUILTIN_DECKS: [&str; 4] = ["red_aggro", "green_stompy", "white_weenie", "dimir_infect"];

/// Look up a built-in deck by name
pub fn builtin_deck(name: &str) -> Result<DeckList> {
    let content = match name {
        "red_aggro" => RED_AGGRO,
        "green_stompy" => GREEN_STOMPY,
        "white_weenie" => WHITE_WEENIE,
        "dimir_infect" => DIMIR_INFECT,
        other => {
            return Err(MtgError::InvalidDeckFormat(format!(
                "no built-in deck named {other}"
            )))
        }
    };
    DeckLoader::parse(content)
}
