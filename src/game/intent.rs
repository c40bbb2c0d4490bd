//! Player intents and engine decisions
//!
//! An `Intent` is everything a player can ask the engine to do. The engine
//! answers with a `Decision` naming who must act next and what kind of
//! intent it expects.

use crate::core::{CardId, PlayerId};
use crate::game::combat::AttackTarget;
use crate::game::targeting::TargetRef;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::journal::StateDelta;

/// A request from a player
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    PlayLand {
        card: CardId,
    },
    CastSpell {
        card: CardId,
        targets: Vec<TargetRef>,
        /// Value for X; required when the cost has X
        x: Option<u32>,
    },
    ActivateAbility {
        card: CardId,
        /// Index into the card's activated abilities
        ability: usize,
        targets: Vec<TargetRef>,
    },
    PassPriority,
    DeclareAttackers {
        attackers: Vec<(CardId, AttackTarget)>,
    },
    /// (blocker, attacker) pairs
    DeclareBlockers {
        blocks: Vec<(CardId, CardId)>,
    },
    Mulligan {
        keep: bool,
    },
}

impl Intent {
    /// The decision kind this intent answers
    pub fn kind(&self) -> DecisionKind {
        match self {
            Intent::PlayLand { .. }
            | Intent::CastSpell { .. }
            | Intent::ActivateAbility { .. }
            | Intent::PassPriority => DecisionKind::Priority,
            Intent::DeclareAttackers { .. } => DecisionKind::DeclareAttackers,
            Intent::DeclareBlockers { .. } => DecisionKind::DeclareBlockers,
            Intent::Mulligan { .. } => DecisionKind::Mulligan,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::PlayLand { card } => write!(f, "play land {card}"),
            Intent::CastSpell { card, targets, x } => {
                write!(f, "cast {card}")?;
                if let Some(x) = x {
                    write!(f, " (X={x})")?;
                }
                if !targets.is_empty() {
                    write!(f, " targeting {targets:?}")?;
                }
                Ok(())
            }
            Intent::ActivateAbility {
                card,
                ability,
                targets,
            } => {
                write!(f, "activate ability {ability} of {card}")?;
                if !targets.is_empty() {
                    write!(f, " targeting {targets:?}")?;
                }
                Ok(())
            }
            Intent::PassPriority => write!(f, "pass priority"),
            Intent::DeclareAttackers { attackers } => {
                if attackers.is_empty() {
                    write!(f, "no attack")
                } else {
                    write!(f, "attack with {} creature(s)", attackers.len())
                }
            }
            Intent::DeclareBlockers { blocks } => {
                if blocks.is_empty() {
                    write!(f, "no blocks")
                } else {
                    write!(f, "block with {} creature(s)", blocks.len())
                }
            }
            Intent::Mulligan { keep: true } => write!(f, "keep hand"),
            Intent::Mulligan { keep: false } => write!(f, "mulligan"),
        }
    }
}

/// What kind of intent the engine is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    Mulligan,
    Priority,
    DeclareAttackers,
    DeclareBlockers,
}

/// The engine's state between intents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    WaitingForDecision {
        player: PlayerId,
        kind: DecisionKind,
        /// Legal candidate intents, as from `query_legal_actions`
        options: Vec<Intent>,
    },
    GameOver {
        winner: Option<PlayerId>,
    },
}

impl Decision {
    pub fn waiting_player(&self) -> Option<PlayerId> {
        match self {
            Decision::WaitingForDecision { player, .. } => Some(*player),
            Decision::GameOver { .. } => None,
        }
    }

    pub fn is_game_over(&self) -> bool {
        matches!(self, Decision::GameOver { .. })
    }
}
