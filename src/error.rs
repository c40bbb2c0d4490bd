//! Error types for the rules engine
//!
//! Two layers:
//! - `MtgError` is the crate-internal error used by low-level state access
//!   (entity lookup, zone moves, loaders) with the `Result<T>` alias.
//! - `RulesViolation` is what callers of the command boundary see. Every
//!   player-facing rejection carries a `ReasonCode` from a closed set.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MtgError {
    #[error("Entity not found: {0}")]
    EntityNotFound(u32),

    #[error("Invalid game action: {0}")]
    InvalidAction(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid deck format: {0}")]
    InvalidDeckFormat(String),

    #[error("Unknown card: {0}")]
    UnknownCard(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Rules(#[from] RulesViolation),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MtgError>;

/// Typed rejection returned by `GameEngine::submit_intent`
///
/// The first three kinds are recoverable and leave the game state untouched.
/// `EngineInvariantViolation` means the engine found itself in an impossible
/// state and aborted the operation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RulesViolation {
    #[error("illegal intent: {0}")]
    IllegalIntent(ReasonCode),

    #[error("insufficient resources: {0}")]
    InsufficientResources(ReasonCode),

    #[error("invalid target: {0}")]
    InvalidTarget(ReasonCode),

    #[error("engine invariant violation: {0}")]
    EngineInvariantViolation(String),
}

impl RulesViolation {
    /// Reason code for recoverable violations
    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            RulesViolation::IllegalIntent(code)
            | RulesViolation::InsufficientResources(code)
            | RulesViolation::InvalidTarget(code) => Some(*code),
            RulesViolation::EngineInvariantViolation(_) => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, RulesViolation::EngineInvariantViolation(_))
    }
}

impl From<MtgError> for RulesViolation {
    fn from(err: MtgError) -> Self {
        match err {
            MtgError::Rules(violation) => violation,
            other => RulesViolation::EngineInvariantViolation(other.to_string()),
        }
    }
}

/// Closed set of reasons an intent can be rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonCode {
    GameOver,
    NotWaitingForPlayer,
    WrongDecisionKind,
    NotPriorityHolder,
    NotActivePlayer,
    NotSorcerySpeed,
    WrongStep,
    CardNotInHand,
    CardNotOnBattlefield,
    NotALand,
    NotCastable,
    LandAlreadyPlayed,
    NoSuchAbility,
    LoyaltyAbilityUsed,
    NotController,
    AlreadyTapped,
    SummoningSick,
    UnboundX,
    InsufficientMana,
    InsufficientLife,
    InsufficientLoyalty,
    WrongTargetCount,
    TargetNotLegal,
    DuplicateTarget,
    NotACreature,
    HasDefender,
    InvalidAttackTarget,
    AlreadyDeclared,
    DuplicateDeclaration,
    NotAttacking,
    CannotBlockFlyer,
    MenaceNeedsTwoBlockers,
    ProtectionForbidsBlock,
    NotDefending,
    MulliganNotAllowed,
}

impl ReasonCode {
    pub fn description(&self) -> &'static str {
        match self {
            ReasonCode::GameOver => "the game is over",
            ReasonCode::NotWaitingForPlayer => "the engine is not waiting for this player",
            ReasonCode::WrongDecisionKind => "this intent does not answer the pending decision",
            ReasonCode::NotPriorityHolder => "player does not hold priority",
            ReasonCode::NotActivePlayer => "only the active player may do this",
            ReasonCode::NotSorcerySpeed => "only allowed at sorcery speed",
            ReasonCode::WrongStep => "not allowed in the current step",
            ReasonCode::CardNotInHand => "card is not in the player's hand",
            ReasonCode::CardNotOnBattlefield => "card is not on the battlefield",
            ReasonCode::NotALand => "card is not a land",
            ReasonCode::NotCastable => "card cannot be cast",
            ReasonCode::LandAlreadyPlayed => "land drop already used this turn",
            ReasonCode::NoSuchAbility => "no such ability",
            ReasonCode::LoyaltyAbilityUsed => "a loyalty ability of this permanent was already activated this turn",
            ReasonCode::NotController => "player does not control this object",
            ReasonCode::AlreadyTapped => "permanent is already tapped",
            ReasonCode::SummoningSick => "creature has summoning sickness",
            ReasonCode::UnboundX => "X must be chosen before paying",
            ReasonCode::InsufficientMana => "not enough mana",
            ReasonCode::InsufficientLife => "not enough life",
            ReasonCode::InsufficientLoyalty => "not enough loyalty",
            ReasonCode::WrongTargetCount => "wrong number of targets",
            ReasonCode::TargetNotLegal => "target is not legal",
            ReasonCode::DuplicateTarget => "the same object was chosen twice",
            ReasonCode::NotACreature => "object is not a creature",
            ReasonCode::HasDefender => "creature has defender",
            ReasonCode::InvalidAttackTarget => "creature cannot attack that",
            ReasonCode::AlreadyDeclared => "declaration already made",
            ReasonCode::DuplicateDeclaration => "creature declared more than once",
            ReasonCode::NotAttacking => "creature is not attacking",
            ReasonCode::CannotBlockFlyer => "flying creatures need flying or reach to block",
            ReasonCode::MenaceNeedsTwoBlockers => "menace requires two or more blockers",
            ReasonCode::ProtectionForbidsBlock => "attacker has protection from the blocker",
            ReasonCode::NotDefending => "player is not being attacked",
            ReasonCode::MulliganNotAllowed => "mulligan not allowed",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
