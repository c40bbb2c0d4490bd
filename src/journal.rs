//! Action journal: the record of every atomic mutation
//!
//! Each primitive state change appends one `GameAction`. The slice of the
//! journal written while one intent was processed is that intent's
//! `StateDelta`, which hosts use to animate, replay or diff games.

use crate::core::{CardId, Color, CounterType, Keyword, LossReason, PlayerId, StackItemId};
use crate::game::{AttackTarget, Step};
use crate::zones::Zone;
use serde::{Deserialize, Serialize};

/// Atomic game actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameAction {
    MoveCard {
        card_id: CardId,
        from_zone: Zone,
        to_zone: Zone,
        owner: PlayerId,
    },

    TapCard { card_id: CardId, tapped: bool },

    /// Positive for gains, negative for losses and damage
    ModifyLife { player_id: PlayerId, amount: i32 },

    AddPoison { player_id: PlayerId, amount: u32 },

    AddMana {
        player_id: PlayerId,
        color: Color,
        amount: u32,
    },

    /// Mana and life spent on a cost
    PayCost {
        player_id: PlayerId,
        mana: u32,
        life: u32,
    },

    EmptyManaPools,

    AddCounter {
        card_id: CardId,
        counter_type: CounterType,
        amount: u32,
    },

    RemoveCounter {
        card_id: CardId,
        counter_type: CounterType,
        amount: u32,
    },

    MarkDamage {
        card_id: CardId,
        amount: i32,
        deathtouch: bool,
    },

    ModifyPowerToughness {
        card_id: CardId,
        power: i32,
        toughness: i32,
    },

    GrantKeyword { card_id: CardId, keyword: Keyword },

    /// Cleanup: marked damage removed
    RemoveDamage { card_id: CardId },

    /// Cleanup: until-end-of-turn effects end
    EndTurnEffects { card_id: CardId },

    Attach {
        card_id: CardId,
        attached_to: Option<CardId>,
    },

    CreateToken { card_id: CardId, owner: PlayerId },

    TokenCeasedToExist { card_id: CardId },

    AdvanceStep { from_step: Step, to_step: Step },

    ChangeTurn {
        from_player: PlayerId,
        to_player: PlayerId,
        turn_number: u32,
    },

    PushStack {
        item: StackItemId,
        source: Option<CardId>,
        controller: PlayerId,
    },

    ResolveStack { item: StackItemId },

    CounterStackItem { item: StackItemId },

    Fizzle { item: StackItemId },

    RemoveStackItem { item: StackItemId },

    DeclareAttacker {
        attacker: CardId,
        target: AttackTarget,
    },

    DeclareBlocker { blocker: CardId, attacker: CardId },

    CombatDamage {
        source: CardId,
        amount: i32,
        first_strike: bool,
    },

    PassPriority { player_id: PlayerId },

    PriorityTo { player_id: PlayerId },

    PlayLand { player_id: PlayerId, card_id: CardId },

    Mulligan { player_id: PlayerId, new_hand_size: usize },

    KeepHand { player_id: PlayerId },

    Shuffle { player_id: PlayerId },

    PlayerLost {
        player_id: PlayerId,
        reason: LossReason,
    },

    GameOver { winner: Option<PlayerId> },
}

/// Append-only log of game actions
///
/// Marks let a caller take the slice written since a point in time; the
/// engine marks before each intent and returns the slice as the delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionJournal {
    actions: Vec<GameAction>,

    /// Disabled journals drop actions (for benchmarks and tree search)
    enabled: bool,
}

impl ActionJournal {
    pub fn new() -> Self {
        ActionJournal {
            actions: Vec::new(),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        ActionJournal {
            actions: Vec::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn log(&mut self, action: GameAction) {
        if self.enabled {
            self.actions.push(action);
        }
    }

    /// Current position, for a later `since`
    pub fn mark(&self) -> usize {
        self.actions.len()
    }

    /// Actions recorded after `mark`
    pub fn since(&self, mark: usize) -> &[GameAction] {
        self.actions.get(mark..).unwrap_or(&[])
    }

    pub fn peek(&self) -> Option<&GameAction> {
        self.actions.last()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn actions(&self) -> &[GameAction] {
        &self.actions
    }
}

impl Default for ActionJournal {
    fn default() -> Self {
        Self::new()
    }
}

/// The atomic changes made while processing one intent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    pub actions: Vec<GameAction>,
}

impl StateDelta {
    pub fn from_journal(journal: &ActionJournal, mark: usize) -> Self {
        StateDelta {
            actions: journal.since(mark).to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Cards that changed zone in this delta, in order
    pub fn zone_changes(&self) -> impl Iterator<Item = (CardId, Zone, Zone)> + '_ {
        self.actions.iter().filter_map(|action| match action {
            GameAction::MoveCard {
                card_id,
                from_zone,
                to_zone,
                ..
            } => Some((*card_id, *from_zone, *to_zone)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_marks() {
        let mut journal = ActionJournal::new();
        journal.log(GameAction::ModifyLife {
            player_id: PlayerId::new(1),
            amount: -1,
        });

        let mark = journal.mark();
        journal.log(GameAction::MoveCard {
            card_id: CardId::new(5),
            from_zone: Zone::Hand,
            to_zone: Zone::Battlefield,
            owner: PlayerId::new(1),
        });
        journal.log(GameAction::TapCard {
            card_id: CardId::new(5),
            tapped: true,
        });

        assert_eq!(journal.len(), 3);
        let delta = StateDelta::from_journal(&journal, mark);
        assert_eq!(delta.len(), 2);
        assert_eq!(
            delta.zone_changes().collect::<Vec<_>>(),
            vec![(CardId::new(5), Zone::Hand, Zone::Battlefield)]
        );
        assert!(journal.since(journal.mark()).is_empty());
    }

    #[test]
    fn test_disabled_journal() {
        let mut journal = ActionJournal::disabled();
        journal.log(GameAction::EmptyManaPools);
        assert!(journal.is_empty());
        assert!(!journal.is_enabled());
    }
}
