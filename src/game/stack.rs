//! The stack: spells and abilities waiting to resolve (LIFO)
//!
//! Only the data structure lives here. Resolution needs the whole game
//! state and is implemented on `GameState` in `actions.rs`.

use crate::core::{CardId, CardName, Color, Effect, PlayerId, StackItemId, TargetRequirement, TriggerId};
use crate::game::targeting::TargetRef;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What put an item on the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackItemKind {
    Spell,
    /// Index into the source's activated abilities
    ActivatedAbility { index: usize },
    TriggeredAbility { trigger: TriggerId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackItem {
    pub id: StackItemId,
    pub kind: StackItemKind,
    /// The spell card, or the permanent the ability came from
    pub source: Option<CardId>,
    pub source_name: CardName,
    /// Colors of the source when the item was created (protection checks)
    pub source_colors: SmallVec<[Color; 2]>,
    pub controller: PlayerId,
    pub targets: Vec<TargetRef>,
    pub requirements: Vec<TargetRequirement>,
    pub effects: Vec<Effect>,
    /// Bound value of X (0 when the cost had no X)
    pub x_value: u32,
    /// Object or player that caused a trigger
    pub subject: Option<TargetRef>,
    pub countered: bool,
}

impl StackItem {
    pub fn is_spell(&self) -> bool {
        matches!(self.kind, StackItemKind::Spell)
    }

    /// Spell card on the stack, if this item is a spell
    pub fn spell_card(&self) -> Option<CardId> {
        if self.is_spell() {
            self.source
        } else {
            None
        }
    }
}

/// The shared stack zone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stack {
    /// Bottom first; the top is the last element
    items: Vec<StackItem>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: StackItem) {
        self.items.push(item);
    }

    /// Remove and return the top item
    pub fn pop(&mut self) -> Option<StackItem> {
        self.items.pop()
    }

    pub fn peek(&self) -> Option<&StackItem> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, id: StackItemId) -> Option<&StackItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: StackItemId) -> bool {
        self.get(id).is_some()
    }

    /// Mark an item countered; it will do nothing when it resolves
    pub fn counter(&mut self, id: StackItemId) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) if !item.countered => {
                item.countered = true;
                true
            }
            _ => false,
        }
    }

    /// Take an item off the stack without resolving it
    pub fn remove(&mut self, id: StackItemId) -> Option<StackItem> {
        let pos = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(pos))
    }

    /// The stack item for a spell card
    pub fn find_spell(&self, card: CardId) -> Option<&StackItem> {
        self.items
            .iter()
            .find(|item| item.spell_card() == Some(card))
    }

    /// Items bottom to top
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &StackItem> {
        self.items.iter()
    }
}
