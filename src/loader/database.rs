//! Card database for looking up card definitions
//!
//! Provides efficient lookup of card definitions by name

use crate::core::CardDefinition;
use crate::loader::{builtin, CardDataProvider};
use crate::Result;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Database of card definitions, keyed by lowercase name
#[derive(Debug, Clone, Default)]
pub struct CardDatabase {
    cards: FxHashMap<String, Arc<CardDefinition>>,
}

impl CardDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Database holding the built-in card set
    pub fn builtin() -> Result<Self> {
        let mut db = CardDatabase::new();
        for card in builtin::builtin_cards()? {
            db.add_card(card);
        }
        Ok(db)
    }

    /// Add a single card definition, replacing any card with the same name
    pub fn add_card(&mut self, card_def: CardDefinition) {
        let name_lower = card_def.name.to_lowercase();
        self.cards.insert(name_lower, Arc::new(card_def));
    }

    /// Card names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.cards.values().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl CardDataProvider for CardDatabase {
    fn get_card(&self, name: &str) -> Option<Arc<CardDefinition>> {
        self.cards.get(&name.to_lowercase()).cloned()
    }
}
