//! Card data and deck loading
//!
//! The engine only needs immutable card definitions looked up by name; the
//! `CardDataProvider` trait is that seam. `CardDatabase` is the in-memory
//! implementation, seeded with the built-in card set.

pub mod builtin;
pub mod database;
pub mod deck;
pub mod game_init;

use crate::core::CardDefinition;
use std::sync::Arc;

pub use database::CardDatabase;
pub use deck::{DeckEntry, DeckList, DeckLoader};
pub use game_init::GameInitializer;

/// Immutable lookup of card definitions by name
pub trait CardDataProvider {
    /// Case-insensitive lookup
    fn get_card(&self, name: &str) -> Option<Arc<CardDefinition>>;

    fn contains(&self, name: &str) -> bool {
        self.get_card(name).is_some()
    }
}
