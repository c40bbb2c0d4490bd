//! Deck list loader
//!
//! Format: one `N Card Name` line per entry, optional `[Section]` headers
//! (entries after a `[Sideboard]` header go to the sideboard), `#` comments.
//! A `|SET` suffix after the name is ignored.

use crate::{MtgError, Result};
use std::fs;
use std::path::Path;

pub struct DeckLoader;

impl DeckLoader {
    pub fn load_from_file(path: &Path) -> Result<DeckList> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a deck from its text content
    pub fn parse(content: &str) -> Result<DeckList> {
        let mut main_deck = Vec::new();
        let mut sideboard = Vec::new();
        let mut in_sideboard = false;

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                in_sideboard = line.eq_ignore_ascii_case("[sideboard]");
                continue;
            }

            let (count_str, rest) = line.split_once(' ').ok_or_else(|| {
                MtgError::InvalidDeckFormat(format!("line {}: expected `N Card Name`", line_no + 1))
            })?;
            let count = count_str.parse::<u32>().map_err(|_| {
                MtgError::InvalidDeckFormat(format!("line {}: bad count {count_str:?}", line_no + 1))
            })?;
            let card_name = match rest.split_once('|') {
                Some((name, _set)) => name.trim(),
                None => rest.trim(),
            };
            if card_name.is_empty() {
                return Err(MtgError::InvalidDeckFormat(format!(
                    "line {}: missing card name",
                    line_no + 1
                )));
            }

            let entry = DeckEntry {
                card_name: card_name.to_string(),
                count,
            };
            if in_sideboard {
                sideboard.push(entry);
            } else {
                main_deck.push(entry);
            }
        }

        if main_deck.is_empty() {
            return Err(MtgError::InvalidDeckFormat("Empty deck".to_string()));
        }

        Ok(DeckList {
            main_deck,
            sideboard,
        })
    }
}

/// Represents a deck entry (card name and count)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckEntry {
    pub card_name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckList {
    pub main_deck: Vec<DeckEntry>,
    pub sideboard: Vec<DeckEntry>,
}

impl DeckList {
    /// Total cards in main deck
    pub fn total_cards(&self) -> usize {
        self.main_deck.iter().map(|e| e.count as usize).sum()
    }

    pub fn sideboard_size(&self) -> usize {
        self.sideboard.iter().map(|e| e.count as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_deck() {
        let content = r#"
# burn
[Main]
20 Mountain
40 Lightning Bolt|M10

[Sideboard]
15 Shock
"#;

        let deck = DeckLoader::parse(content).unwrap();
        assert_eq!(deck.main_deck.len(), 2);
        assert_eq!(deck.total_cards(), 60);
        assert_eq!(deck.main_deck[1].card_name, "Lightning Bolt");
        assert_eq!(deck.main_deck[1].count, 40);
        assert_eq!(deck.sideboard_size(), 15);
    }

    #[test]
    fn test_bad_lines_rejected() {
        assert!(DeckLoader::parse("Mountain").is_err());
        assert!(DeckLoader::parse("x Mountain").is_err());
        assert!(DeckLoader::parse("[Sideboard]\n4 Shock").is_err());
    }
}
