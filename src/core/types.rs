//! Strongly-typed wrappers for game concepts
//!
//! Newtypes prevent mixing up the different string-like concepts (card names,
//! player names, subtypes) that flow through the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_newtype!(
    /// Card name; two permanents share a name for the legend rule iff these are equal
    CardName
);
string_newtype!(
    /// Player name (display only)
    PlayerName
);
string_newtype!(
    /// Card subtype (e.g. "Goblin", "Aura", "Equipment")
    Subtype
);

impl CardName {
    pub fn to_lowercase(&self) -> String {
        self.0.to_lowercase()
    }
}

impl Subtype {
    pub fn is_aura(&self) -> bool {
        self.0.eq_ignore_ascii_case("aura")
    }

    pub fn is_equipment(&self) -> bool {
        self.0.eq_ignore_ascii_case("equipment")
    }
}

/// Kinds of counters that can be placed on permanents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterType {
    PlusOnePlusOne,
    MinusOneMinusOne,
    Loyalty,
    Charge,
    Other(String),
}

impl fmt::Display for CounterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterType::PlusOnePlusOne => write!(f, "+1/+1"),
            CounterType::MinusOneMinusOne => write!(f, "-1/-1"),
            CounterType::Loyalty => write!(f, "loyalty"),
            CounterType::Charge => write!(f, "charge"),
            CounterType::Other(name) => write!(f, "{name}"),
        }
    }
}
