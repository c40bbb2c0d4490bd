//! MTG rules engine
//!
//! A turn-based rules engine modeled on Magic: The Gathering. The engine
//! (`game::GameEngine`) owns the game state, validates player intents,
//! resolves the stack, runs combat and state-based actions, and reports
//! every change as a `StateDelta`. Hosts drive it through decisions and
//! intents; see `game::GameLoop` for a synchronous driver.

pub mod core;
pub mod error;
pub mod game;
pub mod journal;
pub mod loader;
pub mod tournament;
pub mod zones;

pub use error::{MtgError, ReasonCode, RulesViolation, Result};
