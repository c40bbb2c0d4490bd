//! Decision providers
//!
//! The engine never calls out to players. A host (such as `GameLoop`) asks
//! the engine who must decide, shows that player's `DecisionProvider` the
//! redacted view and the candidate intents, and submits the chosen one.

use crate::core::PlayerId;
use crate::game::intent::{DecisionKind, Intent};
use crate::game::snapshot::StateSnapshot;

/// Decision provider trait
///
/// Implement this trait to create AI players or connect to a UI.
pub trait DecisionProvider {
    /// The player this provider decides for
    fn player_id(&self) -> PlayerId;

    /// Pick one of `options` (never empty) by index
    ///
    /// An out-of-range index is treated as the last option, which for
    /// priority decisions is always `PassPriority`.
    fn choose(&mut self, view: &StateSnapshot, kind: DecisionKind, options: &[Intent]) -> usize;

    /// Short name for logs and tournament tables
    fn name(&self) -> &str {
        "provider"
    }

    /// Called once when the game ends
    fn on_game_end(&mut self, _view: &StateSnapshot, _won: bool) {}
}

impl<T: DecisionProvider + ?Sized> DecisionProvider for Box<T> {
    fn player_id(&self) -> PlayerId {
        (**self).player_id()
    }

    fn choose(&mut self, view: &StateSnapshot, kind: DecisionKind, options: &[Intent]) -> usize {
        (**self).choose(view, kind, options)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_game_end(&mut self, view: &StateSnapshot, won: bool) {
        (**self).on_game_end(view, won)
    }
}
