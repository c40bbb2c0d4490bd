//! Zero decision provider for testing and automation
//!
//! Always takes the first candidate: plays a land or casts whatever comes
//! first, keeps its opening hand, declares no attackers and no blockers
//! (the empty declaration is always listed first). Games between zero
//! providers are fully determined by the engine seed.

use crate::core::PlayerId;
use crate::game::controller::DecisionProvider;
use crate::game::intent::{DecisionKind, Intent};
use crate::game::snapshot::StateSnapshot;

pub struct ZeroController {
    player_id: PlayerId,
}

impl ZeroController {
    pub fn new(player_id: PlayerId) -> Self {
        ZeroController { player_id }
    }
}

impl DecisionProvider for ZeroController {
    fn player_id(&self) -> PlayerId {
        self.player_id
    }

    fn choose(&mut self, _view: &StateSnapshot, _kind: DecisionKind, _options: &[Intent]) -> usize {
        0
    }

    fn name(&self) -> &str {
        "zero"
    }
}
