//! Random decision provider for self-play and baseline gameplay
//!
//! Picks uniformly among the candidate intents. Seeded with ChaCha so a
//! game between two random providers replays exactly from its seeds.

use crate::core::PlayerId;
use crate::game::controller::DecisionProvider;
use crate::game::intent::{DecisionKind, Intent};
use crate::game::snapshot::StateSnapshot;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

/// A provider that makes random choices
#[derive(Debug, Clone)]
pub struct RandomController {
    player_id: PlayerId,
    rng: ChaCha12Rng,
    /// Probability of passing priority when something else is possible
    pass_bias: f64,
}

impl RandomController {
    pub fn new(player_id: PlayerId, seed: u64) -> Self {
        RandomController {
            player_id,
            rng: ChaCha12Rng::seed_from_u64(seed),
            pass_bias: 0.0,
        }
    }

    /// Pass priority with the given probability before choosing uniformly
    pub fn with_pass_bias(mut self, bias: f64) -> Self {
        self.pass_bias = bias.clamp(0.0, 1.0);
        self
    }
}

impl DecisionProvider for RandomController {
    fn player_id(&self) -> PlayerId {
        self.player_id
    }

    fn choose(&mut self, _view: &StateSnapshot, kind: DecisionKind, options: &[Intent]) -> usize {
        if options.len() <= 1 {
            return 0;
        }
        if kind == DecisionKind::Priority && self.pass_bias > 0.0 && self.rng.gen_bool(self.pass_bias) {
            if let Some(pass) = options.iter().position(|o| *o == Intent::PassPriority) {
                return pass;
            }
        }
        self.rng.gen_range(0..options.len())
    }

    fn name(&self) -> &str {
        "random"
    }
}
