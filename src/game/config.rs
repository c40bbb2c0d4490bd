//! Engine configuration
//!
//! Rule constants and engine policies. Loadable from JSON so that harness
//! runs can be reproduced from a config file and a seed.

use crate::game::VerbosityLevel;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What happens to an item with some (but not all) targets illegal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FizzlePolicy {
    /// All-or-nothing for single-target items, subset removal for items
    /// with several targets
    #[default]
    Auto,
    /// Any illegal target makes the whole item fizzle
    AllOrNothing,
    /// Resolve against the targets that are still legal
    RemoveIllegalSubset,
}

/// Which permanent survives the legend rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LegendRulePolicy {
    /// The most recently arrived permanent stays
    #[default]
    KeepNewest,
    KeepOldest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub starting_life: i32,
    pub opening_hand_size: usize,
    pub max_hand_size: usize,
    pub poison_threshold: u32,
    /// The starting player skips the draw on turn one
    pub skip_first_draw: bool,
    pub allow_mulligans: bool,
    pub fizzle_policy: FizzlePolicy,
    pub legend_rule: LegendRulePolicy,
    /// Upper bound on SBA passes per check before the engine gives up
    pub max_sba_iterations: u32,
    /// Check zone uniqueness after every SBA pass
    pub verify_invariants: bool,
    /// Upper bound on attack declarations offered by `query_legal_actions`
    pub max_attack_candidates: usize,
    pub verbosity: VerbosityLevel,
    /// Seed for the game RNG (library shuffles)
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            starting_life: 20,
            opening_hand_size: 7,
            max_hand_size: 7,
            poison_threshold: 10,
            skip_first_draw: true,
            allow_mulligans: true,
            fizzle_policy: FizzlePolicy::Auto,
            legend_rule: LegendRulePolicy::KeepNewest,
            max_sba_iterations: 64,
            verify_invariants: cfg!(debug_assertions),
            max_attack_candidates: 32,
            verbosity: VerbosityLevel::Silent,
            seed: 0,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_starting_life(mut self, life: i32) -> Self {
        self.starting_life = life;
        self
    }

    pub fn with_opening_hand_size(mut self, size: usize) -> Self {
        self.opening_hand_size = size;
        self
    }

    pub fn with_max_hand_size(mut self, size: usize) -> Self {
        self.max_hand_size = size;
        self
    }

    pub fn with_skip_first_draw(mut self, skip: bool) -> Self {
        self.skip_first_draw = skip;
        self
    }

    pub fn with_mulligans(mut self, allow: bool) -> Self {
        self.allow_mulligans = allow;
        self
    }

    pub fn with_fizzle_policy(mut self, policy: FizzlePolicy) -> Self {
        self.fizzle_policy = policy;
        self
    }

    pub fn with_legend_rule(mut self, policy: LegendRulePolicy) -> Self {
        self.legend_rule = policy;
        self
    }

    pub fn with_max_sba_iterations(mut self, iterations: u32) -> Self {
        self.max_sba_iterations = iterations;
        self
    }

    pub fn with_verify_invariants(mut self, verify: bool) -> Self {
        self.verify_invariants = verify;
        self
    }

    pub fn with_verbosity(mut self, verbosity: VerbosityLevel) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.starting_life, 20);
        assert_eq!(config.opening_hand_size, 7);
        assert_eq!(config.max_hand_size, 7);
        assert_eq!(config.poison_threshold, 10);
        assert!(config.skip_first_draw);
        assert_eq!(config.fizzle_policy, FizzlePolicy::Auto);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{ "starting_life": 30, "seed": 9 }"#).unwrap();
        assert_eq!(config.starting_life, 30);
        assert_eq!(config.seed, 9);
        assert_eq!(config.max_hand_size, 7);

        let back = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        similar_asserts::assert_eq!(back, config);
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new()
            .with_seed(42)
            .with_fizzle_policy(FizzlePolicy::AllOrNothing)
            .with_legend_rule(LegendRulePolicy::KeepOldest);
        assert_eq!(config.seed, 42);
        assert_eq!(config.fizzle_policy, FizzlePolicy::AllOrNothing);
        assert_eq!(config.legend_rule, LegendRulePolicy::KeepOldest);
    }
}
