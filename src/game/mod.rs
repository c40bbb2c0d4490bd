//! Game engine, state and turn structure

pub mod actions;
pub mod combat;
pub mod config;
pub mod controller;
pub mod engine;
pub mod game_loop;
pub mod intent;
pub mod logger;
pub mod mana_payment;
pub mod phase;
pub mod priority;
pub mod random_controller;
pub mod snapshot;
pub mod stack;
pub mod state;
pub mod state_based;
pub mod targeting;
pub mod triggers;
pub mod zero_controller;

pub use actions::{DamageSource, ResolutionContext};
pub use combat::{AttackTarget, CombatPhase, CombatState};
pub use config::{EngineConfig, FizzlePolicy, LegendRulePolicy};
pub use controller::DecisionProvider;
pub use engine::GameEngine;
pub use game_loop::{GameEndReason, GameLoop, GameResult};
pub use intent::{Decision, DecisionKind, Intent, StateDelta};
pub use logger::{GameLogger, LogCategory, LogEntry, OutputFormat, OutputMode, VerbosityLevel};
pub use mana_payment::{ManaSource, TapPlan};
pub use phase::{Phase, Step, TurnStructure};
pub use priority::{PassOutcome, PrioritySystem};
pub use random_controller::RandomController;
pub use snapshot::{CardView, PermanentView, PlayerView, StackItemView, StateSnapshot};
pub use stack::{Stack, StackItem, StackItemKind};
pub use state::GameState;
pub use state_based::StateBasedAction;
pub use targeting::{FizzleOutcome, TargetRef};
pub use triggers::{PendingTrigger, TriggerEvent, TriggerManager};
pub use zero_controller::ZeroController;
