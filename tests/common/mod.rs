//! Shared scenario setup for the integration tests
//!
//! A `Table` is a started two-player game where both libraries hold only
//! Islands, so nothing happens unless a test puts it there.

#![allow(dead_code)]

use mtg_rules::core::{CardDefinition, CardId, PlayerId};
use mtg_rules::game::{
    AttackTarget, Decision, DecisionKind, EngineConfig, GameEngine, GameState, Intent, StateDelta,
    Step,
};
use mtg_rules::loader::{CardDataProvider, CardDatabase};
use mtg_rules::zones::Zone;
use mtg_rules::RulesViolation;
use std::sync::Arc;

/// Upper bound on intents a helper submits before giving up
const MAX_STEPS: usize = 500;

pub struct Table {
    pub engine: GameEngine,
    pub db: CardDatabase,
    pub alice: PlayerId,
    pub bob: PlayerId,
}

impl Table {
    /// Alice is on the play and holds priority in her first upkeep
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default().with_seed(7).with_mulligans(false))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let db = CardDatabase::builtin().unwrap();
        let mut game = GameState::new(&["Alice", "Bob"], config);
        let alice = game.players[0].id;
        let bob = game.players[1].id;
        let island = db.get_card("Island").unwrap();
        for player in [alice, bob] {
            for _ in 0..20 {
                game.create_card_in_library(island.clone(), player).unwrap();
            }
        }
        let mut engine = GameEngine::new(game);
        engine.start().unwrap();
        Table {
            engine,
            db,
            alice,
            bob,
        }
    }

    pub fn state(&self) -> &GameState {
        self.engine.state()
    }

    /// Put a card into `owner`'s hand, bypassing the rules
    pub fn to_hand(&mut self, owner: PlayerId, name: &str) -> CardId {
        let definition = self.db.get_card(name).unwrap();
        self.engine
            .state_mut()
            .create_card_in_hand(definition, owner)
            .unwrap()
    }

    /// Like `to_hand`, for a card outside the built-in set
    pub fn custom_to_hand(&mut self, owner: PlayerId, definition: CardDefinition) -> CardId {
        self.engine
            .state_mut()
            .create_card_in_hand(Arc::new(definition), owner)
            .unwrap()
    }

    /// Put a permanent onto the battlefield as if it had been there since
    /// before the game, with no enter triggers left pending
    pub fn onto_battlefield(&mut self, owner: PlayerId, name: &str) -> CardId {
        let card = self.to_hand(owner, name);
        self.settle_on_battlefield(card)
    }

    pub fn custom_onto_battlefield(&mut self, owner: PlayerId, definition: CardDefinition) -> CardId {
        let card = self.custom_to_hand(owner, definition);
        self.settle_on_battlefield(card)
    }

    fn settle_on_battlefield(&mut self, card: CardId) -> CardId {
        let state = self.engine.state_mut();
        state.move_card(card, Zone::Battlefield).unwrap();
        state.cards.get_mut(card).unwrap().turn_entered_battlefield = Some(0);
        state.triggers.take_pending_apnap(&[]);
        card
    }

    pub fn lands(&mut self, owner: PlayerId, name: &str, count: usize) -> Vec<CardId> {
        (0..count).map(|_| self.onto_battlefield(owner, name)).collect()
    }

    pub fn zone(&self, card: CardId) -> Zone {
        self.state().cards.get(card).unwrap().zone
    }

    pub fn life(&self, player: PlayerId) -> i32 {
        self.state().get_player(player).unwrap().life
    }

    /// Who the engine is waiting for, and for what
    pub fn waiting(&self) -> Option<(PlayerId, DecisionKind)> {
        match self.engine.decision() {
            Decision::WaitingForDecision { player, kind, .. } => Some((player, kind)),
            Decision::GameOver { .. } => None,
        }
    }

    pub fn submit(&mut self, player: PlayerId, intent: Intent) -> StateDelta {
        self.engine.submit_intent(player, intent).unwrap()
    }

    pub fn try_submit(&mut self, player: PlayerId, intent: Intent) -> Result<StateDelta, RulesViolation> {
        self.engine.submit_intent(player, intent)
    }

    pub fn cast(&mut self, player: PlayerId, card: CardId, targets: Vec<mtg_rules::game::TargetRef>) {
        self.submit(
            player,
            Intent::CastSpell {
                card,
                targets,
                x: None,
            },
        );
    }

    /// Answer the pending decision with the do-nothing option
    fn default_answer(&mut self) -> bool {
        let Some((player, kind)) = self.waiting() else {
            return false;
        };
        let intent = match kind {
            DecisionKind::Mulligan => Intent::Mulligan { keep: true },
            DecisionKind::Priority => Intent::PassPriority,
            DecisionKind::DeclareAttackers => Intent::DeclareAttackers {
                attackers: Vec::new(),
            },
            DecisionKind::DeclareBlockers => Intent::DeclareBlockers { blocks: Vec::new() },
        };
        self.submit(player, intent);
        true
    }

    /// Pass until someone holds priority in `step` with an empty stack
    pub fn pass_until_step(&mut self, step: Step) {
        for _ in 0..MAX_STEPS {
            if self.state().turn.current_step == step
                && self.state().stack.is_empty()
                && matches!(self.waiting(), Some((_, DecisionKind::Priority)))
            {
                return;
            }
            if !self.default_answer() {
                return;
            }
        }
        panic!("never reached {step}");
    }

    /// Pass until the engine asks for `kind`
    pub fn pass_until_decision(&mut self, kind: DecisionKind) -> PlayerId {
        for _ in 0..MAX_STEPS {
            match self.waiting() {
                Some((player, k)) if k == kind => return player,
                Some(_) => {
                    self.default_answer();
                }
                None => panic!("game ended before a {kind:?} decision"),
            }
        }
        panic!("never asked for {kind:?}");
    }

    /// Pass priority until the stack is empty
    pub fn resolve_stack(&mut self) {
        for _ in 0..MAX_STEPS {
            if self.state().stack.is_empty() || self.engine.is_game_over() {
                return;
            }
            let Some((player, DecisionKind::Priority)) = self.waiting() else {
                panic!("expected a priority decision while resolving");
            };
            self.submit(player, Intent::PassPriority);
        }
        panic!("stack never emptied");
    }

    /// Alice attacks Bob with `attackers`
    pub fn attack(&mut self, attackers: &[CardId]) {
        let player = self.pass_until_decision(DecisionKind::DeclareAttackers);
        let bob = self.bob;
        let declarations = attackers
            .iter()
            .map(|&a| (a, AttackTarget::Player(bob)))
            .collect();
        self.submit(
            player,
            Intent::DeclareAttackers {
                attackers: declarations,
            },
        );
    }

    /// Bob declares (blocker, attacker) pairs
    pub fn try_block(&mut self, blocks: &[(CardId, CardId)]) -> Result<StateDelta, RulesViolation> {
        let player = self.pass_until_decision(DecisionKind::DeclareBlockers);
        self.try_submit(
            player,
            Intent::DeclareBlockers {
                blocks: blocks.to_vec(),
            },
        )
    }

    /// Play out the rest of combat
    pub fn finish_combat(&mut self) {
        for _ in 0..MAX_STEPS {
            if self.engine.is_game_over() {
                return;
            }
            if self.state().turn.current_step == Step::Main2
                && matches!(self.waiting(), Some((_, DecisionKind::Priority)))
            {
                return;
            }
            self.default_answer();
        }
        panic!("combat never finished");
    }
}
