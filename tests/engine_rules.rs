//! Stack, priority, costs and state-based actions through the public
//! command boundary

mod common;

use common::Table;
use mtg_rules::core::{Color, CounterType, ManaCost};
use mtg_rules::game::{DecisionKind, EngineConfig, Intent, Step, TargetRef};
use mtg_rules::journal::GameAction;
use mtg_rules::loader::CardDataProvider;
use mtg_rules::zones::Zone;
use mtg_rules::{ReasonCode, RulesViolation};

#[test]
fn lightning_bolt_to_the_face() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    t.lands(alice, "Mountain", 1);
    let bolt = t.to_hand(alice, "Lightning Bolt");
    t.pass_until_step(Step::Main1);

    t.cast(alice, bolt, vec![TargetRef::Player(bob)]);
    assert_eq!(t.zone(bolt), Zone::Stack);
    assert_eq!(t.state().stack.len(), 1);
    // The caster keeps priority
    assert_eq!(t.waiting(), Some((alice, DecisionKind::Priority)));

    t.resolve_stack();
    assert_eq!(t.life(bob), 17);
    assert_eq!(t.zone(bolt), Zone::Graveyard);
    assert_eq!(t.state().turn.current_step, Step::Main1);
}

#[test]
fn counterspell_stops_the_bolt() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    t.lands(alice, "Mountain", 1);
    t.lands(bob, "Island", 2);
    let bolt = t.to_hand(alice, "Lightning Bolt");
    let counter = t.to_hand(bob, "Counterspell");
    t.pass_until_step(Step::Main1);

    t.cast(alice, bolt, vec![TargetRef::Player(bob)]);
    t.submit(alice, Intent::PassPriority);
    assert_eq!(t.waiting(), Some((bob, DecisionKind::Priority)));

    let bolt_item = t.state().stack.peek().unwrap().id;
    t.cast(bob, counter, vec![TargetRef::Spell(bolt_item)]);
    t.resolve_stack();

    assert_eq!(t.life(bob), 20);
    assert_eq!(t.zone(bolt), Zone::Graveyard);
    assert_eq!(t.zone(counter), Zone::Graveyard);
}

#[test]
fn spell_fizzles_when_its_only_target_dies() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    t.lands(alice, "Mountain", 2);
    let bears = t.onto_battlefield(bob, "Grizzly Bears");
    let shock = t.to_hand(alice, "Shock");
    let bolt = t.to_hand(alice, "Lightning Bolt");
    t.pass_until_step(Step::Main1);

    t.cast(alice, shock, vec![TargetRef::Permanent(bears)]);
    t.cast(alice, bolt, vec![TargetRef::Permanent(bears)]);
    assert_eq!(t.state().stack.len(), 2);

    t.resolve_stack();
    assert_eq!(t.zone(bears), Zone::Graveyard);
    assert_eq!(t.zone(shock), Zone::Graveyard);
    assert!(t
        .state()
        .journal
        .actions()
        .iter()
        .any(|a| matches!(a, GameAction::Fizzle { .. })));
}

#[test]
fn rejected_intents_change_nothing() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    t.lands(alice, "Mountain", 1);
    let fireball = t.to_hand(alice, "Fireball");
    let lava_axe = t.to_hand(alice, "Lava Axe");

    let before = serde_json::to_string(t.state()).unwrap();
    let journal_len = t.state().journal.len();

    // Upkeep: Alice holds priority
    let err = t.try_submit(bob, Intent::PassPriority).unwrap_err();
    assert_eq!(err, RulesViolation::IllegalIntent(ReasonCode::NotPriorityHolder));

    let err = t
        .try_submit(
            alice,
            Intent::CastSpell {
                card: fireball,
                targets: vec![TargetRef::Player(bob)],
                x: Some(0),
            },
        )
        .unwrap_err();
    assert_eq!(err, RulesViolation::IllegalIntent(ReasonCode::NotSorcerySpeed));

    let err = t
        .try_submit(alice, Intent::DeclareAttackers { attackers: Vec::new() })
        .unwrap_err();
    assert_eq!(err, RulesViolation::IllegalIntent(ReasonCode::WrongDecisionKind));

    assert_eq!(serde_json::to_string(t.state()).unwrap(), before);
    assert_eq!(t.state().journal.len(), journal_len);

    t.pass_until_step(Step::Main1);
    let before = serde_json::to_string(t.state()).unwrap();

    let err = t
        .try_submit(
            alice,
            Intent::CastSpell {
                card: fireball,
                targets: vec![TargetRef::Player(bob)],
                x: None,
            },
        )
        .unwrap_err();
    assert_eq!(err, RulesViolation::IllegalIntent(ReasonCode::UnboundX));

    let err = t
        .try_submit(
            alice,
            Intent::CastSpell {
                card: lava_axe,
                targets: vec![TargetRef::Player(bob)],
                x: None,
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        RulesViolation::InsufficientResources(ReasonCode::InsufficientMana)
    );

    let err = t
        .try_submit(
            alice,
            Intent::CastSpell {
                card: lava_axe,
                targets: Vec::new(),
                x: None,
            },
        )
        .unwrap_err();
    assert_eq!(err, RulesViolation::InvalidTarget(ReasonCode::WrongTargetCount));

    assert_eq!(serde_json::to_string(t.state()).unwrap(), before);
}

#[test]
fn fireball_with_x() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    t.lands(alice, "Mountain", 4);
    let fireball = t.to_hand(alice, "Fireball");
    t.pass_until_step(Step::Main1);

    // The largest affordable X is offered
    let options = t.engine.query_legal_actions(alice);
    assert!(options.contains(&Intent::CastSpell {
        card: fireball,
        targets: vec![TargetRef::Player(bob)],
        x: Some(3),
    }));

    let err = t
        .try_submit(
            alice,
            Intent::CastSpell {
                card: fireball,
                targets: vec![TargetRef::Player(bob)],
                x: Some(4),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        RulesViolation::InsufficientResources(ReasonCode::InsufficientMana)
    );

    t.submit(
        alice,
        Intent::CastSpell {
            card: fireball,
            targets: vec![TargetRef::Player(bob)],
            x: Some(3),
        },
    );
    t.resolve_stack();
    assert_eq!(t.life(bob), 17);
}

#[test]
fn oversized_x_is_rejected_without_mutation() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    t.lands(alice, "Mountain", 3);
    let mut twin = (*t.db.get_card("Fireball").unwrap()).clone();
    twin.name = "Twin Fireball".into();
    twin.mana_cost = ManaCost::parse("XXR").unwrap();
    let card = t.custom_to_hand(alice, twin);
    t.pass_until_step(Step::Main1);

    let before = serde_json::to_string(t.state()).unwrap();
    let journal_len = t.state().journal.len();
    for x in [u32::MAX / 2 + 1, u32::MAX] {
        let err = t
            .try_submit(
                alice,
                Intent::CastSpell {
                    card,
                    targets: vec![TargetRef::Player(bob)],
                    x: Some(x),
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            RulesViolation::InsufficientResources(ReasonCode::InsufficientMana)
        );
    }
    assert_eq!(serde_json::to_string(t.state()).unwrap(), before);
    assert_eq!(t.state().journal.len(), journal_len);

    // Each X is paid twice: X=1 costs {2}{R}
    t.submit(
        alice,
        Intent::CastSpell {
            card,
            targets: vec![TargetRef::Player(bob)],
            x: Some(1),
        },
    );
    t.resolve_stack();
    assert_eq!(t.life(bob), 19);
}

#[test]
fn stack_resolves_last_in_first_out() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    t.lands(alice, "Mountain", 3);
    let bolts: Vec<_> = (0..3).map(|_| t.to_hand(alice, "Lightning Bolt")).collect();
    t.pass_until_step(Step::Main1);

    let mut pushed = Vec::new();
    for &bolt in &bolts {
        t.cast(alice, bolt, vec![TargetRef::Player(bob)]);
        pushed.push(t.state().stack.peek().unwrap().id);
    }
    assert_eq!(t.state().stack.len(), 3);

    let mark = t.state().journal.mark();
    t.resolve_stack();
    let resolved: Vec<_> = t
        .state()
        .journal
        .since(mark)
        .iter()
        .filter_map(|a| match a {
            GameAction::ResolveStack { item } => Some(*item),
            _ => None,
        })
        .collect();
    pushed.reverse();
    assert_eq!(resolved, pushed);
    assert_eq!(t.life(bob), 11);
}

#[test]
fn full_round_of_passes_advances_exactly_one_step() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);

    for next in [Step::Draw, Step::Main1] {
        let from = t.state().turn.current_step;
        let mark = t.state().journal.mark();

        t.submit(alice, Intent::PassPriority);
        assert_eq!(t.state().turn.current_step, from);
        assert_eq!(t.waiting(), Some((bob, DecisionKind::Priority)));

        t.submit(bob, Intent::PassPriority);
        assert_eq!(t.state().turn.current_step, next);
        assert_eq!(t.waiting(), Some((alice, DecisionKind::Priority)));
        let advances = t
            .state()
            .journal
            .since(mark)
            .iter()
            .filter(|a| matches!(a, GameAction::AdvanceStep { .. }))
            .count();
        assert_eq!(advances, 1);
    }
}

#[test]
fn mana_pools_are_empty_entering_cleanup() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    t.pass_until_step(Step::End);
    {
        let state = t.engine.state_mut();
        state.add_mana(alice, Color::Red, 3).unwrap();
        state.add_mana(bob, Color::Blue, 1).unwrap();
    }
    let mark = t.state().journal.mark();

    t.submit(alice, Intent::PassPriority);
    t.submit(bob, Intent::PassPriority);
    assert_eq!(t.state().turn.active_player, bob);

    let actions = t.state().journal.since(mark);
    let emptied = actions
        .iter()
        .position(|a| matches!(a, GameAction::EmptyManaPools))
        .unwrap();
    let cleanup = actions
        .iter()
        .position(|a| {
            matches!(
                a,
                GameAction::AdvanceStep {
                    to_step: Step::Cleanup,
                    ..
                }
            )
        })
        .unwrap();
    assert!(emptied < cleanup);
    assert!(!actions[emptied..cleanup]
        .iter()
        .any(|a| matches!(a, GameAction::AddMana { .. })));
    for player in [alice, bob] {
        assert!(t.state().get_player(player).unwrap().mana_pool.is_empty());
    }
}

#[test]
fn phyrexian_mana_paid_with_life() {
    let mut t = Table::new();
    let alice = t.alice;
    let bears = t.onto_battlefield(alice, "Grizzly Bears");
    let growth = t.to_hand(alice, "Mutagenic Growth");
    t.pass_until_step(Step::Main1);

    t.cast(alice, growth, vec![TargetRef::Permanent(bears)]);
    assert_eq!(t.life(alice), 18);
    t.resolve_stack();
    assert_eq!(t.state().effective_power(bears), 4);
    assert_eq!(t.state().effective_toughness(bears), 4);
}

#[test]
fn hybrid_mana_from_either_color() {
    let mut t = Table::new();
    let alice = t.alice;
    let plains = t.lands(alice, "Plains", 1)[0];
    let recruit = t.to_hand(alice, "Boros Recruit");
    t.pass_until_step(Step::Main1);

    t.cast(alice, recruit, Vec::new());
    assert!(t.state().cards.get(plains).unwrap().tapped);
    t.resolve_stack();
    assert_eq!(t.zone(recruit), Zone::Battlefield);
}

#[test]
fn legend_rule_keeps_the_newest() {
    let mut t = Table::new();
    let alice = t.alice;
    let first = t.onto_battlefield(alice, "Isamaru, Hound of Konda");
    let second = t.onto_battlefield(alice, "Isamaru, Hound of Konda");

    // State-based actions run after the next intent
    t.submit(alice, Intent::PassPriority);
    assert_eq!(t.zone(first), Zone::Graveyard);
    assert_eq!(t.zone(second), Zone::Battlefield);
}

#[test]
fn legend_rule_can_keep_the_oldest() {
    let config = EngineConfig::default()
        .with_mulligans(false)
        .with_legend_rule(mtg_rules::game::LegendRulePolicy::KeepOldest);
    let mut t = Table::with_config(config);
    let alice = t.alice;
    let first = t.onto_battlefield(alice, "Isamaru, Hound of Konda");
    let second = t.onto_battlefield(alice, "Isamaru, Hound of Konda");

    t.submit(alice, Intent::PassPriority);
    assert_eq!(t.zone(first), Zone::Battlefield);
    assert_eq!(t.zone(second), Zone::Graveyard);
}

#[test]
fn planeswalker_loyalty() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    let chandra = t.onto_battlefield(alice, "Chandra Nalaar");
    let bears = t.onto_battlefield(bob, "Grizzly Bears");
    t.lands(alice, "Mountain", 1);
    let bolt = t.to_hand(alice, "Lightning Bolt");
    assert_eq!(
        t.state().cards.get(chandra).unwrap().get_counter(&CounterType::Loyalty),
        6
    );
    t.pass_until_step(Step::Main1);

    t.submit(
        alice,
        Intent::ActivateAbility {
            card: chandra,
            ability: 1,
            targets: vec![TargetRef::Permanent(bears)],
        },
    );
    assert_eq!(t.state().cards.get(chandra).unwrap().loyalty(), 3);

    let err = t
        .try_submit(
            alice,
            Intent::ActivateAbility {
                card: chandra,
                ability: 0,
                targets: vec![TargetRef::Player(bob)],
            },
        )
        .unwrap_err();
    assert_eq!(err, RulesViolation::IllegalIntent(ReasonCode::NotSorcerySpeed));

    t.resolve_stack();
    assert_eq!(t.zone(bears), Zone::Graveyard);

    let err = t
        .try_submit(
            alice,
            Intent::ActivateAbility {
                card: chandra,
                ability: 0,
                targets: vec![TargetRef::Player(bob)],
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        RulesViolation::IllegalIntent(ReasonCode::LoyaltyAbilityUsed)
    );

    // Damage removes loyalty; at zero the planeswalker dies
    t.cast(alice, bolt, vec![TargetRef::Permanent(chandra)]);
    t.resolve_stack();
    assert_eq!(t.zone(chandra), Zone::Graveyard);
}

#[test]
fn simultaneous_triggers_stack_in_apnap_order() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    t.onto_battlefield(alice, "Soul Warden");
    t.onto_battlefield(bob, "Soul Warden");
    t.lands(alice, "Forest", 2);
    let bears = t.to_hand(alice, "Grizzly Bears");
    t.pass_until_step(Step::Main1);

    t.cast(alice, bears, Vec::new());
    t.submit(alice, Intent::PassPriority);
    t.submit(bob, Intent::PassPriority);

    assert_eq!(t.zone(bears), Zone::Battlefield);
    let stack = &t.state().stack;
    assert_eq!(stack.len(), 2);
    // Active player's trigger goes on first, so the opponent's resolves first
    assert_eq!(stack.peek().unwrap().controller, bob);
    assert_eq!(t.waiting(), Some((alice, DecisionKind::Priority)));

    t.resolve_stack();
    assert_eq!(t.life(alice), 21);
    assert_eq!(t.life(bob), 21);
}

#[test]
fn upkeep_trigger_draws_and_drains() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    t.onto_battlefield(bob, "Phyrexian Arena");
    let hand_before = t.state().hand(bob).len();

    // Play through to Bob's upkeep
    for _ in 0..100 {
        if t.state().turn.active_player == bob && !t.state().stack.is_empty() {
            break;
        }
        t.submit(t.waiting().unwrap().0, Intent::PassPriority);
    }
    assert_eq!(t.state().turn.current_step, Step::Upkeep);
    t.resolve_stack();
    assert_eq!(t.life(bob), 19);
    assert_eq!(t.state().hand(bob).len(), hand_before + 1);
    assert_eq!(t.life(alice), 20);
}

#[test]
fn mulligans_in_turn_order() {
    let mut t = Table::with_config(EngineConfig::default().with_seed(3));
    let (alice, bob) = (t.alice, t.bob);
    assert_eq!(t.waiting(), Some((alice, DecisionKind::Mulligan)));

    t.submit(alice, Intent::Mulligan { keep: false });
    assert_eq!(t.state().hand(alice).len(), 6);
    assert_eq!(t.state().library_size(alice), 14);
    assert_eq!(t.waiting(), Some((alice, DecisionKind::Mulligan)));

    t.submit(alice, Intent::Mulligan { keep: true });
    assert_eq!(t.waiting(), Some((bob, DecisionKind::Mulligan)));
    t.submit(bob, Intent::Mulligan { keep: true });

    assert_eq!(t.waiting(), Some((alice, DecisionKind::Priority)));
    assert_eq!(t.state().turn.current_step, Step::Upkeep);
    assert_eq!(t.state().get_player(alice).unwrap().mulligans_taken, 1);
}

#[test]
fn game_view_hides_the_opponents_hand() {
    let t = Table::new();
    let view = t.engine.query_game_view(t.alice);
    assert_eq!(view.my_hand().len(), 7);
    let bob = view.player(t.bob).unwrap();
    assert!(bob.hand.is_none());
    assert_eq!(bob.hand_size, 7);
    assert_eq!(bob.library_size, 13);

    // Only the player with the decision gets candidates
    assert!(t.engine.query_legal_actions(t.bob).is_empty());
    assert_eq!(
        t.engine.query_legal_actions(t.alice),
        vec![Intent::PassPriority]
    );
}

#[test]
fn drawing_from_an_empty_library_loses() {
    let mut t = Table::new();
    let (alice, bob) = (t.alice, t.bob);
    let library: Vec<_> = t
        .state()
        .get_player_zones(bob)
        .unwrap()
        .library
        .iter()
        .collect();
    for card in library {
        t.engine.state_mut().move_card(card, Zone::Exile).unwrap();
    }

    for _ in 0..100 {
        if t.engine.is_game_over() {
            break;
        }
        t.submit(t.waiting().unwrap().0, Intent::PassPriority);
    }
    assert!(t.engine.is_game_over());
    assert_eq!(t.engine.winner(), Some(alice));
    let err = t.try_submit(alice, Intent::PassPriority).unwrap_err();
    assert_eq!(err, RulesViolation::IllegalIntent(ReasonCode::GameOver));
}
