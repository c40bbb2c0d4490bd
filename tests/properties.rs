//! Invariants that must hold along any sequence of legal intents

use mtg_rules::game::{Decision, GameEngine};
use mtg_rules::loader::builtin::BUILTIN_DECKS;
use mtg_rules::loader::GameInitializer;
use mtg_rules::zones::Zone;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

const MAX_DECISIONS: usize = 3000;

/// Total cards in the game, counting every zone
fn card_count(engine: &GameEngine) -> usize {
    let state = engine.state();
    let per_player: usize = state
        .players
        .iter()
        .map(|p| {
            let zones = state.get_player_zones(p.id).unwrap();
            zones.all().iter().map(|z| z.len()).sum::<usize>()
        })
        .sum();
    let on_stack = state
        .stack
        .iter()
        .filter(|item| item.spell_card().is_some())
        .count();
    per_player + state.battlefield.len() + on_stack
}

fn random_walk(deck1: &str, deck2: &str, seed: u64) {
    let mut engine = GameInitializer::builtin()
        .unwrap()
        .two_player_game("Alice", "Bob", deck1, deck2, seed)
        .unwrap();
    engine.start().unwrap();
    let mut rng = ChaCha12Rng::seed_from_u64(seed);

    for _ in 0..MAX_DECISIONS {
        let (player, options) = match engine.decision() {
            Decision::GameOver { .. } => return,
            Decision::WaitingForDecision {
                player, options, ..
            } => (player, options),
        };
        assert!(!options.is_empty(), "decision without options");

        // Another player acting out of turn is always rejected untouched
        let other = engine
            .state()
            .players
            .iter()
            .map(|p| p.id)
            .find(|&p| p != player)
            .unwrap();
        let journal_len = engine.state().journal.len();
        assert!(engine.submit_intent(other, options[0].clone()).is_err());
        assert_eq!(engine.state().journal.len(), journal_len);

        let intent = options[rng.gen_range(0..options.len())].clone();
        let tokens_before = engine
            .state()
            .battlefield
            .iter()
            .filter(|&id| engine.state().cards.get(id).unwrap().is_token)
            .count();
        let cards_before = card_count(&engine) - tokens_before;

        if let Err(err) = engine.submit_intent(player, intent.clone()) {
            panic!("candidate {intent} rejected: {err}");
        }

        let state = engine.state();
        state.verify_zone_uniqueness().unwrap();
        for id in state.battlefield.iter() {
            assert_eq!(state.cards.get(id).unwrap().zone, Zone::Battlefield);
        }
        let tokens_after = state
            .battlefield
            .iter()
            .filter(|&id| state.cards.get(id).unwrap().is_token)
            .count();
        assert_eq!(card_count(&engine) - tokens_after, cards_before);
        for player in &state.players {
            if player.is_alive() {
                assert!(player.life > 0 || state.is_game_over());
            }
        }
    }
}

#[test]
fn random_walks_keep_invariants() {
    for (i, seed) in [3u64, 17, 101].into_iter().enumerate() {
        let deck1 = BUILTIN_DECKS[i % BUILTIN_DECKS.len()];
        let deck2 = BUILTIN_DECKS[(i + 1) % BUILTIN_DECKS.len()];
        random_walk(deck1, deck2, seed);
    }
}

#[test]
fn mirror_matches_keep_invariants() {
    for deck in BUILTIN_DECKS {
        random_walk(deck, deck, 42);
    }
}
