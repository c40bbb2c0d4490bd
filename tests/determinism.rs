//! Same seeds, same game

use mtg_rules::game::{DecisionProvider, GameEngine, GameLoop, GameResult, RandomController};
use mtg_rules::journal::GameAction;
use mtg_rules::loader::GameInitializer;

fn new_game(seed: u64) -> GameEngine {
    GameInitializer::builtin()
        .unwrap()
        .two_player_game("Alice", "Bob", "white_weenie", "dimir_infect", seed)
        .unwrap()
}

fn play_out(engine: &mut GameEngine, seed: u64) -> GameResult {
    let ids: Vec<_> = engine.state().players.iter().map(|p| p.id).collect();
    let mut providers: Vec<Box<dyn DecisionProvider>> = vec![
        Box::new(RandomController::new(ids[0], seed).with_pass_bias(0.25)),
        Box::new(RandomController::new(ids[1], seed + 1).with_pass_bias(0.25)),
    ];
    GameLoop::new(engine)
        .with_max_turns(50)
        .run_game(&mut providers)
        .unwrap()
}

fn journal(engine: &GameEngine) -> Vec<GameAction> {
    engine.state().journal.actions().to_vec()
}

#[test]
fn same_seeds_replay_identically() {
    let mut first = new_game(2024);
    let mut second = new_game(2024);
    let first_result = play_out(&mut first, 9);
    let second_result = play_out(&mut second, 9);

    assert_eq!(first_result, second_result);
    similar_asserts::assert_eq!(journal(&first), journal(&second));
}

#[test]
fn game_seed_changes_the_shuffle() {
    let mut first = new_game(1);
    let mut second = new_game(2);
    first.start().unwrap();
    second.start().unwrap();

    let hand = |engine: &GameEngine| -> Vec<String> {
        let alice = engine.state().players[0].id;
        engine
            .state()
            .hand(alice)
            .iter()
            .map(|&card| engine.state().card_name(card).to_string())
            .collect()
    };
    let libraries = |engine: &GameEngine| -> Vec<String> {
        engine
            .state()
            .players
            .iter()
            .flat_map(|p| {
                engine
                    .state()
                    .get_player_zones(p.id)
                    .unwrap()
                    .library
                    .iter()
                    .map(|card| engine.state().card_name(card).to_string())
                    .collect::<Vec<_>>()
            })
            .collect()
    };
    assert!(hand(&first) != hand(&second) || libraries(&first) != libraries(&second));
}

#[test]
fn serialized_engine_resumes_identically() {
    let mut original = new_game(77);
    original.start().unwrap();

    let json = serde_json::to_string(&original).unwrap();
    let mut restored: GameEngine = serde_json::from_str(&json).unwrap();

    let original_result = play_out(&mut original, 5);
    let restored_result = play_out(&mut restored, 5);
    assert_eq!(original_result, restored_result);
    similar_asserts::assert_eq!(journal(&original), journal(&restored));
}
