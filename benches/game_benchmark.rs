//! Performance benchmarks for the rules engine
//!
//! Two iteration modes, both random vs random with built-in decks:
//!
//! 1. **Fresh** - build a new game from decks for each iteration
//! 2. **Clone** - clone a prepared engine and play it out
//!
//! Journaling is left on so the numbers include delta bookkeeping.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mtg_rules::{
    game::{DecisionProvider, GameEngine, GameLoop, RandomController, VerbosityLevel},
    loader::GameInitializer,
    Result,
};
use std::time::Duration;

fn play_out(mut engine: GameEngine, seed: u64) -> Result<(u32, usize)> {
    let ids: Vec<_> = engine.state().players.iter().map(|p| p.id).collect();
    let mut providers: Vec<Box<dyn DecisionProvider>> = vec![
        Box::new(RandomController::new(ids[0], seed).with_pass_bias(0.2)),
        Box::new(RandomController::new(ids[1], seed.wrapping_add(1)).with_pass_bias(0.2)),
    ];
    let result = GameLoop::new(&mut engine)
        .with_max_turns(100)
        .with_verbosity(VerbosityLevel::Silent)
        .run_game(&mut providers)?;
    Ok((result.turns_played, engine.state().journal.len()))
}

fn bench_game_fresh(c: &mut Criterion) {
    let init = GameInitializer::builtin().expect("built-in card set");

    let mut group = c.benchmark_group("game_execution");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    // Report per-game metrics once, outside the measurement
    for seed in [42u64, 7] {
        let engine = init
            .two_player_game("P1", "P2", "red_aggro", "green_stompy", seed)
            .expect("game setup");
        if let Ok((turns, actions)) = play_out(engine, seed) {
            println!("seed {seed}: {turns} turns, {actions} journaled actions");
        }
    }

    for seed in [42u64, 7] {
        group.bench_with_input(BenchmarkId::new("fresh", seed), &seed, |b, &seed| {
            b.iter(|| {
                let engine = init
                    .two_player_game("P1", "P2", "red_aggro", "green_stompy", seed)
                    .expect("game setup");
                black_box(play_out(engine, seed).expect("game runs"))
            });
        });
    }
    group.finish();
}

fn bench_game_clone(c: &mut Criterion) {
    let init = GameInitializer::builtin().expect("built-in card set");
    let prepared = init
        .two_player_game("P1", "P2", "white_weenie", "dimir_infect", 42)
        .expect("game setup");

    let mut group = c.benchmark_group("game_execution");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));
    group.bench_function(BenchmarkId::new("clone", 42), |b| {
        b.iter(|| black_box(play_out(prepared.clone(), 42).expect("game runs")));
    });
    group.finish();
}

criterion_group!(benches, bench_game_fresh, bench_game_clone);
criterion_main!(benches);
