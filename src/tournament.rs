//! Tournament mode: many seeded self-play games in parallel
//!
//! Each game is independent and single-threaded; rayon spreads games over
//! cores. Every game's decks and seeds derive from the tournament seed and
//! the game index, so a tournament replays identically regardless of
//! thread scheduling.

use crate::game::{
    DecisionProvider, GameEndReason, GameLoop, RandomController, VerbosityLevel, ZeroController,
};
use crate::loader::{DeckList, GameInitializer};
use crate::{MtgError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};

/// Decision provider used for every seat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerType {
    Zero,
    Random,
}

#[derive(Debug, Clone)]
pub struct TournamentConfig {
    pub games: usize,
    pub seed: u64,
    pub p1: ControllerType,
    pub p2: ControllerType,
    pub max_turns: u32,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        TournamentConfig {
            games: 100,
            seed: 0,
            p1: ControllerType::Random,
            p2: ControllerType::Random,
            max_turns: 100,
        }
    }
}

/// Outcome of one tournament game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub index: usize,
    pub deck1: usize,
    pub deck2: usize,
    /// 0 or 1 for the winning seat
    pub winner_seat: Option<usize>,
    pub turns: u32,
    pub end_reason: GameEndReason,
}

/// Aggregated tournament statistics
#[derive(Debug, Clone, Default)]
pub struct TournamentReport {
    pub games: Vec<GameRecord>,
    pub p1_wins: usize,
    pub p2_wins: usize,
    pub draws: usize,
    /// Deck name -> (games, wins)
    pub deck_results: FxHashMap<String, (usize, usize)>,
    pub errors: usize,
    pub elapsed: Duration,
}

impl TournamentReport {
    pub fn average_turns(&self) -> f64 {
        if self.games.is_empty() {
            return 0.0;
        }
        self.games.iter().map(|g| g.turns as f64).sum::<f64>() / self.games.len() as f64
    }

    pub fn print_summary(&self) {
        let total = self.games.len();
        println!("=== Tournament Results ===");
        println!(
            "Games: {total} ({} errors) in {:.2}s",
            self.errors,
            self.elapsed.as_secs_f64()
        );
        if total == 0 {
            return;
        }
        let pct = |n: usize| 100.0 * n as f64 / total as f64;
        println!("P1 wins: {} ({:.1}%)", self.p1_wins, pct(self.p1_wins));
        println!("P2 wins: {} ({:.1}%)", self.p2_wins, pct(self.p2_wins));
        println!("Draws:   {} ({:.1}%)", self.draws, pct(self.draws));
        println!("Average turns: {:.1}", self.average_turns());

        let mut decks: Vec<_> = self.deck_results.iter().collect();
        decks.sort_by(|a, b| a.0.cmp(b.0));
        println!("\nDeck             Games   Wins   Win%");
        for (name, (games, wins)) in decks {
            let rate = if *games > 0 {
                100.0 * *wins as f64 / *games as f64
            } else {
                0.0
            };
            println!("{name:<16} {games:>5} {wins:>6} {rate:>6.1}");
        }
    }
}

fn provider(kind: ControllerType, player: crate::core::PlayerId, seed: u64) -> Box<dyn DecisionProvider> {
    match kind {
        ControllerType::Zero => Box::new(ZeroController::new(player)),
        ControllerType::Random => Box::new(RandomController::new(player, seed).with_pass_bias(0.2)),
    }
}

fn game_seed(tournament_seed: u64, index: usize) -> u64 {
    tournament_seed.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn play_one(
    init: &GameInitializer,
    decks: &[(String, DeckList)],
    config: &TournamentConfig,
    index: usize,
) -> Result<GameRecord> {
    let seed = game_seed(config.seed, index);
    let mut deck_rng = ChaCha12Rng::seed_from_u64(seed);
    let deck1 = deck_rng.gen_range(0..decks.len());
    let deck2 = deck_rng.gen_range(0..decks.len());

    let game = init.init_game(&[("Player 1", &decks[deck1].1), ("Player 2", &decks[deck2].1)])?;
    let mut engine = crate::game::GameEngine::new(game);
    engine.state_mut().seed_rng(seed);
    let ids: Vec<_> = engine.state().players.iter().map(|p| p.id).collect();
    let mut providers = vec![
        provider(config.p1, ids[0], seed.wrapping_add(0x1234_5678_9ABC_DEF0)),
        provider(config.p2, ids[1], seed.wrapping_add(0xFEDC_BA98_7654_3210)),
    ];

    let result = GameLoop::new(&mut engine)
        .with_max_turns(config.max_turns)
        .with_verbosity(VerbosityLevel::Silent)
        .run_game(&mut providers)?;

    Ok(GameRecord {
        index,
        deck1,
        deck2,
        winner_seat: result.winner.and_then(|w| ids.iter().position(|&id| id == w)),
        turns: result.turns_played,
        end_reason: result.end_reason,
    })
}

/// Play `config.games` games between randomly paired decks
pub fn run_tourney(
    init: &GameInitializer,
    decks: &[(String, DeckList)],
    config: &TournamentConfig,
) -> Result<TournamentReport> {
    if decks.is_empty() {
        return Err(MtgError::InvalidAction(
            "a tournament needs at least one deck".to_string(),
        ));
    }
    let start = Instant::now();

    let outcomes: Vec<Result<GameRecord>> = (0..config.games)
        .into_par_iter()
        .map(|index| play_one(init, decks, config, index))
        .collect();

    let mut report = TournamentReport::default();
    for outcome in outcomes {
        let record = match outcome {
            Ok(record) => record,
            Err(_) => {
                report.errors += 1;
                continue;
            }
        };
        match record.winner_seat {
            Some(0) => report.p1_wins += 1,
            Some(_) => report.p2_wins += 1,
            None => report.draws += 1,
        }
        for (seat, deck) in [record.deck1, record.deck2].into_iter().enumerate() {
            let entry = report
                .deck_results
                .entry(decks[deck].0.clone())
                .or_insert((0, 0));
            entry.0 += 1;
            if record.winner_seat == Some(seat) {
                entry.1 += 1;
            }
        }
        report.games.push(record);
    }
    report.elapsed = start.elapsed();
    Ok(report)
}
