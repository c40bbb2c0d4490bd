//! Self-play harness for the rules engine
//!
//! `play` runs one seeded game and prints its log; `tourney` runs many
//! seeded games in parallel and prints win statistics.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use mtg_rules::{
    game::{
        DecisionProvider, EngineConfig, GameEngine, GameLoop, RandomController, VerbosityLevel,
        ZeroController,
    },
    loader::{builtin, DeckList, DeckLoader, GameInitializer},
    tournament::{self, TournamentConfig},
};
use std::path::Path;

/// Controller type for AI agents
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ControllerType {
    /// Always takes the first candidate
    Zero,
    /// Makes random choices
    Random,
}

impl From<ControllerType> for tournament::ControllerType {
    fn from(kind: ControllerType) -> Self {
        match kind {
            ControllerType::Zero => tournament::ControllerType::Zero,
            ControllerType::Random => tournament::ControllerType::Random,
        }
    }
}

/// Verbosity level for game output (names or numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(VerbosityLevel::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(VerbosityLevel::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(VerbosityLevel::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(VerbosityLevel::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

#[derive(Parser)]
#[command(name = "mtg-rules")]
#[command(about = "MTG rules engine self-play harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one game and print its log
    Play {
        /// Built-in deck name or deck file for player 1
        #[arg(default_value = "red_aggro")]
        deck1: String,

        /// Built-in deck name or deck file for player 2
        #[arg(default_value = "green_stompy")]
        deck2: String,

        #[arg(long, value_enum, default_value = "random")]
        p1: ControllerType,

        #[arg(long, value_enum, default_value = "random")]
        p2: ControllerType,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 100)]
        max_turns: u32,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<std::path::PathBuf>,

        /// Verbosity level (0=silent, 1=minimal, 2=normal, 3=verbose)
        #[arg(long, short = 'v', default_value = "normal")]
        verbosity: VerbosityArg,
    },

    /// Run many games in parallel and collect statistics
    Tourney {
        /// Built-in deck names or deck files (default: all built-in decks)
        decks: Vec<String>,

        #[arg(long, short = 'g', default_value_t = 100)]
        games: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, value_enum, default_value = "random")]
        p1: ControllerType,

        #[arg(long, value_enum, default_value = "random")]
        p2: ControllerType,

        #[arg(long, default_value_t = 100)]
        max_turns: u32,
    },

    /// List the built-in decks and cards
    Cards,
}

/// A deck argument is a built-in deck name or a path to a deck file
fn load_deck(spec: &str) -> anyhow::Result<DeckList> {
    if builtin::BUILTIN_DECKS.contains(&spec) {
        return Ok(builtin::builtin_deck(spec)?);
    }
    let path = Path::new(spec);
    if !path.exists() {
        bail!(
            "unknown deck {spec:?} (built-in decks: {})",
            builtin::BUILTIN_DECKS.join(", ")
        );
    }
    DeckLoader::load_from_file(path).with_context(|| format!("loading deck {spec}"))
}

fn make_provider(kind: ControllerType, player: mtg_rules::core::PlayerId, seed: u64) -> Box<dyn DecisionProvider> {
    match kind {
        ControllerType::Zero => Box::new(ZeroController::new(player)),
        ControllerType::Random => Box::new(RandomController::new(player, seed).with_pass_bias(0.2)),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_play(
    deck1: &str,
    deck2: &str,
    p1: ControllerType,
    p2: ControllerType,
    seed: u64,
    max_turns: u32,
    config: Option<&Path>,
    verbosity: VerbosityLevel,
) -> anyhow::Result<()> {
    let decks = [load_deck(deck1)?, load_deck(deck2)?];
    let base = match config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let config = base.with_seed(seed).with_verbosity(verbosity);

    let init = GameInitializer::builtin()?.with_config(config);
    let game = init.init_game(&[("Player 1", &decks[0]), ("Player 2", &decks[1])])?;
    let mut engine = GameEngine::new(game);
    let ids: Vec<_> = engine.state().players.iter().map(|p| p.id).collect();
    let mut providers = vec![
        make_provider(p1, ids[0], seed.wrapping_add(1)),
        make_provider(p2, ids[1], seed.wrapping_add(2)),
    ];

    let result = GameLoop::new(&mut engine)
        .with_max_turns(max_turns)
        .run_game(&mut providers)?;

    println!("\n{}", engine.query_game_view(ids[0]).summary());
    match result.winner {
        Some(winner) => println!(
            "Winner: {} after {} turns ({:?})",
            engine.state().player_name(winner),
            result.turns_played,
            result.end_reason
        ),
        None => println!("No winner after {} turns ({:?})", result.turns_played, result.end_reason),
    }
    Ok(())
}

fn run_tourney(
    deck_specs: &[String],
    config: TournamentConfig,
) -> anyhow::Result<()> {
    let decks: Vec<(String, DeckList)> = if deck_specs.is_empty() {
        builtin::BUILTIN_DECKS
            .iter()
            .map(|name| Ok((name.to_string(), builtin::builtin_deck(name)?)))
            .collect::<mtg_rules::Result<_>>()?
    } else {
        deck_specs
            .iter()
            .map(|spec| Ok((spec.clone(), load_deck(spec)?)))
            .collect::<anyhow::Result<_>>()?
    };

    println!(
        "Running {} games with {} decks (seed {})",
        config.games,
        decks.len(),
        config.seed
    );
    let init = GameInitializer::builtin()?;
    let report = tournament::run_tourney(&init, &decks, &config)?;
    report.print_summary();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            deck1,
            deck2,
            p1,
            p2,
            seed,
            max_turns,
            config,
            verbosity,
        } => run_play(
            &deck1,
            &deck2,
            p1,
            p2,
            seed,
            max_turns,
            config.as_deref(),
            verbosity.0,
        )?,
        Commands::Tourney {
            decks,
            games,
            seed,
            p1,
            p2,
            max_turns,
        } => run_tourney(
            &decks,
            TournamentConfig {
                games,
                seed,
                p1: p1.into(),
                p2: p2.into(),
                max_turns,
            },
        )?,
        Commands::Cards => {
            println!("Built-in decks: {}", builtin::BUILTIN_DECKS.join(", "));
            let db = mtg_rules::loader::CardDatabase::builtin()?;
            for name in db.names() {
                println!("  {name}");
            }
        }
    }

    Ok(())
}
