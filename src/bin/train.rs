//! Trains the evolving table by playing repeated games.
//!
//! ```bash
//! cargo run --release --features cli --bin train -- --games 2000
//! cargo run --release --features cli --bin train -- --opponent search --depth 2 --games 500
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reversi::session::{Player, Session, play_game};
use reversi::{AnyAgent, EngineConfig, EvolvingAgent, SearchAgent, Side};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Opponent {
    /// The evolving agent plays both colours and learns once per game
    #[value(name = "self")]
    SelfPlay,
    /// Alpha-beta searcher; the evolving agent alternates colours
    Search,
}

/// Evolving evaluator trainer
#[derive(Parser, Debug)]
#[command(name = "train")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON engine config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Table file (overrides the config)
    #[arg(short, long)]
    data_file: Option<PathBuf>,

    /// Number of games to play
    #[arg(short, long, default_value = "1000")]
    games: u64,

    #[arg(long, value_enum, default_value = "self")]
    opponent: Opponent,

    /// Search depth of the opponent (overrides the config)
    #[arg(long)]
    depth: Option<u32>,

    #[arg(long)]
    learning_rate: Option<f32>,

    #[arg(long)]
    generalization: Option<f32>,

    #[arg(long)]
    seed: Option<u64>,

    /// Back up the table file and start from a neutral table
    #[arg(long)]
    reset: bool,
}

#[derive(Default)]
struct Tally {
    evolving: u64,
    opponent: u64,
    draws: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(path) = cli.data_file {
        config.evolving.data_file = path;
    }
    if let Some(depth) = cli.depth {
        config.search.depth = depth;
    }
    if let Some(rate) = cli.learning_rate {
        config.evolving.learning_rate = rate;
    }
    if let Some(g) = cli.generalization {
        config.evolving.generalization = g;
    }
    if cli.seed.is_some() {
        config.evolving.seed = cli.seed;
    }

    let e = &config.evolving;
    let mut agent = EvolvingAgent::open(&e.data_file, e.learning_rate, e.generalization, e.seed)?;
    if cli.reset {
        agent.reset_table()?;
    }
    info!(
        data_file = %e.data_file.display(),
        learning_rate = agent.evaluator().learning_rate(),
        generalization = agent.evaluator().generalization(),
        opponent = ?cli.opponent,
        games = cli.games,
        "training"
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let pb = ProgressBar::new(cli.games);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let mut tally = Tally::default();
    match cli.opponent {
        Opponent::SelfPlay => {
            let mut session = Session::new(AnyAgent::from(agent));
            session.set_ai(Player::One, true);
            session.set_ai(Player::Two, true);
            for _ in 0..cli.games {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                session.run_ai()?;
                match session.state().winner() {
                    Side::None => tally.draws += 1,
                    // Player 1 and 2 are the same agent; count black wins as "evolving".
                    Side::Black => tally.evolving += 1,
                    Side::White => tally.opponent += 1,
                }
                session.replay();
                pb.inc(1);
                pb.set_message(format!(
                    "B {} / W {} / D {}",
                    tally.evolving, tally.opponent, tally.draws
                ));
            }
        }
        Opponent::Search => {
            let mut opponent = SearchAgent::new(config.search.depth);
            for game in 0..cli.games {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let evolving_side = if game % 2 == 0 { Side::Black } else { Side::White };
                let finished = if evolving_side == Side::Black {
                    play_game(&mut agent, &mut opponent)?
                } else {
                    play_game(&mut opponent, &mut agent)?
                };
                match finished.winner() {
                    Side::None => tally.draws += 1,
                    w if w == evolving_side => tally.evolving += 1,
                    _ => tally.opponent += 1,
                }
                pb.inc(1);
                pb.set_message(format!(
                    "won {} / lost {} / drawn {}",
                    tally.evolving, tally.opponent, tally.draws
                ));
            }
        }
    }
    pb.finish();

    if !running.load(Ordering::SeqCst) {
        warn!("interrupted; the table holds every finished game");
    }
    info!(
        evolving = tally.evolving,
        opponent = tally.opponent,
        draws = tally.draws,
        "training finished"
    );
    Ok(())
}
