//! Plays a match between two agents and prints the result as JSON.
//!
//! ```bash
//! cargo run --release --features cli --bin arena -- --first evolving --second search:3 --games 100
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reversi::session::play_game;
use reversi::{AnyAgent, EngineConfig, EvolvingAgent, SearchAgent, Side};

/// `search:<depth>` or `evolving`.
#[derive(Clone, Debug, PartialEq, Eq)]
enum AgentSpec {
    Search(u32),
    Evolving,
}

impl FromStr for AgentSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "evolving" => Ok(AgentSpec::Evolving),
            None if s == "search" => Ok(AgentSpec::Search(reversi::search::DEFAULT_DEPTH)),
            Some(("search", depth)) => depth
                .parse()
                .map(AgentSpec::Search)
                .map_err(|e| format!("bad depth {depth:?}: {e}")),
            _ => Err(format!("unknown agent {s:?}, expected search[:depth] or evolving")),
        }
    }
}

/// Agent-vs-agent match runner
#[derive(Parser, Debug)]
#[command(name = "arena")]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = "evolving")]
    first: AgentSpec,

    #[arg(long, default_value = "search:3")]
    second: AgentSpec,

    /// Games to play; colours alternate every game
    #[arg(short, long, default_value = "100")]
    games: u64,

    /// JSON engine config used for the evolving agent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep learning during the match (off by default)
    #[arg(long)]
    learn: bool,
}

#[derive(Debug, Default, Serialize)]
struct MatchReport {
    first: String,
    second: String,
    games: u64,
    first_wins: u64,
    second_wins: u64,
    draws: u64,
    first_disks: u64,
    second_disks: u64,
}

/// Every learning evaluator saves to `evolving.data_file`, so at most one seat may
/// learn into it.
fn check_seats(cli: &Cli) -> Result<(), String> {
    if cli.learn && cli.first == AgentSpec::Evolving && cli.second == AgentSpec::Evolving {
        return Err(
            "--learn with two evolving seats would have both save over the same table file"
                .to_string(),
        );
    }
    Ok(())
}

fn build(
    spec: &AgentSpec,
    config: &EngineConfig,
    learn: bool,
) -> Result<AnyAgent, Box<dyn std::error::Error>> {
    Ok(match spec {
        AgentSpec::Search(depth) => AnyAgent::from(SearchAgent::new(*depth)),
        AgentSpec::Evolving => {
            let e = &config.evolving;
            let rate = if learn { e.learning_rate } else { 0.0 };
            AnyAgent::from(EvolvingAgent::open(&e.data_file, rate, e.generalization, e.seed)?)
        }
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    if let Err(message) = check_seats(&cli) {
        Cli::command().error(ErrorKind::ArgumentConflict, message).exit();
    }
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut first = build(&cli.first, &config, cli.learn)?;
    let mut second = build(&cli.second, &config, cli.learn)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let pb = ProgressBar::new(cli.games);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let mut report = MatchReport {
        first: format!("{:?}", cli.first),
        second: format!("{:?}", cli.second),
        ..MatchReport::default()
    };

    for game in 0..cli.games {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let first_side = if game % 2 == 0 { Side::Black } else { Side::White };
        let finished = if first_side == Side::Black {
            play_game(&mut first, &mut second)?
        } else {
            play_game(&mut second, &mut first)?
        };

        report.games += 1;
        report.first_disks += finished.disk_count(first_side) as u64;
        report.second_disks += finished.disk_count(first_side.opponent()) as u64;
        match finished.winner() {
            Side::None => report.draws += 1,
            w if w == first_side => report.first_wins += 1,
            _ => report.second_wins += 1,
        }
        pb.inc(1);
        pb.set_message(format!(
            "{}-{}-{}",
            report.first_wins, report.second_wins, report.draws
        ));
    }
    pb.finish_and_clear();

    info!(first = first.name(), second = second.name(), "match finished");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
