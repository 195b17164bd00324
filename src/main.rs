use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flexi_logger::{Duplicate, FileSpec, Logger, WriteMode};

use tenuki::constants::{BOARDSIZE, N, N_SIMS};
use tenuki::engine::Engine;
use tenuki::gtp::Gtp;
use tenuki::mcts::{tree_search, Tree};
use tenuki::playout::mcbenchmark;
use tenuki::position::{play_move, render, str_coord, Position};

#[derive(Parser)]
#[command(name = "tenuki", version, about = "A minimalistic Monte-Carlo Go engine")]
struct Cli {
    /// RNG seed; taken from the clock when absent.
    #[arg(long)]
    seed: Option<u32>,

    /// Simulations per generated move.
    #[arg(long, default_value_t = N_SIMS)]
    sims: usize,

    /// Spatial pattern probabilities.
    #[arg(long, default_value = "patterns.prob")]
    prob_file: PathBuf,

    /// Spatial pattern shapes.
    #[arg(long, default_value = "patterns.spat")]
    spat_file: PathBuf,

    /// Append-mode log file.
    #[arg(long, default_value = "tenuki.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve GTP on stdin/stdout (the default).
    Gtp,
    /// Mean playout score over a number of random games.
    Bench {
        #[arg(default_value_t = 2000)]
        games: usize,
    },
    /// Search the empty board once and print the chosen move.
    Demo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _logger = Logger::try_with_env_or_str("info")?
        .log_to_file(FileSpec::try_from(&cli.log_file)?)
        .append()
        .write_mode(WriteMode::Direct)
        .duplicate_to_stderr(Duplicate::Warn)
        .start()
        .context("starting the logger")?;

    let seed = cli.seed.unwrap_or_else(tenuki::rng::seed_from_clock);
    log::info!("tenuki {}x{}, seed {seed}, {} sims", N, N, cli.sims);
    let mut engine = Engine::with_patterns(seed, &cli.prob_file, &cli.spat_file);

    match cli.command.unwrap_or(Command::Gtp) {
        Command::Gtp => Gtp::new(engine, cli.sims).run(),
        Command::Bench { games } => {
            let (mean, dev) = mcbenchmark(&mut engine, games);
            println!("{games} playouts: mean score {mean:.3}, stddev {dev:.3}");
            Ok(())
        }
        Command::Demo => demo(&mut engine, cli.sims),
    }
}

fn demo(engine: &mut Engine, sims: usize) -> Result<()> {
    let mut pos = Position::new();
    let mut owner = Box::new([0i32; BOARDSIZE]);
    let mut tree = Tree::new(&pos);
    let mv = tree_search(engine, &mut tree, sims, &mut owner, true);
    println!("chosen opening: {}", str_coord(mv));
    if mv != tenuki::constants::PASS_MOVE && mv != tenuki::constants::RESIGN_MOVE {
        play_move(engine, &mut pos, mv)?;
    }
    print!("{}", render(&pos, Some((&*owner, sims))));
    Ok(())
}
