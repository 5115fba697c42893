mod app;
mod board;
mod config;
mod entities;
mod error;
mod game;
mod input;
mod logger;
mod scheduler;
mod scores;
mod snake;
mod term;

use std::path::PathBuf;

use clap::Parser;
use log::{error, info, LevelFilter};
use rand::{rngs::StdRng, SeedableRng};

use crate::app::SnakeApp;
use crate::board::Board;
use crate::error::{Error, Result};
use crate::game::Game;
use crate::scheduler::CancelToken;
use crate::scores::ScoreStore;
use crate::term::TermManager;

/// Board coordinates, in board units (multiples of the cell size).
pub type Coord = i32;
pub type Cell = (Coord, Coord);

pub type TermInt = u16;
pub type TermCoords = (TermInt, TermInt);

#[derive(Parser, Debug)]
#[command(name = "space-snake", version, about = "Space Snake in the terminal")]
struct Cli {
    /// YAML settings file; defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// High-score file, overrides the settings
    #[arg(long)]
    scores: Option<PathBuf>,

    #[arg(long, default_value = "space_snake.log")]
    log_file: PathBuf,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seed for a reproducible session
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level: LevelFilter = cli.log_level.parse()
        .map_err(|_| Error::Config(format!("unknown log level '{}'", cli.log_level)))?;
    logger::init_logger(&cli.log_file, level)?;
    info!("Starting Space Snake");

    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(scores) = cli.scores {
        settings.score_file = scores;
    }

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let board = Board::from(&settings.board);
    let mut term = TermManager::new(&board)?;
    term.setup()?;

    let scores = ScoreStore::new(settings.score_file.clone());
    let game = Game::new(settings, rng);
    let mut app = SnakeApp::new(game, scores, term, CancelToken::new());

    // The terminal has to be restored whatever happened in the game loop.
    let outcome = app.run();
    app.shutdown();
    let restored = app.presentation_mut().restore();

    if let Err(e) = &outcome {
        error!("Game loop failed: {}", e);
    }
    outcome?;
    restored?;

    info!("Bye");
    Ok(())
}
