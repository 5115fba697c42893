use std::time::{Duration, Instant};

use log::{error, info};
use rand::{rngs::StdRng, Rng};

use crate::error::Result;
use crate::game::{Frame, Game, GameState, TickOutcome};
use crate::input::Command;
use crate::scheduler::{CancelToken, TickScheduler};
use crate::scores::{validate_name, NameError, ScoreEntry, ScoreStore, MAX_NAME_LEN};

/// Upper bound on how long the loop blocks for input when no tick is pending.
const IDLE_POLL: Duration = Duration::from_millis(100);

pub const INVALID_NAME_NOTICE: &str = "Invalid name! Score will not be recorded.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameOverSummary {
    pub score: u32,
    pub apples_eaten: u32,
    pub won: bool,
    pub new_record: bool,
    pub table: Vec<ScoreEntry>,
}

/// The UI shell the game talks to. It draws what it is given and turns key
/// presses into commands; it never touches game state directly.
pub trait Presentation {
    fn show_title(&mut self) -> Result<()>;
    fn redraw(&mut self, frame: &Frame<'_>) -> Result<()>;
    fn show_paused(&mut self, paused: bool, status: &str) -> Result<()>;
    /// Commands that arrived within `timeout`. May return early.
    fn poll_commands(&mut self, timeout: Duration) -> Result<Vec<Command>>;
    fn wait_command(&mut self) -> Result<Command>;
    /// `None` when the player dismissed the prompt.
    fn prompt_name(&mut self, prompt: &str) -> Result<Option<String>>;
    fn show_notice(&mut self, message: &str) -> Result<()>;
    fn show_game_over(&mut self, summary: &GameOverSummary) -> Result<()>;
}

/// Owns the session and drives it: the only place ticks are run from.
pub struct SnakeApp<P, R = StdRng> {
    game: Game<R>,
    state: GameState,
    scheduler: TickScheduler,
    scores: ScoreStore,
    presentation: P,
    paused_at: Option<Instant>,
}

impl<P: Presentation, R: Rng> SnakeApp<P, R> {
    pub fn new(game: Game<R>, scores: ScoreStore, presentation: P, cancel: CancelToken) -> Self {
        SnakeApp {
            game,
            state: GameState::Title,
            scheduler: TickScheduler::new(cancel),
            scores,
            presentation,
            paused_at: None,
        }
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    /// Runs until the player quits or the cancel token fires.
    pub fn run(&mut self) -> Result<()> {
        while !self.scheduler.token().is_cancelled() {
            match self.state {
                GameState::Title => {
                    self.presentation.show_title()?;
                    match self.presentation.wait_command()? {
                        Command::Start | Command::Restart => self.start()?,
                        Command::Quit => self.shutdown(),
                        _ => {}
                    }
                }
                GameState::Playing | GameState::Paused => self.pump()?,
                GameState::GameOver => match self.presentation.wait_command()? {
                    Command::Restart | Command::Start => self.restart()?,
                    Command::Quit => self.shutdown(),
                    _ => {}
                },
            }
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        info!("Starting a new round");
        self.game.reset();
        self.state = GameState::Playing;
        self.paused_at = None;

        let now = Instant::now();
        self.presentation.redraw(&self.game.frame(now))?;
        self.scheduler.schedule(now, self.game.tick_interval());
        Ok(())
    }

    pub fn restart(&mut self) -> Result<()> {
        self.start()
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.state != GameState::Playing {
            return Ok(());
        }

        let now = Instant::now();
        self.state = GameState::Paused;
        self.scheduler.suspend();
        self.paused_at = Some(now);
        info!("Paused");
        self.presentation.show_paused(true, &self.game.status_line(now))
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.state != GameState::Paused {
            return Ok(());
        }

        let now = Instant::now();
        if let Some(paused_at) = self.paused_at.take() {
            self.game.shift_timers(now.saturating_duration_since(paused_at));
        }
        self.state = GameState::Playing;
        info!("Resumed");
        self.presentation.show_paused(false, &self.game.status_line(now))?;
        self.scheduler.schedule(now, self.game.tick_interval());
        Ok(())
    }

    /// Stops the loop; no tick runs after this.
    pub fn shutdown(&mut self) {
        self.scheduler.token().cancel();
        self.scheduler.suspend();
    }

    pub fn handle_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Turn(dir) if self.state == GameState::Playing => self.game.queue_direction(dir),
            Command::TogglePause => match self.state {
                GameState::Playing => self.pause()?,
                GameState::Paused => self.resume()?,
                _ => {}
            },
            Command::Quit => self.shutdown(),
            _ => {}
        }
        Ok(())
    }

    /// Runs one tick at `now` and schedules the next one unless the round ended.
    pub fn step(&mut self, now: Instant) -> Result<()> {
        if self.state != GameState::Playing {
            return Ok(());
        }

        let outcome = self.game.tick(now);
        self.presentation.redraw(&self.game.frame(now))?;

        match outcome {
            TickOutcome::Continue => {
                self.scheduler.schedule(now, self.game.tick_interval());
                Ok(())
            }
            TickOutcome::Crashed(reason) => {
                info!("Crashed ({:?}) with score {}", reason, self.game.score());
                self.finish(false)
            }
            TickOutcome::BoardFull => self.finish(true),
        }
    }

    ///////////////////////////////////////////////////////////////////////////

    fn pump(&mut self) -> Result<()> {
        let wait = self.scheduler.time_until_due(Instant::now()).unwrap_or(IDLE_POLL);

        for command in self.presentation.poll_commands(wait)? {
            self.handle_command(command)?;
        }

        let now = Instant::now();
        if self.scheduler.take_due(now) {
            self.step(now)?;
        }
        Ok(())
    }

    fn finish(&mut self, won: bool) -> Result<()> {
        self.state = GameState::GameOver;
        self.scheduler.suspend();

        let score = self.game.score();
        let new_record = self.scores.is_new_high_score(score);
        if new_record {
            self.record_score(score)?;
        }

        let summary = GameOverSummary {
            score,
            apples_eaten: self.game.apples_eaten(),
            won,
            new_record,
            table: self.scores.load_top3(),
        };
        self.presentation.show_game_over(&summary)
    }

    fn record_score(&mut self, score: u32) -> Result<()> {
        let prompt = format!("New record: {}! Your name (max {} chars):", score, MAX_NAME_LEN);

        loop {
            let name = self.presentation.prompt_name(&prompt)?.unwrap_or_default();
            match validate_name(&name) {
                Ok(name) => {
                    if let Err(e) = self.scores.save(name, score) {
                        error!("Failed to save score: {}", e);
                        self.presentation.show_notice("Could not save the score.")?;
                    }
                    return Ok(());
                }
                Err(NameError::Empty) => {
                    info!("Empty name, score {} discarded", score);
                    return self.presentation.show_notice(INVALID_NAME_NOTICE);
                }
                Err(NameError::TooLong) => {
                    self.presentation.show_notice(&format!("Name must be at most {} characters!", MAX_NAME_LEN))?;
                }
                Err(NameError::Comma) => {
                    self.presentation.show_notice("Name must not contain commas!")?;
                }
            }
        }
    }
}

#[cfg(test)]
impl<P: Presentation, R: Rng> SnakeApp<P, R> {
    fn state(&self) -> GameState {
        self.state
    }

    fn game(&self) -> &Game<R> {
        &self.game
    }

    fn presentation(&self) -> &P {
        &self.presentation
    }
}
