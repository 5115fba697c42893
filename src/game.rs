use std::{collections::{HashSet, VecDeque}, time::{Duration, Instant}};

use log::{debug, info};
use rand::{rngs::StdRng, Rng};

use crate::Cell;
use crate::board::{is_self_collision, Board};
use crate::config::Settings;
use crate::entities::{place_apple, place_power_up, Apple, Effect, PowerUp, PowerUpKind};
use crate::snake::{Direction::{self, *}, Snake};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameState {
    Title,
    Playing,
    Paused,
    GameOver,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CrashReason {
    Wall,
    SelfCollision,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Crashed(CrashReason),
    /// The snake filled every cell and no apple could be placed.
    BoardFull,
}

pub type DirectionQueue = VecDeque<Direction>;

/// How long the status line announces a collected bonus.
const BONUS_NOTICE: Duration = Duration::from_secs(3);

/// Everything the presentation needs to draw one frame.
pub struct Frame<'a> {
    pub board: &'a Board,
    pub snake: &'a Snake,
    pub apple: &'a Apple,
    pub power_up: Option<&'a PowerUp>,
    pub effect: Option<PowerUpKind>,
    pub status: String,
}

/// One play session's entity state. Only `tick` mutates the snake, apple and
/// power-ups; input goes through `queue_direction`.
pub struct Game<R = StdRng> {
    settings: Settings,
    board: Board,
    snake: Snake,
    directions: DirectionQueue,
    apple: Apple,
    power_up: Option<PowerUp>,
    effect: Option<Effect>,
    last_spawn: Option<Instant>,
    bonus_notice_until: Option<Instant>,
    score: u32,
    apples_eaten: u32,
    speed_ms: u64,
    rng: R,
}

impl<R: Rng> Game<R> {
    pub fn new(settings: Settings, mut rng: R) -> Self {
        let board = Board::from(&settings.board);
        let snake = Self::spawn_snake(&board, &settings);
        let apple = Self::first_apple(&board, &snake, &mut rng);
        let speed_ms = settings.timing.initial_speed_ms;

        Game {
            settings,
            board,
            snake,
            directions: DirectionQueue::new(),
            apple,
            power_up: None,
            effect: None,
            last_spawn: None,
            bonus_notice_until: None,
            score: 0,
            apples_eaten: 0,
            speed_ms,
            rng,
        }
    }

    /// Reinitialises every entity for a new round, keeping settings and RNG.
    pub fn reset(&mut self) {
        self.snake = Self::spawn_snake(&self.board, &self.settings);
        self.apple = Self::first_apple(&self.board, &self.snake, &mut self.rng);
        self.directions.clear();
        self.power_up = None;
        self.effect = None;
        self.last_spawn = None;
        self.bonus_notice_until = None;
        self.score = 0;
        self.apples_eaten = 0;
        self.speed_ms = self.settings.timing.initial_speed_ms;
    }

    pub fn queue_direction(&mut self, direction: Direction) {
        self.directions.push_back(direction);
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if let Some(effect) = self.effect {
            if effect.is_expired(now) {
                self.deactivate_effect();
            }
        }

        if self.power_up.is_none() && self.cooldown_elapsed(now)
            && self.rng.gen_bool(self.settings.power_ups.spawn_probability)
        {
            self.spawn_power_up(now);
        }

        // One turn per tick; reversal is judged against the heading at dequeue time.
        if let Some(dir) = self.directions.pop_front() {
            if !self.snake.set_heading(dir) {
                debug!("Ignoring reversal {:?} while heading {:?}", dir, self.snake.heading());
            }
        }

        let invincible = self.is_invincible();
        let mut new_head = self.board.advance(self.snake.head(), self.snake.heading());
        if invincible {
            new_head = self.board.wrap(new_head);
        }

        self.snake.push_head(new_head);
        if new_head == self.apple.position {
            self.apples_eaten += 1;
            self.score += self.settings.apple_reward;
            debug!("Apple eaten at {:?}, score {}", new_head, self.score);

            let occupied = self.occupied_cells();
            match place_apple(&self.board, &occupied, &mut self.rng) {
                Some(apple) => self.apple = apple,
                None => {
                    info!("Board full with score {}", self.score);
                    return TickOutcome::BoardFull;
                }
            }
        } else {
            self.snake.pop_tail();
        }

        if !invincible {
            if self.board.is_out_of_bounds(new_head) {
                return TickOutcome::Crashed(CrashReason::Wall);
            }
            if is_self_collision(new_head, self.snake.body()) {
                return TickOutcome::Crashed(CrashReason::SelfCollision);
            }
        }

        if self.power_up.as_ref().map(|p| p.position) == Some(new_head) {
            if let Some(power_up) = self.power_up.take() {
                self.activate(power_up.kind, now);
            }
        }

        TickOutcome::Continue
    }

    /// Pushes every running timer forward, so time spent paused is not lost.
    pub fn shift_timers(&mut self, by: Duration) {
        if let Some(effect) = self.effect.as_mut() {
            effect.postpone(by);
        }
        if let Some(last_spawn) = self.last_spawn.as_mut() {
            *last_spawn += by;
        }
        if let Some(until) = self.bonus_notice_until.as_mut() {
            *until += by;
        }
    }

    pub fn frame(&self, now: Instant) -> Frame<'_> {
        Frame {
            board: &self.board,
            snake: &self.snake,
            apple: &self.apple,
            power_up: self.power_up.as_ref(),
            effect: self.effect.map(|e| e.kind()),
            status: self.status_line(now),
        }
    }

    pub fn status_line(&self, now: Instant) -> String {
        let speed_percent = self.settings.timing.initial_speed_ms * 100 / self.speed_ms.max(1);
        let mut status = format!("Score: {} | Speed: {}%", self.score, speed_percent);
        if let Some(effect) = &self.effect {
            status.push_str(&format!(" | {} ({}s)", effect.kind().label(), effect.remaining(now).as_secs()));
        }
        if self.bonus_notice_until.map_or(false, |until| now < until) {
            status.push_str(" | Bonus collected!");
        }
        status
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn apples_eaten(&self) -> u32 {
        self.apples_eaten
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.speed_ms)
    }

    pub fn is_invincible(&self) -> bool {
        matches!(self.effect, Some(Effect::Invincible { .. }))
    }

    ///////////////////////////////////////////////////////////////////////////

    fn spawn_snake(board: &Board, settings: &Settings) -> Snake {
        let length = settings.board.initial_length;
        Snake::new(board.spawn_head(length), length, Right, board.cell_size())
    }

    fn first_apple(board: &Board, snake: &Snake, rng: &mut R) -> Apple {
        let occupied: HashSet<Cell> = snake.body().iter().copied().collect();
        // Validated settings keep the spawn snake far smaller than the board.
        place_apple(board, &occupied, rng)
            .unwrap_or_else(|| Apple::new((0, 0), board.cell_size(), rng))
    }

    fn occupied_cells(&self) -> HashSet<Cell> {
        let mut occupied: HashSet<Cell> = self.snake.body().iter().copied().collect();
        if let Some(power_up) = &self.power_up {
            occupied.insert(power_up.position);
        }
        occupied
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        match self.last_spawn {
            Some(at) => now.saturating_duration_since(at) > self.settings.power_ups.cooldown(),
            None => true,
        }
    }

    fn spawn_power_up(&mut self, now: Instant) {
        let occupied: HashSet<Cell> = self.snake.body().iter().copied().collect();
        let spawned = place_power_up(
            &self.board,
            &occupied,
            self.apple.position,
            &self.settings.power_ups,
            now,
            &mut self.rng,
        );

        if let Some(power_up) = spawned {
            debug!("Spawned {:?} power-up at {:?}", power_up.kind, power_up.position);
            self.power_up = Some(power_up);
            self.last_spawn = Some(now);
        }
    }

    fn activate(&mut self, kind: PowerUpKind, now: Instant) {
        info!("Collected {:?} power-up", kind);
        let ends_at = now + kind.duration(&self.settings.power_ups);

        match kind {
            PowerUpKind::BonusPoints => {
                self.score += self.settings.power_ups.bonus_points;
                self.bonus_notice_until = Some(now + BONUS_NOTICE);
            }
            PowerUpKind::Invincible => {
                self.deactivate_effect();
                self.effect = Some(Effect::Invincible { ends_at });
            }
            PowerUpKind::Speed => {
                self.deactivate_effect();
                let timing = &self.settings.timing;
                let reduced = self.speed_ms.saturating_sub(timing.speed_delta_ms).max(timing.min_speed_ms);
                let applied_delta = self.speed_ms.saturating_sub(reduced);
                self.speed_ms = reduced;
                self.effect = Some(Effect::Speed { ends_at, applied_delta });
            }
        }
    }

    fn deactivate_effect(&mut self) {
        match self.effect.take() {
            Some(Effect::Speed { applied_delta, .. }) => {
                self.speed_ms += applied_delta;
                debug!("Speed effect expired, interval back to {}ms", self.speed_ms);
            }
            Some(Effect::Invincible { .. }) => debug!("Invincibility expired"),
            None => {}
        }
    }
}

#[cfg(test)]
impl<R: Rng> Game<R> {
    pub(crate) fn snake(&self) -> &Snake {
        &self.snake
    }

    pub(crate) fn apple(&self) -> &Apple {
        &self.apple
    }

    fn power_up(&self) -> Option<&PowerUp> {
        self.power_up.as_ref()
    }

    fn effect(&self) -> Option<&Effect> {
        self.effect.as_ref()
    }

    fn speed_ms(&self) -> u64 {
        self.speed_ms
    }

    fn set_effect(&mut self, effect: Effect) {
        self.effect = Some(effect);
    }

    fn set_snake(&mut self, snake: Snake) {
        self.snake = snake;
    }

    fn set_apple_at(&mut self, position: Cell) {
        self.apple.position = position;
    }

    fn set_power_up(&mut self, kind: PowerUpKind, position: Cell, now: Instant) {
        let duration = kind.duration(&self.settings.power_ups);
        self.power_up = Some(PowerUp { kind, position, duration, spawned_at: now });
        self.last_spawn = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn quiet_settings() -> Settings {
        let mut settings = Settings::default();
        settings.power_ups.spawn_probability = 0.0;
        settings
    }

    fn game_with(settings: Settings) -> Game {
        Game::new(settings, StdRng::seed_from_u64(42))
    }

    fn classic_game() -> Game {
        let mut game = game_with(quiet_settings());
        game.set_snake(Snake::from_body(vec![(200, 200), (220, 200), (240, 200)], Right));
        game
    }

    #[test]
    fn spawns_classic_snake() {
        let game = game_with(Settings::default());
        assert_eq!(game.snake().body(), &[(200, 200), (220, 200), (240, 200)]);
        assert_eq!(game.snake().heading(), Right);
        assert_eq!(game.speed_ms(), 120);
        assert!(!game.snake().contains(&game.apple().position));
    }

    #[test]
    fn plain_move_keeps_length() {
        let mut game = classic_game();
        game.set_apple_at((0, 0));

        assert_eq!(game.tick(Instant::now()), TickOutcome::Continue);
        assert_eq!(game.snake().body(), &[(220, 200), (240, 200), (260, 200)]);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn eating_apple_grows_by_one() {
        let mut game = classic_game();
        game.set_apple_at((260, 200));

        assert_eq!(game.tick(Instant::now()), TickOutcome::Continue);
        assert_eq!(game.snake().len(), 4);
        assert_eq!(game.snake().head(), (260, 200));
        assert_eq!(game.score(), 10);
        assert_eq!(game.apples_eaten(), 1);
        assert!(!game.snake().contains(&game.apple().position));
    }

    #[test]
    fn length_is_constant_unless_apple_eaten() {
        let mut game = classic_game();
        let turns = [Up, Up, Left, Left, Down, Down, Down, Right, Right, Right, Right];
        let now = Instant::now();

        for dir in turns.iter() {
            game.queue_direction(*dir);
            let before = game.snake().len();
            let apple = game.apple().position;
            assert_eq!(game.tick(now), TickOutcome::Continue);
            let grew = game.snake().head() == apple;
            assert_eq!(game.snake().len(), before + grew as usize);
        }
    }

    #[test]
    fn wall_collision_ends_game() {
        let mut game = classic_game();
        game.set_snake(Snake::from_body(vec![(340, 0), (360, 0), (380, 0)], Right));
        game.set_apple_at((0, 380));

        assert_eq!(game.tick(Instant::now()), TickOutcome::Crashed(CrashReason::Wall));
    }

    #[test]
    fn self_collision_ends_game() {
        let mut game = classic_game();
        // Head at (220,180) heading left; turning down bites the body.
        game.set_snake(Snake::from_body(
            vec![(200, 220), (200, 200), (220, 200), (240, 200), (240, 180), (220, 180)],
            Left,
        ));
        game.set_apple_at((0, 0));
        game.queue_direction(Down);

        assert_eq!(game.tick(Instant::now()), TickOutcome::Crashed(CrashReason::SelfCollision));
    }

    #[test]
    fn moving_into_vacated_tail_is_safe() {
        let mut game = classic_game();
        game.set_snake(Snake::from_body(vec![(200, 200), (200, 220), (220, 220), (220, 200)], Left));
        game.set_apple_at((0, 0));

        assert_eq!(game.tick(Instant::now()), TickOutcome::Continue);
        assert_eq!(game.snake().head(), (200, 200));
    }

    #[test]
    fn reversal_is_never_applied() {
        let mut game = classic_game();
        game.set_apple_at((0, 0));
        game.queue_direction(Left);

        assert_eq!(game.tick(Instant::now()), TickOutcome::Continue);
        assert_eq!(game.snake().heading(), Right);
        assert_eq!(game.snake().head(), (260, 200));
    }

    #[test]
    fn queued_turns_apply_one_per_tick_against_current_heading() {
        let mut game = classic_game();
        game.set_apple_at((0, 0));
        let now = Instant::now();

        // Up is valid from Right, and Left is valid once heading Up.
        game.queue_direction(Up);
        game.queue_direction(Left);

        game.tick(now);
        assert_eq!(game.snake().heading(), Up);
        assert_eq!(game.snake().head(), (240, 180));

        game.tick(now);
        assert_eq!(game.snake().heading(), Left);
        assert_eq!(game.snake().head(), (220, 180));
    }

    #[test]
    fn reversal_checked_at_dequeue_time() {
        let mut game = classic_game();
        game.set_apple_at((0, 0));
        let now = Instant::now();

        // Down then Up: Up reverses Down, the heading current when Up is dequeued.
        game.queue_direction(Down);
        game.queue_direction(Up);

        game.tick(now);
        game.tick(now);
        assert_eq!(game.snake().heading(), Down);
        assert_eq!(game.snake().head(), (240, 240));
    }

    #[test]
    fn invincible_wraps_instead_of_crashing() {
        let mut game = classic_game();
        let now = Instant::now();
        game.set_snake(Snake::from_body(vec![(340, 100), (360, 100), (380, 100)], Right));
        game.set_apple_at((0, 380));
        game.set_power_up(PowerUpKind::Invincible, (380, 120), now);
        game.queue_direction(Down);

        assert_eq!(game.tick(now), TickOutcome::Continue);
        assert!(game.is_invincible());
        assert!(game.power_up().is_none());

        game.queue_direction(Right);
        assert_eq!(game.tick(now), TickOutcome::Continue);
        assert_eq!(game.snake().head(), (0, 120));
    }

    #[test]
    fn invincible_passes_through_own_body() {
        let mut game = classic_game();
        let now = Instant::now();
        game.set_snake(Snake::from_body(
            vec![(200, 220), (200, 200), (220, 200), (240, 200), (240, 180), (220, 180)],
            Left,
        ));
        game.set_apple_at((0, 0));
        game.set_effect(Effect::Invincible { ends_at: now + Duration::from_secs(10) });
        game.queue_direction(Down);

        assert_eq!(game.tick(now), TickOutcome::Continue);
        assert_eq!(game.snake().head(), (220, 200));

        // Once the effect lapses, turning right bites the body again.
        game.queue_direction(Right);
        assert_eq!(game.tick(now + Duration::from_secs(11)), TickOutcome::Crashed(CrashReason::SelfCollision));
        assert!(!game.is_invincible());
    }

    #[test]
    fn invincibility_expires() {
        let mut game = classic_game();
        let now = Instant::now();
        game.set_apple_at((0, 0));
        game.set_power_up(PowerUpKind::Invincible, (260, 200), now);

        game.tick(now);
        assert!(game.is_invincible());

        game.tick(now + Duration::from_secs(10));
        assert!(game.is_invincible());

        game.tick(now + Duration::from_secs(11));
        assert!(!game.is_invincible());
        assert!(game.effect().is_none());
    }

    #[test]
    fn speed_power_up_applies_and_reverts() {
        let mut game = classic_game();
        let now = Instant::now();
        game.set_apple_at((0, 0));
        game.set_power_up(PowerUpKind::Speed, (260, 200), now);

        game.tick(now);
        assert_eq!(game.speed_ms(), 90);

        game.tick(now + Duration::from_secs(15));
        assert_eq!(game.speed_ms(), 90);

        game.tick(now + Duration::from_secs(16));
        assert_eq!(game.speed_ms(), 120);
    }

    #[test]
    fn speed_floor_is_restored_exactly() {
        let mut settings = quiet_settings();
        settings.timing.initial_speed_ms = 60;
        let mut game = game_with(settings);
        let now = Instant::now();
        game.set_snake(Snake::from_body(vec![(200, 200), (220, 200), (240, 200)], Right));
        game.set_apple_at((0, 0));
        game.set_power_up(PowerUpKind::Speed, (260, 200), now);

        game.tick(now);
        assert_eq!(game.speed_ms(), 50);

        game.tick(now + Duration::from_secs(16));
        assert_eq!(game.speed_ms(), 60);
    }

    #[test]
    fn bonus_points_are_instant() {
        let mut game = classic_game();
        let now = Instant::now();
        game.set_apple_at((0, 0));
        game.set_power_up(PowerUpKind::BonusPoints, (260, 200), now);

        game.tick(now);
        assert_eq!(game.score(), 150);
        assert!(game.effect().is_none());
        assert!(game.power_up().is_none());
    }

    #[test]
    fn bonus_is_announced_briefly() {
        let mut game = classic_game();
        let now = Instant::now();
        game.set_apple_at((0, 0));
        game.set_power_up(PowerUpKind::BonusPoints, (260, 200), now);
        game.tick(now);

        assert_eq!(game.status_line(now), "Score: 150 | Speed: 100% | Bonus collected!");
        assert_eq!(game.status_line(now + Duration::from_secs(3)), "Score: 150 | Speed: 100%");
    }

    #[test]
    fn bonus_leaves_running_effect_alone() {
        let mut game = classic_game();
        let now = Instant::now();
        game.set_apple_at((0, 0));
        game.set_power_up(PowerUpKind::Speed, (260, 200), now);
        game.tick(now);

        game.set_power_up(PowerUpKind::BonusPoints, (280, 200), now);
        game.tick(now);
        assert_eq!(game.speed_ms(), 90);
        assert_eq!(game.score(), 150);
    }

    #[test]
    fn new_timed_effect_replaces_running_one() {
        let mut game = classic_game();
        let now = Instant::now();
        game.set_apple_at((0, 0));
        game.set_power_up(PowerUpKind::Speed, (260, 200), now);
        game.tick(now);
        assert_eq!(game.speed_ms(), 90);

        game.set_power_up(PowerUpKind::Invincible, (280, 200), now);
        game.tick(now);
        assert_eq!(game.speed_ms(), 120);
        assert!(game.is_invincible());
    }

    #[test]
    fn power_up_spawn_respects_cooldown() {
        let mut settings = Settings::default();
        settings.power_ups.spawn_probability = 1.0;
        let mut game = game_with(settings);
        // The head lands on the apple, which the power-up never occupies.
        game.set_apple_at((60, 200));
        game.set_snake(Snake::from_body(vec![(0, 200), (20, 200), (40, 200)], Right));
        let now = Instant::now();

        game.tick(now);
        let first = game.power_up().cloned().unwrap();
        assert!(!game.snake().contains(&first.position));
        assert_ne!(first.position, game.apple().position);

        // While one sits on the board nothing new spawns.
        game.tick(now + Duration::from_secs(30));
        assert!(game.power_up().map_or(true, |p| p.spawned_at == now));
    }

    #[test]
    fn no_spawn_before_cooldown() {
        let mut settings = Settings::default();
        settings.power_ups.spawn_probability = 1.0;
        let mut game = game_with(settings);
        game.set_apple_at((80, 200));
        game.set_snake(Snake::from_body(vec![(0, 200), (20, 200), (40, 200)], Right));
        let now = Instant::now();
        game.last_spawn = Some(now);

        game.tick(now + Duration::from_secs(15));
        assert!(game.power_up().is_none());

        game.tick(now + Duration::from_secs(16));
        assert!(game.power_up().is_some());
    }

    #[test]
    fn shifting_timers_extends_effect() {
        let mut game = classic_game();
        let now = Instant::now();
        game.set_apple_at((0, 0));
        game.set_power_up(PowerUpKind::Invincible, (260, 200), now);
        game.tick(now);

        game.shift_timers(Duration::from_secs(30));
        game.tick(now + Duration::from_secs(20));
        assert!(game.is_invincible());
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut game = classic_game();
        let now = Instant::now();
        game.set_power_up(PowerUpKind::Speed, (260, 200), now);
        game.tick(now);
        game.queue_direction(Up);

        game.reset();
        assert_eq!(game.snake().body(), &[(200, 200), (220, 200), (240, 200)]);
        assert_eq!(game.speed_ms(), 120);
        assert_eq!(game.score(), 0);
        assert!(game.effect().is_none());
        assert!(game.power_up().is_none());

        game.set_apple_at((0, 0));
        game.tick(now);
        assert_eq!(game.snake().heading(), Right);
    }

    #[test]
    fn status_line_reports_effect() {
        let mut game = classic_game();
        let now = Instant::now();
        game.set_apple_at((0, 0));
        game.set_power_up(PowerUpKind::Speed, (260, 200), now);
        game.tick(now);

        assert_eq!(game.status_line(now), "Score: 0 | Speed: 133% | Speed (15s)");
    }
}
