use std::{collections::HashSet, time::{Duration, Instant}};

use rand::{seq::SliceRandom, Rng};

use crate::{Cell, Coord};
use crate::board::Board;
use crate::config::PowerUpSettings;

/// Planet-like colour schemes the apple is drawn with. Purely cosmetic.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Palette {
    Ocean,
    Rust,
    Rock,
    Magma,
}

const PALETTES: [Palette; 4] = [Palette::Ocean, Palette::Rust, Palette::Rock, Palette::Magma];
const CRATER_COUNT: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppleStyle {
    pub palette: Palette,
    /// Crater offsets inside the cell, in board units.
    pub craters: [(Coord, Coord); CRATER_COUNT],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Apple {
    pub position: Cell,
    pub style: AppleStyle,
}

impl Apple {
    pub fn new<R: Rng>(position: Cell, cell_size: Coord, rng: &mut R) -> Self {
        let palette = *PALETTES.choose(rng).unwrap_or(&Palette::Ocean);
        let inner = (cell_size - 2).max(3);
        let mut craters = [(0, 0); CRATER_COUNT];
        for crater in craters.iter_mut() {
            *crater = (rng.gen_range(2..inner), rng.gen_range(2..inner));
        }

        Apple { position, style: AppleStyle { palette, craters } }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PowerUpKind {
    Invincible,
    Speed,
    BonusPoints,
}

pub const POWER_UP_KINDS: [PowerUpKind; 3] =
    [PowerUpKind::Invincible, PowerUpKind::Speed, PowerUpKind::BonusPoints];

impl PowerUpKind {
    pub fn duration(&self, settings: &PowerUpSettings) -> Duration {
        match self {
            PowerUpKind::Invincible => Duration::from_secs(settings.invincible_secs),
            PowerUpKind::Speed => Duration::from_secs(settings.speed_secs),
            PowerUpKind::BonusPoints => Duration::ZERO,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PowerUpKind::Invincible => "Invincible",
            PowerUpKind::Speed => "Speed",
            PowerUpKind::BonusPoints => "Bonus",
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            PowerUpKind::Invincible => '*',
            PowerUpKind::Speed => '!',
            PowerUpKind::BonusPoints => '$',
        }
    }
}

/// A power-up lying on the board, waiting to be collected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    pub position: Cell,
    pub duration: Duration,
    pub spawned_at: Instant,
}

/// The running consequence of a collected timed power-up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Invincible { ends_at: Instant },
    /// `applied_delta` is the interval reduction actually made, so expiry
    /// restores the exact prior interval even when the floor clipped it.
    Speed { ends_at: Instant, applied_delta: u64 },
}

impl Effect {
    pub fn ends_at(&self) -> Instant {
        match *self {
            Effect::Invincible { ends_at } | Effect::Speed { ends_at, .. } => ends_at,
        }
    }

    pub fn kind(&self) -> PowerUpKind {
        match self {
            Effect::Invincible { .. } => PowerUpKind::Invincible,
            Effect::Speed { .. } => PowerUpKind::Speed,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.ends_at()
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.ends_at().saturating_duration_since(now)
    }

    pub fn postpone(&mut self, by: Duration) {
        match self {
            Effect::Invincible { ends_at } | Effect::Speed { ends_at, .. } => *ends_at += by,
        }
    }
}

/// Picks a uniformly random free cell for a new apple. `None` means the board
/// is full.
pub fn place_apple<R: Rng>(board: &Board, occupied: &HashSet<Cell>, rng: &mut R) -> Option<Apple> {
    let choices = board.free_cells(occupied);
    let position = *choices.choose(rng)?;
    Some(Apple::new(position, board.cell_size(), rng))
}

/// Picks a kind and a free cell (also avoiding the apple) for a new power-up.
pub fn place_power_up<R: Rng>(
    board: &Board,
    occupied: &HashSet<Cell>,
    apple: Cell,
    settings: &PowerUpSettings,
    now: Instant,
    rng: &mut R,
) -> Option<PowerUp> {
    let choices: Vec<Cell> = board.free_cells(occupied).into_iter().filter(|c| *c != apple).collect();
    let position = *choices.choose(rng)?;
    let kind = *POWER_UP_KINDS.choose(rng)?;

    Some(PowerUp { kind, position, duration: kind.duration(settings), spawned_at: now })
}
