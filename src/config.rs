use std::{fs, io::ErrorKind, path::{Path, PathBuf}, time::Duration};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_SCORE_FILE: &str = "scoresnake.dat";

pub trait Validate {
    fn validate(&self) -> std::result::Result<(), String>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub board: BoardSettings,
    pub timing: TimingSettings,
    pub power_ups: PowerUpSettings,
    pub apple_reward: u32,
    pub score_file: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub width: i32,
    pub height: i32,
    pub cell_size: i32,
    pub initial_length: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub initial_speed_ms: u64,
    pub speed_delta_ms: u64,
    pub min_speed_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpSettings {
    pub cooldown_secs: u64,
    pub spawn_probability: f64,
    pub invincible_secs: u64,
    pub speed_secs: u64,
    pub bonus_points: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            board: BoardSettings::default(),
            timing: TimingSettings::default(),
            power_ups: PowerUpSettings::default(),
            apple_reward: 10,
            score_file: PathBuf::from(DEFAULT_SCORE_FILE),
        }
    }
}

impl Default for BoardSettings {
    fn default() -> Self {
        BoardSettings { width: 400, height: 400, cell_size: 20, initial_length: 3 }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        TimingSettings { initial_speed_ms: 120, speed_delta_ms: 30, min_speed_ms: 50 }
    }
}

impl Default for PowerUpSettings {
    fn default() -> Self {
        PowerUpSettings {
            cooldown_secs: 15,
            spawn_probability: 0.3,
            invincible_secs: 10,
            speed_secs: 15,
            bonus_points: 150,
        }
    }
}

impl PowerUpSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Validate for Settings {
    fn validate(&self) -> std::result::Result<(), String> {
        let b = &self.board;
        if b.cell_size <= 0 {
            return Err("Cell size must be positive".to_string());
        }
        if b.width % b.cell_size != 0 || b.height % b.cell_size != 0 {
            return Err("Board width and height must be multiples of the cell size".to_string());
        }
        let (cols, rows) = (b.width / b.cell_size, b.height / b.cell_size);
        if !(5..=60).contains(&cols) || !(5..=60).contains(&rows) {
            return Err("Board must be between 5 and 60 cells on each side".to_string());
        }
        if b.initial_length < 3 || b.initial_length as i32 > cols / 2 {
            return Err("Initial length must be at least 3 and fit in half the board width".to_string());
        }

        let t = &self.timing;
        if t.min_speed_ms == 0 || t.initial_speed_ms < t.min_speed_ms {
            return Err("Initial speed must be at least the (non-zero) minimum speed".to_string());
        }

        let p = &self.power_ups;
        if !(0.0..=1.0).contains(&p.spawn_probability) {
            return Err("Power-up spawn probability must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }
}

/// Reads settings from a YAML file. A missing file yields the defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        None => Settings::default(),
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => serde_yaml_ng::from_str::<Settings>(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Settings file {} not found, using defaults", path.display());
                Settings::default()
            }
            Err(e) => return Err(e.into()),
        },
    };

    settings.validate().map_err(Error::Config)?;
    info!("Loaded settings: {:?}", settings);
    Ok(settings)
}
