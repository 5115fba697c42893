use std::{fs, path::{Path, PathBuf}};

use log::{info, warn};

use crate::error::Result;

pub const TABLE_SIZE: usize = 3;
pub const MAX_NAME_LEN: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

impl ScoreEntry {
    pub fn new(name: &str, score: u32) -> Self {
        ScoreEntry { name: name.to_string(), score }
    }

    fn parse(line: &str) -> Option<Self> {
        let (name, score) = line.split_once(',')?;
        let score = score.trim().parse().ok()?;
        Some(ScoreEntry { name: name.to_string(), score })
    }
}

/// Why a player name was refused at the high-score prompt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NameError {
    Empty,
    TooLong,
    Comma,
}

/// Accepts names of 1 to 6 characters without commas. Nothing is trimmed
/// off or truncated.
pub fn validate_name(name: &str) -> std::result::Result<&str, NameError> {
    if name.trim().is_empty() {
        Err(NameError::Empty)
    } else if name.chars().count() > MAX_NAME_LEN {
        Err(NameError::TooLong)
    } else if name.contains(',') {
        Err(NameError::Comma)
    } else {
        Ok(name)
    }
}

/// Top-3 table persisted as `name,score` lines, best first.
pub struct ScoreStore {
    path: PathBuf,
}

impl ScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ScoreStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the table. A missing, unreadable or malformed file counts as empty.
    pub fn load_top3(&self) -> Vec<ScoreEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not read {}: {}", self.path.display(), e);
                }
                return vec![];
            }
        };

        let parsed: Option<Vec<ScoreEntry>> = content.lines()
            .filter(|line| !line.trim().is_empty())
            .map(ScoreEntry::parse)
            .collect();

        match parsed {
            Some(mut entries) => {
                entries.sort_by(|a, b| b.score.cmp(&a.score));
                entries.truncate(TABLE_SIZE);
                entries
            }
            None => {
                warn!("Score file {} is corrupt, treating it as empty", self.path.display());
                vec![]
            }
        }
    }

    pub fn is_new_high_score(&self, score: u32) -> bool {
        let entries = self.load_top3();
        if entries.len() < TABLE_SIZE {
            return true;
        }
        entries.iter().map(|e| e.score).min().map_or(true, |lowest| score > lowest)
    }

    /// Adds an entry and rewrites the whole file with the best three.
    pub fn save(&self, name: &str, score: u32) -> Result<Vec<ScoreEntry>> {
        let mut entries = self.load_top3();
        entries.push(ScoreEntry::new(name, score));
        // Stable: on equal scores the older entry keeps its rank.
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(TABLE_SIZE);

        let content: String = entries.iter()
            .map(|e| format!("{},{}\n", e.name, e.score))
            .collect();
        fs::write(&self.path, content)?;

        info!("Saved score {} for {} to {}", score, name, self.path.display());
        Ok(entries)
    }
}
