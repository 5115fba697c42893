use std::{fs::File, path::Path};

use simplelog::{Config, LevelFilter, WriteLogger};

use crate::error::Result;

/// Sends log records to `path`. The terminal itself is in raw mode and owned
/// by the game, so nothing is logged to stdout or stderr.
pub fn init_logger(path: &Path, level: LevelFilter) -> Result<()> {
    WriteLogger::init(level, Config::default(), File::create(path)?)?;
    Ok(())
}
