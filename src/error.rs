use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse settings: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("invalid settings: {0}")]
    Config(String),

    #[error("failed to initialize logger: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error("terminal error: {0}")]
    Terminal(String),

    #[error("terminal is {have_w}x{have_h}, the board needs at least {need_w}x{need_h}")]
    TerminalTooSmall { have_w: u16, have_h: u16, need_w: u16, need_h: u16 },
}

impl Error {
    pub fn terminal(e: impl std::fmt::Display) -> Self {
        Error::Terminal(e.to_string())
    }
}
