use thiserror::Error;

use crate::arena::ArenaError;
use crate::matchmaking::MatchmakingError;

#[derive(Error, Debug)]
pub enum RaidError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Matchmaking error: {0}")]
    Matchmaking(#[from] MatchmakingError),

    #[error("Arena error: {0}")]
    Arena(#[from] ArenaError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RaidError>;
