// fps_bot_core/server/src/core/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Controlled entity missing: {0}")]
    MissingEntity(String),

    #[error("No active weapon: {0}")]
    NoActiveWeapon(String),

    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command is not console-accessible: {0}")]
    NotConsoleCommand(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BotResult<T> = Result<T, BotError>;
