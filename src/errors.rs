// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The handle's slot was released (or reused) since the handle was issued.
    #[error("stale variable handle {0}")]
    StaleVariable(String),

    /// A deletion was already scheduled for this variable.
    #[error("variable {0} is pending deletion")]
    VariableDeleted(String),

    #[error("stale operator handle {0}")]
    StaleOperator(String),

    #[error("operator {0} is pending deletion")]
    OperatorDeleted(String),

    /// Blocking waits are not allowed from work running on an engine lane.
    #[error("blocking wait called from inside an engine work function")]
    WaitFromWorker,

    #[error("{0} arena exhausted")]
    Exhausted(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, EngineError>;
