// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::{EngineError, Result};
use crate::types::EngineKind;

/// Env var naming a config file to load.
pub const CONFIG_ENV: &str = "DEPENGINE_CONFIG";

/// Env var overriding `[engine].kind`.
pub const ENGINE_TYPE_ENV: &str = "DEPENGINE_ENGINE_TYPE";

/// Load a configuration file and return the raw `RawEngineConfig`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawEngineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawEngineConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let raw_config = load_from_path(&path)?;
    let config = EngineConfig::try_from(raw_config)?;
    Ok(config)
}

/// Default config file name, relative to the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Depengine.toml")
}

impl EngineConfig {
    /// Build the configuration used by [`Engine::shared`](crate::Engine::shared).
    ///
    /// - `DEPENGINE_CONFIG` set: load and validate that file.
    /// - otherwise: defaults.
    ///
    /// `DEPENGINE_ENGINE_TYPE` then overrides the engine kind.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                debug!(path = ?path, "loading engine config from {CONFIG_ENV}");
                load_and_validate(PathBuf::from(path))?
            }
            None => EngineConfig::default(),
        };

        if let Ok(kind) = std::env::var(ENGINE_TYPE_ENV) {
            config.engine.kind = kind
                .parse::<EngineKind>()
                .map_err(|e| EngineError::ConfigError(format!("{ENGINE_TYPE_ENV}: {e}")))?;
        }

        Ok(config)
    }
}
