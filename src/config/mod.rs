// src/config/mod.rs

//! Engine configuration.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk or the environment (`loader.rs`).
//! - Validate worker counts (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{EngineConfig, EngineSection, RawEngineConfig, WorkersSection};
pub use validate::validate_config;
