// src/engine/shared.rs

//! Process-wide engine instance.
//!
//! The slot only holds a `Weak`: the engine lives exactly as long as some
//! subsystem holds the `Arc` returned by [`Engine::shared`], and is torn down
//! (after draining) when the last one lets go. A later call builds a fresh
//! engine.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::info;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::errors::Result;

static SHARED: Mutex<Weak<Engine>> = Mutex::new(Weak::new());

impl Engine {
    /// Return the shared engine, creating it from [`EngineConfig::from_env`]
    /// if no live instance exists.
    pub fn shared() -> Result<Arc<Engine>> {
        let mut slot = SHARED.lock();
        if let Some(engine) = slot.upgrade() {
            return Ok(engine);
        }

        let config = EngineConfig::from_env()?;
        info!(kind = ?config.kind(), "creating shared engine");
        let engine = Arc::new(Engine::new(config)?);
        *slot = Arc::downgrade(&engine);
        Ok(engine)
    }
}
