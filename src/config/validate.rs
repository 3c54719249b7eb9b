// src/config/validate.rs

use crate::config::model::{EngineConfig, RawEngineConfig, WorkersSection};
use crate::errors::{EngineError, Result};

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = EngineError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(EngineConfig::new_unchecked(raw.engine, raw.workers))
    }
}

/// Check semantic invariants that deserialization cannot express.
pub fn validate_config(cfg: &RawEngineConfig) -> Result<()> {
    validate_workers(&cfg.workers)?;
    Ok(())
}

fn validate_workers(workers: &WorkersSection) -> Result<()> {
    for (field, value) in [
        ("compute", workers.compute),
        ("copy", workers.copy),
        ("runtime_threads", workers.runtime_threads),
    ] {
        if value == 0 {
            return Err(EngineError::ConfigError(format!(
                "[workers].{field} must be >= 1 (got 0)"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_are_rejected() {
        let mut raw = RawEngineConfig::default();
        raw.workers.copy = 0;

        let err = EngineConfig::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("[workers].copy"), "{err}");
    }

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::try_from(RawEngineConfig::default()).is_ok());
    }
}
