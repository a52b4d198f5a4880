//! Engine configuration.
//!
//! Runtime behaviour is tuned through a layered, multi-source configuration
//! backed by the `config` crate.
//!
//! Priority (lowest → highest):
//! 1. Compile-time defaults (`impl Default`).
//! 2. An optional TOML/YAML/JSON file passed to [`EngineConfig::load`].
//! 3. Environment variables with `NILAMI__` prefix, e.g.
//!
//!    NILAMI__EVENT_CHANNEL_CAPACITY=1024
//!
//! The resulting instance is validated before use; prefer returning an error
//! over silently fixing values at runtime.

use std::{path::Path, time::Duration};

use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Tunables for the auction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum bid increment applied when an auction does not specify one.
    pub default_minimum_increment: Decimal,
    /// Quality grade recorded when the farmer leaves it unset.
    pub default_quality_grade: String,
    /// State recorded when the farmer leaves the location's state unset.
    pub default_state: String,
    /// Upper bound on harvest photos per auction.
    pub max_photos: usize,
    /// Capacity of the broadcast event bus.
    pub event_channel_capacity: usize,
    /// Upper bound for a single storage round-trip.
    #[serde(with = "humantime_serde")]
    pub store_op_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_minimum_increment: Decimal::from(50),
            default_quality_grade: "Standard".into(),
            default_state: "Maharashtra".into(),
            max_photos: 4,
            event_channel_capacity: 256,
            store_op_timeout: Duration::from_secs(3),
        }
    }
}

impl EngineConfig {
    /// Build a configuration from defaults, an optional file, and the
    /// environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("NILAMI")
                .separator("__")
                .try_parsing(true),
        );

        let merged: EngineConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| EngineError::Validation(format!("configuration: {e}")))?;

        merged.validate()?;
        Ok(merged)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.default_minimum_increment <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "default_minimum_increment must be positive".into(),
            ));
        }
        if self.max_photos == 0 {
            return Err(EngineError::Validation("max_photos must be > 0".into()));
        }
        if self.event_channel_capacity == 0 {
            return Err(EngineError::Validation(
                "event_channel_capacity must be > 0".into(),
            ));
        }
        if self.store_op_timeout.is_zero() {
            return Err(EngineError::Validation(
                "store_op_timeout must be > 0".into(),
            ));
        }
        Ok(())
    }
}
