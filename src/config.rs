//! Engine tunables parsed from environment variables.
//!
//! Optional:
//! - `TRAIL_PUBLISH_INTERVAL_MS`: minimum spacing of position publishes (default 40)
//! - `TRAIL_STALE_AFTER_SECS`: silence before a remote participant is evicted (default 120)
//! - `TRAIL_COMMAND_QUEUE`: session command channel capacity (default 256)
//!
//! Unparseable values fall back to the default with a warning. Values that
//! parse but cannot work together are rejected with a [`ConfigError`].

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::consts::{
    DEFAULT_COMMAND_QUEUE, DEFAULT_PUBLISH_INTERVAL_MS, DEFAULT_STALE_AFTER_SECS, FADE_WINDOW,
    MAX_RECOMMENDED_PUBLISH_INTERVAL_MS, MIN_RECOMMENDED_PUBLISH_INTERVAL_MS, STALE_INTERVAL_MULTIPLIER,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("publish interval must be greater than zero")]
    ZeroInterval,
    #[error("stale threshold {stale_secs}s must be at least {min_secs}s (3x the publish interval)")]
    StaleTooShort { stale_secs: f64, min_secs: f64 },
    #[error("command queue capacity must be greater than zero")]
    ZeroQueue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minimum spacing between position-only publishes.
    pub publish_interval: Duration,
    /// Seconds of silence after which a remote participant is evicted.
    pub stale_after_secs: f64,
    /// Capacity of the session command channel.
    pub command_queue: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            publish_interval: Duration::from_millis(DEFAULT_PUBLISH_INTERVAL_MS),
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
            command_queue: DEFAULT_COMMAND_QUEUE,
        }
    }
}

impl EngineConfig {
    /// Build typed config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the combined values are unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| match std::env::var(key) {
            Ok(v) => Some(v),
            Err(_) => None,
        })
    }

    /// Build typed config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the combined values are unusable.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let interval_ms = var_parse(&get, "TRAIL_PUBLISH_INTERVAL_MS", DEFAULT_PUBLISH_INTERVAL_MS);
        let config = Self {
            publish_interval: Duration::from_millis(interval_ms),
            stale_after_secs: var_parse(&get, "TRAIL_STALE_AFTER_SECS", DEFAULT_STALE_AFTER_SECS),
            command_queue: var_parse(&get, "TRAIL_COMMAND_QUEUE", DEFAULT_COMMAND_QUEUE),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the tunables can work together.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.publish_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.command_queue == 0 {
            return Err(ConfigError::ZeroQueue);
        }
        let min_secs = self.publish_interval.as_secs_f64() * STALE_INTERVAL_MULTIPLIER;
        if !self.stale_after_secs.is_finite() || self.stale_after_secs < min_secs {
            return Err(ConfigError::StaleTooShort { stale_secs: self.stale_after_secs, min_secs });
        }

        let interval_ms = u64::try_from(self.publish_interval.as_millis()).unwrap_or(u64::MAX);
        if !(MIN_RECOMMENDED_PUBLISH_INTERVAL_MS..=MAX_RECOMMENDED_PUBLISH_INTERVAL_MS).contains(&interval_ms) {
            warn!(interval_ms, "config: publish interval outside the recommended 30-60ms range");
        }
        if self.stale_after_secs <= FADE_WINDOW {
            warn!(
                stale_after_secs = self.stale_after_secs,
                fade_window = FADE_WINDOW,
                "config: stale threshold does not outlast trail decay"
            );
        }
        Ok(())
    }
}

fn var_parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
{
    let Some(raw) = get(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            warn!(key, value = %raw, "config: unparseable value, using default");
            default
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
