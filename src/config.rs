use std::str::FromStr;

use crate::{
    definition::StubOptions,
    error::{config::ConfigError, StubError},
};

/// Identifiers handed out by a registry start right after this value, keeping them clear of
/// ids a real seed script would use.
pub const DEFAULT_ID_BASE: i64 = 999;

const ID_BASE_VAR: &str = "MODEL_STUBBING_ID_BASE";
const VALIDATE_VAR: &str = "MODEL_STUBBING_VALIDATE";
const INSERT_VAR: &str = "MODEL_STUBBING_INSERT";
const CALLBACKS_VAR: &str = "MODEL_STUBBING_CALLBACKS";

/// Process-level settings for a [`Registry`](crate::registry::Registry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Value each per-backing-type id sequence starts after.
    pub id_base: i64,

    /// Insert options new definitions start with.
    pub options: StubOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_base: DEFAULT_ID_BASE,
            options: StubOptions::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// Every variable is optional; unset variables keep their default. Set variables
    /// that fail to parse are reported instead of silently ignored.
    ///
    /// # Returns
    /// - `Ok(Config)` - Defaults overridden by any set variables
    /// - `Err(StubError::Config)` - A set variable could not be parsed
    pub fn from_env() -> Result<Self, StubError> {
        let defaults = Self::default();

        Ok(Self {
            id_base: env_or(ID_BASE_VAR, defaults.id_base)?,
            options: StubOptions {
                validate: env_or(VALIDATE_VAR, defaults.options.validate)?,
                insert: env_or(INSERT_VAR, defaults.options.insert)?,
                callbacks: env_or(CALLBACKS_VAR, defaults.options.callbacks)?,
            },
        })
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
