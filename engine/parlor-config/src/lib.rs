//! Centralized configuration loading from config.toml.
//!
//! This crate provides the configuration structs and loading logic shared by
//! the catalog loader and the host binary.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`PARLOR_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! PARLOR_<SECTION>_<KEY>=value
//!
//! Examples:
//!     PARLOR_COMMON_LOG_LEVEL=debug
//!     PARLOR_CATALOG_DIR=/srv/parlor/formats
//!     PARLOR_CATALOG_RESERVED_COMMANDS=start,end,join
//!     PARLOR_LOBBY_RNG_SEED=42
//!     PARLOR_HOST_COMMAND_PREFIX=!
//! ```

mod defaults;
mod loader;
mod structs;

use std::path::PathBuf;

pub use defaults::*;
pub use loader::{
    apply_env_overrides, load_config, load_from_path, try_load_from_path, CONFIG_SEARCH_PATHS,
};
pub use structs::*;

/// Errors reading or checking a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl CentralConfig {
    /// Check the values the host cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.common.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid {
                key: "common.log_level",
                reason: format!(
                    "'{}' is not one of {}",
                    self.common.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        if self.host.command_prefix.is_empty()
            || self.host.command_prefix.chars().any(char::is_whitespace)
        {
            return Err(ConfigError::Invalid {
                key: "host.command_prefix",
                reason: "must be non-empty and contain no whitespace".into(),
            });
        }
        if self.host.channel.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "host.channel",
                reason: "must not be empty".into(),
            });
        }
        if self.host.user.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "host.user",
                reason: "must not be empty".into(),
            });
        }
        if let Some(bad) = self
            .catalog
            .reserved_commands
            .iter()
            .find(|c| c.is_empty() || !c.chars().all(|ch| ch.is_ascii_alphanumeric()))
        {
            return Err(ConfigError::Invalid {
                key: "catalog.reserved_commands",
                reason: format!("'{bad}' is not a plain command name"),
            });
        }
        Ok(())
    }

    /// Directory of extra format definitions.
    pub fn catalog_dir(&self) -> PathBuf {
        PathBuf::from(&self.catalog.dir)
    }
}
