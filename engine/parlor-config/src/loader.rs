//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::{CentralConfig, ConfigError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",      // Current directory
    "../config.toml",   // Parent directory (when running from subdirectory)
    "/app/config.toml", // Container
];

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by PARLOR_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
/// 4. Container path (/app/config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    // Check for explicit config path
    if let Ok(path) = std::env::var("PARLOR_CONFIG") {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from PARLOR_CONFIG: {}", path.display());
            return load_from_path(&path);
        }
        warn!(
            "PARLOR_CONFIG={} not found, searching defaults",
            path.display()
        );
    }

    // Search default locations
    for path_str in CONFIG_SEARCH_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(&path);
        }
    }

    // Fall back to defaults
    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path, falling back to defaults when
/// the file cannot be read or parsed.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match try_load_from_path(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}, using defaults", e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Load configuration from a specific path, reporting read and parse errors.
pub fn try_load_from_path(path: &Path) -> Result<CentralConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(apply_env_overrides(config))
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Comma-separated list field
    ($config:expr, $section:ident . $field:ident, $key:expr, list) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    };
    // Optional parseable field (Option<u64>, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, optional_parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$section.$field = Some(v);
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: PARLOR_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.data_dir, "PARLOR_COMMON_DATA_DIR");
    env_override!(config, common.log_level, "PARLOR_COMMON_LOG_LEVEL");

    // Catalog
    env_override!(config, catalog.dir, "PARLOR_CATALOG_DIR");
    env_override!(
        config,
        catalog.reserved_commands,
        "PARLOR_CATALOG_RESERVED_COMMANDS",
        list
    );

    // Lobby
    env_override!(
        config,
        lobby.signup_announcement,
        "PARLOR_LOBBY_SIGNUP_ANNOUNCEMENT"
    );
    env_override!(
        config,
        lobby.rng_seed,
        "PARLOR_LOBBY_RNG_SEED",
        optional_parse
    );

    // Host
    env_override!(config, host.command_prefix, "PARLOR_HOST_COMMAND_PREFIX");
    env_override!(config, host.user, "PARLOR_HOST_USER");
    env_override!(config, host.channel, "PARLOR_HOST_CHANNEL");

    config
}
