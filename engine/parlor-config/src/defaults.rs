//! Default configuration values loaded from config.defaults.toml.
//!
//! The file is embedded at compile time, so a binary built from this crate
//! always carries the same defaults as the checked-in file.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    catalog: CatalogDefaults,
    lobby: LobbyDefaults,
    host: HostDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    data_dir: String,
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct CatalogDefaults {
    dir: String,
    reserved_commands: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LobbyDefaults {
    signup_announcement: String,
    #[serde(default)]
    rng_seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct HostDefaults {
    command_prefix: String,
    user: String,
    channel: String,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn data_dir() -> &'static str {
    &DEFAULTS.common.data_dir
}
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// Catalog
pub fn catalog_dir() -> &'static str {
    &DEFAULTS.catalog.dir
}
pub fn reserved_commands() -> &'static [String] {
    &DEFAULTS.catalog.reserved_commands
}

// Lobby
pub fn signup_announcement() -> &'static str {
    &DEFAULTS.lobby.signup_announcement
}
pub fn rng_seed() -> Option<u64> {
    DEFAULTS.lobby.rng_seed
}

// Host
pub fn command_prefix() -> &'static str {
    &DEFAULTS.host.command_prefix
}
pub fn user() -> &'static str {
    &DEFAULTS.host.user
}
pub fn channel() -> &'static str {
    &DEFAULTS.host.channel
}
