//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// These call the accessor functions from defaults module
// ============================================================================

fn d_data_dir() -> String {
    defaults::data_dir().into()
}
fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_catalog_dir() -> String {
    defaults::catalog_dir().into()
}
fn d_reserved_commands() -> Vec<String> {
    defaults::reserved_commands().to_vec()
}
fn d_signup_announcement() -> String {
    defaults::signup_announcement().into()
}
fn d_rng_seed() -> Option<u64> {
    defaults::rng_seed()
}
fn d_command_prefix() -> String {
    defaults::command_prefix().into()
}
fn d_user() -> String {
    defaults::user().into()
}
fn d_channel() -> String {
    defaults::channel().into()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub lobby: LobbyConfig,
    #[serde(default)]
    pub host: HostConfig,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_data_dir")]
    pub data_dir: String,
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir().into(),
            log_level: defaults::log_level().into(),
        }
    }
}

/// Where format definitions come from
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory of `*.toml` format definitions
    #[serde(default = "d_catalog_dir")]
    pub dir: String,
    /// Host commands that no game may declare
    #[serde(default = "d_reserved_commands")]
    pub reserved_commands: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dir: defaults::catalog_dir().into(),
            reserved_commands: defaults::reserved_commands().to_vec(),
        }
    }
}

/// Session factory settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LobbyConfig {
    #[serde(default = "d_signup_announcement")]
    pub signup_announcement: String,
    /// Fixed RNG seed for reproducible sessions (None = from entropy)
    #[serde(default = "d_rng_seed")]
    pub rng_seed: Option<u64>,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            signup_announcement: defaults::signup_announcement().into(),
            rng_seed: defaults::rng_seed(),
        }
    }
}

/// Console host settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    #[serde(default = "d_command_prefix")]
    pub command_prefix: String,
    /// Speaker for lines without a `user:` part
    #[serde(default = "d_user")]
    pub user: String,
    /// Channel for lines without a `#channel` part
    #[serde(default = "d_channel")]
    pub channel: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            command_prefix: defaults::command_prefix().into(),
            user: defaults::user().into(),
            channel: defaults::channel().into(),
        }
    }
}
