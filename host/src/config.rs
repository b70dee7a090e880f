//! Configuration for the console host
//!
//! Configuration is loaded from config.toml with environment variable overrides.
//! CLI arguments take highest priority, followed by env vars, then config.toml.

use anyhow::{anyhow, Result};
use clap::Parser;
use once_cell::sync::Lazy;
use parlor_config::{load_config, CentralConfig};
use parlor_core::LobbyOptions;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

// Default value functions that read from central config
fn default_log_level() -> String {
    CENTRAL_CONFIG.common.log_level.clone()
}

fn default_catalog_dir() -> String {
    CENTRAL_CONFIG.catalog.dir.clone()
}

fn default_reserved_commands() -> String {
    CENTRAL_CONFIG.catalog.reserved_commands.join(",")
}

fn default_signup_announcement() -> String {
    CENTRAL_CONFIG.lobby.signup_announcement.clone()
}

fn default_command_prefix() -> String {
    CENTRAL_CONFIG.host.command_prefix.clone()
}

fn default_user() -> String {
    CENTRAL_CONFIG.host.user.clone()
}

fn default_channel() -> String {
    CENTRAL_CONFIG.host.channel.clone()
}

#[derive(Parser, Debug, Clone)]
#[command(name = "parlor")]
#[command(about = "Parlor - chat game host on the console")]
#[command(
    long_about = "Reads chat lines from stdin and plays the built-in and catalog games.

Lines look like `#channel user: text`, `@user: text` for a direct message,
or plain `text` for the default user and channel.

Configuration is loaded from config.toml with environment variable overrides.
CLI arguments take highest priority."
)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    pub log_level: String,

    /// Directory of extra format definitions (*.toml)
    #[arg(long, default_value_t = default_catalog_dir())]
    pub catalog_dir: String,

    /// Comma-separated host commands no game may declare
    #[arg(long, default_value_t = default_reserved_commands())]
    pub reserved_commands: String,

    /// Signup announcement; {name} and {join} are filled in
    #[arg(long, default_value_t = default_signup_announcement())]
    pub signup_announcement: String,

    /// Fixed RNG seed for reproducible games
    #[arg(long, env = "PARLOR_LOBBY_RNG_SEED")]
    pub rng_seed: Option<u64>,

    /// Prefix that marks a line as a command
    #[arg(long, default_value_t = default_command_prefix())]
    pub command_prefix: String,

    /// Speaker for lines without a `user:` part
    #[arg(long, default_value_t = default_user())]
    pub user: String,

    /// Channel for lines without a `#channel` part
    #[arg(long, default_value_t = default_channel())]
    pub channel: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        CENTRAL_CONFIG.validate()?;

        if self.command_prefix.is_empty() || self.command_prefix.contains(char::is_whitespace) {
            return Err(anyhow!(
                "command_prefix must be non-empty and contain no whitespace"
            ));
        }

        if self.user.trim().is_empty() {
            return Err(anyhow!("user cannot be empty"));
        }

        if self.channel.trim().is_empty() {
            return Err(anyhow!("channel cannot be empty"));
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        Ok(())
    }

    pub fn catalog_dir(&self) -> PathBuf {
        PathBuf::from(&self.catalog_dir)
    }

    pub fn reserved_commands(&self) -> Vec<String> {
        self.reserved_commands
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed.or(CENTRAL_CONFIG.lobby.rng_seed)
    }

    pub fn lobby_options(&self) -> LobbyOptions {
        LobbyOptions {
            command_prefix: self.command_prefix.clone(),
            signup_announcement: self.signup_announcement.clone(),
            rng_seed: self.rng_seed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            log_level: "info".into(),
            catalog_dir: "./data/formats".into(),
            reserved_commands: "start, end,join,,".into(),
            signup_announcement: "Join {name} with {join}".into(),
            rng_seed: Some(5),
            command_prefix: "!".into(),
            user: "player".into(),
            channel: "lobby".into(),
        }
    }

    #[test]
    fn validate_accepts_valid_configuration() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_prefix() {
        let mut cfg = base_config();
        cfg.command_prefix = " ".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("command_prefix"));
    }

    #[test]
    fn validate_rejects_empty_channel() {
        let mut cfg = base_config();
        cfg.channel.clear();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("channel"));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut cfg = base_config();
        cfg.log_level = "nope".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("invalid log level"));
    }

    #[test]
    fn reserved_commands_are_split_and_trimmed() {
        assert_eq!(base_config().reserved_commands(), vec!["start", "end", "join"]);
    }

    #[test]
    fn lobby_options_carry_host_settings() {
        let options = base_config().lobby_options();
        assert_eq!(options.command_prefix, "!");
        assert_eq!(options.signup_announcement, "Join {name} with {join}");
        assert_eq!(options.rng_seed, Some(5));
    }
}
