//! Parlor - console host for chat games
//!
//! A long-running process that:
//! 1. Loads the built-in games plus the format files in the catalog directory
//! 2. Reads chat lines from stdin and routes commands to the lobby
//! 3. Feeds timer expiries back into the sessions that armed them

use anyhow::{Context, Result};
use clap::Parser;
use parlor_core::{Lobby, MemoryLedger, Services};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info};

mod commands;
mod config;
mod console;
mod timers;

use crate::commands::Host;
use crate::config::Config;
use crate::console::Console;
use crate::timers::TokioScheduler;

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Validate configuration
    config.validate()?;

    // Initialize tracing
    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");

    let reserved = config.reserved_commands();
    let reserved: Vec<&str> = reserved.iter().map(String::as_str).collect();
    let registry = parlor_games::load_registry(&config.catalog_dir(), &reserved)
        .context("Failed to load the game catalog")?;

    let console = Console::stdout();
    let (scheduler, mut expired) = TokioScheduler::new();
    let services = Services::new(
        Box::new(console.clone()),
        Box::new(MemoryLedger::default()),
        Box::new(scheduler),
    );
    let lobby = Lobby::new(Arc::new(registry), services, config.lobby_options());
    let mut host = Host::new(
        lobby,
        console,
        config.command_prefix.clone(),
        config.user.clone(),
        config.channel.clone(),
    );

    info!(
        channel = %config.channel,
        user = %config.user,
        prefix = %config.command_prefix,
        "Host ready, reading stdin"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => host.handle_line(&line),
                Ok(None) => {
                    info!("End of input, shutting down");
                    break;
                }
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    return Err(e.into());
                }
            },
            Some((channel, token)) = expired.recv() => host.fire_timer(&channel, token),
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received, stopping host...");
                break;
            }
        }
    }

    Ok(())
}
