// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Taskwarden - a Telegram bot for tracking team tasks.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod hash_password;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use taskwarden_config::TaskwardenConfig;

/// Taskwarden - a Telegram bot for tracking team tasks.
#[derive(Parser, Debug)]
#[command(name = "taskwarden", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot (default).
    Serve,
    /// Hash a role password for the `[auth]` section.
    HashPassword,
}

fn load_config(path: Option<&std::path::Path>) -> TaskwardenConfig {
    let loaded = match path {
        Some(path) => taskwarden_config::load_and_validate_path(path),
        None => taskwarden_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            taskwarden_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::HashPassword => hash_password::run_hash_password(&config.auth),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
