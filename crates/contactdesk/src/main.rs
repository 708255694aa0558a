// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! contactdesk - multi-channel contact-center backend.
//!
//! This is the binary entry point: it loads configuration and dispatches to
//! the `serve`, `cleanup` and `config` subcommands.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod cleanup;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use contactdesk_config::{ConfigError, DeskConfig};

/// contactdesk - multi-channel contact-center backend.
#[derive(Parser, Debug)]
#[command(name = "contactdesk", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API, realtime feed and webhook receivers.
    Serve,
    /// Delete conversations with missing or epoch-zero timestamps.
    Cleanup {
        /// Report what would be removed without deleting anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate and print the effective configuration (secrets redacted).
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<DeskConfig, Vec<ConfigError>> {
    match path {
        Some(path) => contactdesk_config::load_and_validate_path(path),
        None => contactdesk_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            contactdesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Cleanup { dry_run }) => {
            if let Err(e) = cleanup::run_cleanup(&config, dry_run).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config.redacted()) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("error: failed to render configuration: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("contactdesk: use --help for available commands");
        }
    }
}
