// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coffer - password-protected vault key and token signing-key management.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod keys;
mod vault;

use clap::{Parser, Subcommand};
use coffer_core::{CofferError, ErrorClass};

/// Coffer - vault key and signing-key management.
#[derive(Parser, Debug)]
#[command(name = "coffer", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the password-protected vault key.
    Vault {
        #[command(subcommand)]
        action: vault::VaultCommand,
    },
    /// Manage token signing keys.
    Keys {
        #[command(subcommand)]
        action: keys::KeysCommand,
    },
    /// Inspect Coffer configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration, then report the effective paths.
    Check,
}

fn main() {
    let cli = Cli::parse();

    let config = match coffer_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            coffer_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let result = match cli.command {
        Commands::Vault { action } => vault::run_vault(&config, action),
        Commands::Keys { action } => keys::run_keys(&config, action),
        Commands::Config {
            action: ConfigCommand::Check,
        } => {
            println!("configuration OK");
            println!("  vault database:    {}", config.vault.database_path);
            println!("  signing key store: {}", config.signing.store_path);
            if config.signing.static_key.is_some() {
                println!("  static signing key configured; rotation disabled");
            }
            Ok(())
        }
    };

    if let Err(err) = result {
        tracing::debug!(error = %err, "command failed");
        eprintln!("coffer: {}", user_message(&err));
        std::process::exit(1);
    }
}

/// Text shown to the operator for a failed command.
///
/// Password and internal failures only ever show the generic message. Request
/// errors carry operator-supplied detail that is safe to repeat.
fn user_message(err: &CofferError) -> String {
    match err.class() {
        ErrorClass::InvalidRequest | ErrorClass::NotFound => {
            format!("{}: {err}", err.public_message())
        }
        _ => err.public_message().to_string(),
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("coffer={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
