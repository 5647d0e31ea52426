// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `coffer vault` command implementation.

use clap::Subcommand;
use coffer_config::model::CofferConfig;
use coffer_core::{CofferError, KeySlotRepository};
use coffer_vault::prompt::{MASTER_PASSWORD_ENV_VAR, NEW_MASTER_PASSWORD_ENV_VAR};
use coffer_vault::{KdfParams, VaultManager, VaultStore};
use secrecy::SecretString;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum VaultCommand {
    /// Create the vault key and protect it with a new master password.
    Init,
    /// Check the master password against the stored key slot.
    Unlock,
    /// Re-wrap the vault key under a new master password.
    ChangePassword,
    /// Show whether the vault exists and which KDF cost protects it.
    Status,
}

/// Run a `coffer vault` subcommand.
///
/// Passwords come from `COFFER_MASTER_PASSWORD` / `COFFER_NEW_MASTER_PASSWORD`
/// or an interactive prompt.
pub fn run_vault(config: &CofferConfig, command: VaultCommand) -> Result<(), CofferError> {
    let store = VaultStore::open(&config.vault.database_path)?;
    let manager = VaultManager::new(KdfParams::from(&config.vault))?;

    match command {
        VaultCommand::Init => {
            let password = coffer_vault::get_new_master_password(MASTER_PASSWORD_ENV_VAR)?;
            init(&manager, &store, &password)?;
            println!("vault initialized at {}", config.vault.database_path);
        }
        VaultCommand::Unlock => {
            let password = coffer_vault::get_master_password()?;
            unlock(&manager, &store, &password)?;
            println!("master password accepted");
        }
        VaultCommand::ChangePassword => {
            let old = coffer_vault::get_master_password()?;
            let new = coffer_vault::get_new_master_password(NEW_MASTER_PASSWORD_ENV_VAR)?;
            change_password(&manager, &store, &old, &new)?;
            println!("master password changed");
        }
        VaultCommand::Status => print!("{}", status(&store)?),
    }
    Ok(())
}

fn init(
    manager: &VaultManager,
    repo: &dyn KeySlotRepository,
    password: &SecretString,
) -> Result<(), CofferError> {
    let slot = manager.initialize_slot(repo, password)?;
    info!(
        iterations = slot.iterations,
        memory_kib = slot.memory_kib,
        parallelism = slot.parallelism,
        "vault initialized"
    );
    Ok(())
}

fn unlock(
    manager: &VaultManager,
    repo: &dyn KeySlotRepository,
    password: &SecretString,
) -> Result<(), CofferError> {
    let _key = manager.unlock_slot(repo, password)?;
    manager.lock();
    info!("vault unlocked");
    Ok(())
}

fn change_password(
    manager: &VaultManager,
    repo: &dyn KeySlotRepository,
    old: &SecretString,
    new: &SecretString,
) -> Result<(), CofferError> {
    let slot = manager.change_slot_password(repo, old, new)?;
    info!(version = slot.version, "master password changed");
    Ok(())
}

fn status(repo: &dyn KeySlotRepository) -> Result<String, CofferError> {
    Ok(match repo.load()? {
        None => "vault: not initialized\n".to_string(),
        Some(slot) => format!(
            "vault: initialized\n  created:  {}\n  updated:  {}\n  argon2id: t={} m={}KiB p={}\n",
            slot.created_at.to_rfc3339(),
            slot.updated_at.to_rfc3339(),
            slot.iterations,
            slot.memory_kib,
            slot.parallelism,
        ),
    })
}
