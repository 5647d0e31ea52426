// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `coffer keys` command implementation.
//!
//! Output never includes key material, only ids, status and timestamps.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use coffer_config::model::CofferConfig;
use coffer_config::validation::MAX_WINDOW_DAYS;
use coffer_core::{CofferError, JwtKeyVersion, KeyStatus};
use coffer_signing::SigningKeyRegistry;
use serde::Serialize;

#[derive(Subcommand, Debug)]
pub enum KeysCommand {
    /// Show the Active signing key.
    Current,
    /// List stored keys, newest first.
    List {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Issue a new Active key and move the old one to verify-only.
    Rotate {
        /// Days the superseded key keeps validating tokens.
        #[arg(
            long,
            default_value_t = 7,
            value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_WINDOW_DAYS))
        )]
        transition_days: u32,
    },
    /// Revoke a key immediately.
    Revoke {
        /// Key id, e.g. `v3`.
        key_id: String,
    },
    /// Expire finished verify-only keys and purge old expired keys.
    Cleanup,
    /// Report whether a scheduled rotation is due.
    ShouldRotate {
        /// Rotation interval in days. Defaults to `signing.rotation_days`.
        #[arg(
            long,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS))
        )]
        days: Option<u32>,
    },
}

/// Key metadata safe to print.
#[derive(Debug, Serialize)]
pub struct KeySummary {
    pub id: String,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&JwtKeyVersion> for KeySummary {
    fn from(key: &JwtKeyVersion) -> Self {
        Self {
            id: key.id.clone(),
            status: key.status,
            created_at: key.created_at,
            expires_at: key.expires_at,
        }
    }
}

/// Run a `coffer keys` subcommand.
pub fn run_keys(config: &CofferConfig, command: KeysCommand) -> Result<(), CofferError> {
    let registry = SigningKeyRegistry::from_config(&config.signing);
    print!("{}", execute(&registry, config.signing.rotation_days, command)?);
    Ok(())
}

fn execute(
    registry: &SigningKeyRegistry,
    rotation_days: u32,
    command: KeysCommand,
) -> Result<String, CofferError> {
    Ok(match command {
        KeysCommand::Current => format_row(&KeySummary::from(&registry.get_current_key()?)),
        KeysCommand::List { json } => {
            let keys: Vec<KeySummary> = registry.list_keys()?.iter().map(KeySummary::from).collect();
            if json {
                let mut out = serde_json::to_string_pretty(&keys)
                    .map_err(|e| CofferError::Internal(format!("failed to encode key list: {e}")))?;
                out.push('\n');
                out
            } else {
                keys.iter().map(format_row).collect()
            }
        }
        KeysCommand::Rotate { transition_days } => {
            let key = registry.rotate_key(transition_days)?;
            format!("rotated: {} is now active\n", key.id)
        }
        KeysCommand::Revoke { key_id } => {
            registry.revoke_key(&key_id)?;
            format!("revoked: {key_id}\n")
        }
        KeysCommand::Cleanup => {
            let report = registry.cleanup_expired_keys()?;
            format!("expired: {}, purged: {}\n", report.expired, report.purged)
        }
        KeysCommand::ShouldRotate { days } => {
            let due = registry.should_rotate(days.unwrap_or(rotation_days))?;
            format!("{}\n", if due { "yes" } else { "no" })
        }
    })
}

fn format_row(key: &KeySummary) -> String {
    let expires = key
        .expires_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<8} {:<12} created {}  expires {}\n",
        key.id,
        key.status.to_string(),
        key.created_at.to_rfc3339(),
        expires
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use coffer_signing::{InMemoryKeyStoreRepository, RegistryOptions};

    fn registry() -> SigningKeyRegistry {
        SigningKeyRegistry::new(
            Arc::new(InMemoryKeyStoreRepository::default()),
            RegistryOptions::default(),
        )
    }

    #[test]
    fn rotate_then_list() {
        let registry = registry();
        assert_eq!(
            execute(&registry, 30, KeysCommand::ShouldRotate { days: None }).unwrap(),
            "yes\n"
        );
        assert!(execute(&registry, 30, KeysCommand::Current).unwrap().starts_with("v1 "));
        assert_eq!(
            execute(&registry, 30, KeysCommand::Rotate { transition_days: 7 }).unwrap(),
            "rotated: v2 is now active\n"
        );

        let table = execute(&registry, 30, KeysCommand::List { json: false }).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("v2 "));
        assert!(lines[1].contains("VerifyOnly"));
    }

    #[test]
    fn json_list_omits_key_material() {
        let registry = registry();
        let secret = registry.get_current_key().unwrap().key;
        let json = execute(&registry, 30, KeysCommand::List { json: true }).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["id"], "v1");
        assert!(!json.contains(&secret));
    }

    #[test]
    fn revoking_unknown_key_fails() {
        let registry = registry();
        registry.get_current_key().unwrap();
        let err = execute(
            &registry,
            30,
            KeysCommand::Revoke {
                key_id: "v99".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CofferError::KeyNotFound { .. }));
    }
}
