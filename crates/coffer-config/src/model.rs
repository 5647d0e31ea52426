// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is a
//! startup error rather than a silently ignored setting.

use serde::{Deserialize, Serialize};

/// Top-level Coffer configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CofferConfig {
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Master-password vault settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Token signing-key rotation settings.
    #[serde(default)]
    pub signing: SigningConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level for coffer's own targets (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Vault key-slot and KDF configuration.
///
/// The KDF parameters apply to newly written key slots only; existing slots
/// keep the parameters they were created with.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Path to the SQLite database holding the key slot.
    #[serde(default = "default_vault_database_path")]
    pub database_path: String,

    /// Argon2id iteration count (default: 4).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_kdf_memory_kib")]
    pub kdf_memory_kib: u32,

    /// Argon2id parallelism lanes (default: 2).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            database_path: default_vault_database_path(),
            kdf_iterations: default_kdf_iterations(),
            kdf_memory_kib: default_kdf_memory_kib(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

fn data_file(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("coffer").join(name))
        .unwrap_or_else(|| std::path::PathBuf::from(name))
        .display()
        .to_string()
}

fn default_vault_database_path() -> String {
    data_file("coffer.db")
}

fn default_kdf_iterations() -> u32 {
    4
}

fn default_kdf_memory_kib() -> u32 {
    65536
}

fn default_kdf_parallelism() -> u32 {
    2
}

/// Signing-key rotation configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SigningConfig {
    /// Path to the JSON rotation store.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Rotate once the last rotation is older than this many days.
    #[serde(default = "default_rotation_days")]
    pub rotation_days: u32,

    /// Days a superseded key keeps validating tokens.
    #[serde(default = "default_transition_days")]
    pub transition_days: u32,

    /// Days an expired key is retained before being purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Lifetime of the in-process read cache, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Operator-supplied signing secret. When set, rotation is disabled and
    /// this single key is used for both signing and validation.
    #[serde(default)]
    pub static_key: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            rotation_days: default_rotation_days(),
            transition_days: default_transition_days(),
            retention_days: default_retention_days(),
            cache_ttl_secs: default_cache_ttl_secs(),
            static_key: None,
        }
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("store_path", &self.store_path)
            .field("rotation_days", &self.rotation_days)
            .field("transition_days", &self.transition_days)
            .field("retention_days", &self.retention_days)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("static_key", &self.static_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn default_store_path() -> String {
    data_file("signing-keys.json")
}

fn default_rotation_days() -> u32 {
    30
}

fn default_transition_days() -> u32 {
    7
}

fn default_retention_days() -> u32 {
    30
}

fn default_cache_ttl_secs() -> u64 {
    300
}
