// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! All violations are collected; validation does not fail fast.

use base64::Engine;

use crate::diagnostic::ConfigError;
use crate::model::CofferConfig;

/// Argon2id memory floor in KiB.
pub const MIN_KDF_MEMORY_KIB: u32 = 8;

/// Argon2id memory ceiling in KiB (4 GiB). Bounds worst-case unlock latency.
pub const MAX_KDF_MEMORY_KIB: u32 = 4 * 1024 * 1024;

/// Minimum static signing key length in bytes.
pub const MIN_STATIC_KEY_BYTES: usize = 32;

/// Longest permitted read-cache lifetime.
pub const MAX_CACHE_TTL_SECS: u64 = 3600;

/// Longest rotation, transition or retention window in days.
pub const MAX_WINDOW_DAYS: u32 = 3650;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &CofferConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        fail(format!(
            "logging.level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.logging.level
        ));
    }

    let vault = &config.vault;
    if vault.database_path.trim().is_empty() {
        fail("vault.database_path must not be empty".to_string());
    }
    if vault.kdf_iterations < 1 {
        fail(format!(
            "vault.kdf_iterations must be at least 1, got {}",
            vault.kdf_iterations
        ));
    }
    if !(MIN_KDF_MEMORY_KIB..=MAX_KDF_MEMORY_KIB).contains(&vault.kdf_memory_kib) {
        fail(format!(
            "vault.kdf_memory_kib must be between {MIN_KDF_MEMORY_KIB} and {MAX_KDF_MEMORY_KIB}, got {}",
            vault.kdf_memory_kib
        ));
    }
    if vault.kdf_parallelism < 1 {
        fail(format!(
            "vault.kdf_parallelism must be at least 1, got {}",
            vault.kdf_parallelism
        ));
    }

    let signing = &config.signing;
    if signing.store_path.trim().is_empty() {
        fail("signing.store_path must not be empty".to_string());
    }
    for (name, value, min) in [
        ("rotation_days", signing.rotation_days, 1),
        ("transition_days", signing.transition_days, 0),
        ("retention_days", signing.retention_days, 1),
    ] {
        if !(min..=MAX_WINDOW_DAYS).contains(&value) {
            fail(format!(
                "signing.{name} must be between {min} and {MAX_WINDOW_DAYS}, got {value}"
            ));
        }
    }
    if signing.cache_ttl_secs > MAX_CACHE_TTL_SECS {
        fail(format!(
            "signing.cache_ttl_secs must be at most {MAX_CACHE_TTL_SECS}, got {}",
            signing.cache_ttl_secs
        ));
    }
    if let Some(key) = &signing.static_key
        && static_key_len(key) < MIN_STATIC_KEY_BYTES
    {
        // Never echo the key itself.
        fail(format!(
            "signing.static_key must be at least {MIN_STATIC_KEY_BYTES} bytes"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Length of the static key: decoded length if it is base64, raw length otherwise.
fn static_key_len(key: &str) -> usize {
    base64::engine::general_purpose::STANDARD
        .decode(key)
        .map(|bytes| bytes.len())
        .unwrap_or(key.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &CofferConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CofferConfig::default()).is_ok());
    }

    #[test]
    fn kdf_bounds_are_enforced() {
        let mut config = CofferConfig::default();
        config.vault.kdf_iterations = 0;
        config.vault.kdf_memory_kib = 4;
        config.vault.kdf_parallelism = 0;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 3, "all violations reported: {msgs:?}");
        assert!(msgs.iter().any(|m| m.contains("kdf_memory_kib")));
    }

    #[test]
    fn oversized_memory_cost_is_rejected() {
        let mut config = CofferConfig::default();
        config.vault.kdf_memory_kib = MAX_KDF_MEMORY_KIB + 1;
        assert!(messages(&config)[0].contains("kdf_memory_kib"));
    }

    #[test]
    fn day_windows_are_bounded() {
        let mut config = CofferConfig::default();
        config.signing.rotation_days = 0;
        config.signing.transition_days = MAX_WINDOW_DAYS + 1;
        config.signing.retention_days = u32::MAX;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 3, "all violations reported: {msgs:?}");
        assert!(msgs.iter().any(|m| m.contains("signing.transition_days")));
        assert!(msgs.iter().any(|m| m.contains("4294967295")));

        config.signing.rotation_days = MAX_WINDOW_DAYS;
        config.signing.transition_days = 0;
        config.signing.retention_days = MAX_WINDOW_DAYS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn short_static_key_is_rejected_without_echo() {
        let mut config = CofferConfig::default();
        config.signing.static_key = Some("tooshort".to_string());
        let msgs = messages(&config);
        assert!(msgs[0].contains("static_key"));
        assert!(!msgs[0].contains("tooshort"));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut config = CofferConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(messages(&config)[0].contains("logging.level"));
    }
}
