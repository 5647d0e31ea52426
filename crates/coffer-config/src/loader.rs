// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-based configuration loading.
//!
//! Merge order (later overrides earlier): compiled defaults,
//! `/etc/coffer/coffer.toml`, `~/.config/coffer/coffer.toml`, `./coffer.toml`,
//! then `COFFER_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CofferConfig;

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<CofferConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CofferConfig::default()))
        .merge(Toml::file("/etc/coffer/coffer.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("coffer/coffer.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("coffer.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string over the defaults. No env overrides.
pub fn load_config_from_str(toml_content: &str) -> Result<CofferConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CofferConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CofferConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CofferConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Map `COFFER_SECTION_FIELD` to `section.field`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `COFFER_SIGNING_STATIC_KEY` lands on `signing.static_key`.
fn env_provider() -> Env {
    Env::prefixed("COFFER_")
        .ignore(&["MASTER_PASSWORD", "NEW_MASTER_PASSWORD"])
        .map(|key| {
            key.as_str()
                .replacen("logging_", "logging.", 1)
                .replacen("vault_", "vault.", 1)
                .replacen("signing_", "signing.", 1)
                .into()
        })
}
