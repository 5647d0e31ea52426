// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted record types shared across the vault and the signing-key registry.
//!
//! The serialized field names are a stable schema: other components read
//! these records across restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The singleton envelope that protects the VaultKey.
///
/// Exactly one slot exists per installation. It is created on first
/// initialization and only ever replaced by a master-password change.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySlot {
    /// The VaultKey encrypted under the password-derived KEK.
    pub encrypted_vault_key: Vec<u8>,
    /// AES-GCM nonce used to wrap the VaultKey.
    pub iv: [u8; 12],
    /// AES-GCM authentication tag.
    pub tag: [u8; 16],
    /// Argon2id salt (at least 8 bytes, nominally 16).
    pub salt: Vec<u8>,
    /// Argon2id time cost.
    pub iterations: u32,
    /// Argon2id memory cost in KiB.
    #[serde(rename = "memoryKB")]
    pub memory_kib: u32,
    /// Argon2id lanes.
    pub parallelism: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Monotonic write counter used for optimistic concurrency.
    #[serde(default)]
    pub version: u64,
}

impl std::fmt::Debug for KeySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySlot")
            .field("iterations", &self.iterations)
            .field("memory_kib", &self.memory_kib)
            .field("parallelism", &self.parallelism)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Lifecycle state of a signing-key version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum KeyStatus {
    /// The single key used to mint new tokens.
    Active,
    /// Superseded key that still validates tokens until `expires_at`.
    VerifyOnly,
    /// Past its transition window; retained only until cleanup.
    Expired,
    /// Withdrawn from service immediately.
    Revoked,
}

/// One version of the token-signing secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtKeyVersion {
    /// Monotonic `v{n}` identifier.
    pub id: String,
    /// Base64-encoded secret material.
    pub key: String,
    pub created_at: DateTime<Utc>,
    /// `None` while the key is active.
    pub expires_at: Option<DateTime<Utc>>,
    pub status: KeyStatus,
}

impl JwtKeyVersion {
    /// Numeric part of a `v{n}` id, if the id has that shape.
    pub fn version_number(&self) -> Option<u64> {
        parse_version_id(&self.id)
    }

    /// Whether tokens signed with this key should still be accepted at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, KeyStatus::Active | KeyStatus::VerifyOnly)
            && self.expires_at.is_none_or(|expires| expires > now)
    }
}

impl std::fmt::Debug for JwtKeyVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeyVersion")
            .field("id", &self.id)
            .field("key", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("status", &self.status)
            .finish()
    }
}

/// The persisted rotation store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtKeyStore {
    /// Id of the single Active key. Empty for a fresh store.
    #[serde(default)]
    pub current_key_id: String,
    /// Key versions, unique by id, in insertion order.
    #[serde(default)]
    pub keys: Vec<JwtKeyVersion>,
    #[serde(default)]
    pub last_rotation_at: Option<DateTime<Utc>>,
}

impl JwtKeyStore {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&JwtKeyVersion> {
        self.keys.iter().find(|k| k.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut JwtKeyVersion> {
        self.keys.iter_mut().find(|k| k.id == id)
    }

    /// The key named by `current_key_id`, provided it is Active.
    pub fn current(&self) -> Option<&JwtKeyVersion> {
        self.find(&self.current_key_id)
            .filter(|k| k.status == KeyStatus::Active)
    }

    /// Id for the next version: `v{max(existing)+1}`, starting at `v1`.
    pub fn next_key_id(&self) -> String {
        let max = self
            .keys
            .iter()
            .filter_map(JwtKeyVersion::version_number)
            .max()
            .unwrap_or(0);
        format!("v{}", max + 1)
    }
}

/// Parse the numeric part of a `v{n}` id.
pub fn parse_version_id(id: &str) -> Option<u64> {
    id.strip_prefix('v')?.parse().ok()
}
