// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Envelope encryption of the VaultKey.
//!
//! - A random 32-byte VaultKey protects stored secrets and is never regenerated.
//! - The VaultKey is wrapped with AES-256-GCM under a KEK derived from the
//!   master password via Argon2id. Only the wrapped form (the [`Envelope`]) is
//!   persisted.
//! - Changing the master password re-wraps the same VaultKey under a new salt
//!   and KEK; data encrypted under the VaultKey stays valid.
//!
//! [`VaultManager`] keeps no state between calls. The caller owns every
//! [`VaultKey`] it receives; the key is zeroed when dropped.

use chrono::{DateTime, Utc};
use coffer_core::{CofferError, KeySlot, KeySlotRepository};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto;
use crate::kdf::{self, KdfParams};

/// Single message for every unlock failure: a wrong password and a corrupted
/// envelope must be indistinguishable to the caller.
const UNLOCK_FAILED: &str = "invalid master password or corrupted vault data";

/// The 32-byte data-encryption key, zeroed on drop.
pub struct VaultKey(Zeroizing<[u8; 32]>);

impl VaultKey {
    pub fn expose(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey([REDACTED])")
    }
}

/// The persisted, password-wrapped form of the VaultKey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub encrypted_vault_key: Vec<u8>,
    pub iv: [u8; crypto::NONCE_LEN],
    pub tag: [u8; crypto::TAG_LEN],
    pub salt: Vec<u8>,
    pub iterations: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl Envelope {
    /// The KDF cost parameters this envelope was sealed with.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            iterations: self.iterations,
            memory_kib: self.memory_kib,
            parallelism: self.parallelism,
        }
    }

    /// Build a fresh key-slot record (version 0, not yet persisted).
    pub fn to_key_slot(&self, now: DateTime<Utc>) -> KeySlot {
        KeySlot {
            encrypted_vault_key: self.encrypted_vault_key.clone(),
            iv: self.iv,
            tag: self.tag,
            salt: self.salt.clone(),
            iterations: self.iterations,
            memory_kib: self.memory_kib,
            parallelism: self.parallelism,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

impl From<&KeySlot> for Envelope {
    fn from(slot: &KeySlot) -> Self {
        Self {
            encrypted_vault_key: slot.encrypted_vault_key.clone(),
            iv: slot.iv,
            tag: slot.tag,
            salt: slot.salt.clone(),
            iterations: slot.iterations,
            memory_kib: slot.memory_kib,
            parallelism: slot.parallelism,
        }
    }
}

/// Initializes, unlocks and re-wraps the VaultKey envelope.
#[derive(Debug, Clone, Default)]
pub struct VaultManager {
    params: KdfParams,
}

impl VaultManager {
    /// Create a manager that seals new envelopes with `params`.
    pub fn new(params: KdfParams) -> Result<Self, CofferError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Cost parameters used for newly sealed envelopes.
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Generate a VaultKey and seal it under `master_password`.
    ///
    /// Only the envelope is returned; call [`unlock`](Self::unlock) to obtain
    /// the live key. The plaintext VaultKey and KEK are zeroed before return.
    pub fn initialize(&self, master_password: &SecretString) -> Result<Envelope, CofferError> {
        let password = non_empty(master_password)?;
        let vault_key = crypto::generate_key()?;
        let envelope = self.seal(password, vault_key.as_ref())?;
        info!("vault key generated and sealed");
        Ok(envelope)
    }

    /// Derive the KEK with the envelope's stored salt and costs and unwrap the VaultKey.
    ///
    /// Any failure to authenticate is reported as one generic
    /// [`CofferError::AuthenticationFailure`].
    pub fn unlock(
        &self,
        master_password: &SecretString,
        envelope: &Envelope,
    ) -> Result<VaultKey, CofferError> {
        let password = non_empty(master_password)?;
        let kek = kdf::derive_key_with_salt(password, &envelope.salt, &envelope.kdf_params())?;

        let plaintext = crypto::decrypt(
            &envelope.encrypted_vault_key,
            kek.as_ref(),
            &envelope.iv,
            &envelope.tag,
        )
        .map_err(|e| match e {
            CofferError::AuthenticationFailure(_) => {
                CofferError::AuthenticationFailure(UNLOCK_FAILED.to_string())
            }
            other => other,
        })?;

        if plaintext.len() != crypto::KEY_LEN {
            return Err(CofferError::AuthenticationFailure(UNLOCK_FAILED.to_string()));
        }
        let mut key = Zeroizing::new([0u8; crypto::KEY_LEN]);
        key.copy_from_slice(&plaintext);
        debug!("vault unlocked");
        Ok(VaultKey(key))
    }

    /// Re-wrap the VaultKey under `new_password` with a fresh salt.
    ///
    /// If `old_password` does not unlock `envelope`, nothing else happens and
    /// the existing envelope remains the only valid one.
    pub fn change_master_password(
        &self,
        old_password: &SecretString,
        new_password: &SecretString,
        envelope: &Envelope,
    ) -> Result<Envelope, CofferError> {
        let new_password = non_empty(new_password)?;
        let vault_key = self.unlock(old_password, envelope)?;
        let rewrapped = self.seal(new_password, vault_key.expose())?;
        info!("vault master password changed");
        Ok(rewrapped)
    }

    /// No-op. The VaultKey's lifetime belongs to whoever holds the
    /// [`VaultKey`] returned by [`unlock`](Self::unlock); dropping it wipes it.
    pub fn lock(&self) {}

    fn seal(&self, password: &[u8], vault_key: &[u8]) -> Result<Envelope, CofferError> {
        let derived = kdf::derive_key(password, None, &self.params)?;
        let sealed = crypto::encrypt(vault_key, derived.key.as_ref())?;
        Ok(Envelope {
            encrypted_vault_key: sealed.ciphertext,
            iv: sealed.nonce,
            tag: sealed.tag,
            salt: derived.salt,
            iterations: self.params.iterations,
            memory_kib: self.params.memory_kib,
            parallelism: self.params.parallelism,
        })
    }
}

// Key-slot persistence. The repository serializes writers; these helpers
// only sequence load, crypto and write.
impl VaultManager {
    /// Initialize the vault and persist its first key slot.
    pub fn initialize_slot(
        &self,
        repo: &dyn KeySlotRepository,
        master_password: &SecretString,
    ) -> Result<KeySlot, CofferError> {
        if repo.load()?.is_some() {
            return Err(CofferError::ConcurrencyConflict(
                "vault is already initialized".to_string(),
            ));
        }
        let envelope = self.initialize(master_password)?;
        repo.create(&envelope.to_key_slot(Utc::now()))
    }

    /// Unlock the persisted key slot.
    pub fn unlock_slot(
        &self,
        repo: &dyn KeySlotRepository,
        master_password: &SecretString,
    ) -> Result<VaultKey, CofferError> {
        let slot = load_existing(repo)?;
        self.unlock(master_password, &Envelope::from(&slot))
    }

    /// Change the master password of the persisted key slot.
    ///
    /// The write is conditional on the slot version read here, so a competing
    /// change fails with [`CofferError::ConcurrencyConflict`] instead of being
    /// overwritten.
    pub fn change_slot_password(
        &self,
        repo: &dyn KeySlotRepository,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<KeySlot, CofferError> {
        let slot = load_existing(repo)?;
        let envelope =
            self.change_master_password(old_password, new_password, &Envelope::from(&slot))?;

        let mut next = envelope.to_key_slot(Utc::now());
        next.created_at = slot.created_at;
        repo.replace(slot.version, &next)
    }
}

fn load_existing(repo: &dyn KeySlotRepository) -> Result<KeySlot, CofferError> {
    repo.load()?
        .ok_or_else(|| CofferError::InvalidArgument("vault is not initialized".to_string()))
}

fn non_empty(password: &SecretString) -> Result<&[u8], CofferError> {
    let bytes = password.expose_secret().as_bytes();
    if bytes.is_empty() {
        return Err(CofferError::InvalidArgument(
            "master password must not be empty".to_string(),
        ));
    }
    Ok(bytes)
}
