// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signing-key rotation registry.
//!
//! All writes (`rotate_key`, `revoke_key`, `cleanup_expired_keys` and lazy
//! initialization) serialize through one mutex per registry, re-read the
//! store from the repository, persist the whole store, and then invalidate
//! the read cache. Readers go through the cache.
//!
//! The mutex only serializes writers within one process. Several processes
//! sharing one store need a repository with its own concurrency control.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use coffer_config::model::SigningConfig;
use coffer_core::{CofferError, JwtKeyStore, JwtKeyVersion, KeyStatus, KeyStoreRepository};
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::cache::KeyStoreCache;
use crate::repository::FileKeyStoreRepository;

/// Id reported for the operator-supplied static key.
pub const STATIC_KEY_ID: &str = "static";

/// Bytes of secret material per generated key.
const KEY_MATERIAL_LEN: usize = 64;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Tunables for a [`SigningKeyRegistry`].
#[derive(Clone)]
pub struct RegistryOptions {
    /// Transition window used when a corrupt store has to be repaired.
    pub transition_days: u32,
    /// How long Expired and Revoked keys are kept before being purged.
    pub retention_days: u32,
    /// Read-cache lifetime.
    pub cache_ttl: Duration,
    /// Operator-supplied key. Disables rotation entirely.
    pub static_key: Option<SecretString>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            transition_days: 7,
            retention_days: 30,
            cache_ttl: Duration::from_secs(300),
            static_key: None,
        }
    }
}

impl From<&SigningConfig> for RegistryOptions {
    fn from(config: &SigningConfig) -> Self {
        Self {
            transition_days: config.transition_days,
            retention_days: config.retention_days,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            static_key: config.static_key.clone().map(SecretString::from),
        }
    }
}

impl std::fmt::Debug for RegistryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryOptions")
            .field("transition_days", &self.transition_days)
            .field("retention_days", &self.retention_days)
            .field("cache_ttl", &self.cache_ttl)
            .field("static_key", &self.static_key.is_some())
            .finish()
    }
}

/// What a cleanup pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// VerifyOnly keys whose window closed and are now Expired.
    pub expired: usize,
    /// Expired or Revoked keys removed after the retention window.
    pub purged: usize,
}

/// Versioned store of token-signing keys.
pub struct SigningKeyRegistry {
    repo: Arc<dyn KeyStoreRepository>,
    cache: KeyStoreCache,
    write_lock: Mutex<()>,
    transition: chrono::Duration,
    retention: chrono::Duration,
    static_key: Option<JwtKeyVersion>,
}

impl std::fmt::Debug for SigningKeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyRegistry")
            .field("cache_ttl", &self.cache.ttl())
            .field("retention", &self.retention)
            .field("static_key", &self.static_key.is_some())
            .finish_non_exhaustive()
    }
}

impl SigningKeyRegistry {
    pub fn new(repo: Arc<dyn KeyStoreRepository>, options: RegistryOptions) -> Self {
        let static_key = options.static_key.as_ref().map(|secret| {
            warn!("static signing key configured; key rotation is disabled");
            static_key_version(secret)
        });
        Self {
            repo,
            cache: KeyStoreCache::new(options.cache_ttl),
            write_lock: Mutex::new(()),
            transition: days(options.transition_days),
            retention: days(options.retention_days),
            static_key,
        }
    }

    /// Registry over the JSON store named in `config`.
    pub fn from_config(config: &SigningConfig) -> Self {
        Self::new(
            Arc::new(FileKeyStoreRepository::new(&config.store_path)),
            RegistryOptions::from(config),
        )
    }

    /// Whether an operator-supplied key supersedes the rotation store.
    pub fn is_static(&self) -> bool {
        self.static_key.is_some()
    }

    /// The Active key used to sign new tokens.
    ///
    /// An empty store, or one without a usable current key, is initialized on
    /// first use.
    pub fn get_current_key(&self) -> Result<JwtKeyVersion, CofferError> {
        if let Some(key) = &self.static_key {
            return Ok(key.clone());
        }
        let store = self.read_store()?;
        if let Some(current) = store.current() {
            return Ok(current.clone());
        }
        self.ensure_current()
    }

    /// Keys that may verify a token, newest first.
    ///
    /// Callers try each key in turn, which lets tokens signed before a
    /// rotation keep verifying during the transition window.
    pub fn get_validation_keys(&self) -> Result<Vec<JwtKeyVersion>, CofferError> {
        if let Some(key) = &self.static_key {
            return Ok(vec![key.clone()]);
        }
        let mut store = self.read_store()?;
        if store.current().is_none() {
            self.ensure_current()?;
            store = self.read_store()?;
        }
        let now = Utc::now();
        let mut keys: Vec<JwtKeyVersion> = store
            .keys
            .iter()
            .filter(|k| k.is_valid_at(now))
            .cloned()
            .collect();
        sort_newest_first(&mut keys);
        Ok(keys)
    }

    /// Every stored version regardless of status, newest first.
    pub fn list_keys(&self) -> Result<Vec<JwtKeyVersion>, CofferError> {
        if let Some(key) = &self.static_key {
            return Ok(vec![key.clone()]);
        }
        let mut keys = self.read_store()?.keys.clone();
        sort_newest_first(&mut keys);
        Ok(keys)
    }

    /// Replace the Active key.
    ///
    /// The old key becomes VerifyOnly for `transition_days`; with zero days it
    /// stops validating at once. Expired keys past retention are purged.
    pub fn rotate_key(&self, transition_days: u32) -> Result<JwtKeyVersion, CofferError> {
        self.reject_static("rotate")?;
        let _guard = self.lock_writes()?;
        let mut store = self.repo.load()?;
        let now = Utc::now();
        let new_key = self.rotate_locked(&mut store, days(transition_days), now)?;
        self.persist(&store)?;
        info!(key_id = %new_key.id, transition_days, "signing key rotated");
        Ok(new_key)
    }

    /// Withdraw a key immediately.
    ///
    /// Revoking the current key first rotates with a zero-day window, so a
    /// replacement Active key exists before the old one leaves service.
    pub fn revoke_key(&self, key_id: &str) -> Result<(), CofferError> {
        self.reject_static("revoke")?;
        let _guard = self.lock_writes()?;
        let mut store = self.repo.load()?;
        if store.find(key_id).is_none() {
            return Err(CofferError::KeyNotFound {
                key_id: key_id.to_string(),
            });
        }

        let now = Utc::now();
        match store.find(key_id).map(|k| k.status) {
            Some(KeyStatus::Revoked) => return Ok(()),
            Some(KeyStatus::Expired) => {
                return Err(CofferError::InvalidArgument(format!(
                    "key {key_id} has already expired and cannot be revoked"
                )));
            }
            _ => {}
        }
        if store.current_key_id == key_id {
            let replacement = self.rotate_locked(&mut store, chrono::Duration::zero(), now)?;
            info!(revoked = %key_id, replacement = %replacement.id, "current signing key replaced before revocation");
        }
        if let Some(key) = store.find_mut(key_id) {
            key.status = KeyStatus::Revoked;
            key.expires_at = Some(now);
        }
        self.persist(&store)?;
        info!(key_id = %key_id, "signing key revoked");
        Ok(())
    }

    /// Expire VerifyOnly keys whose window has closed and purge Expired or
    /// Revoked keys older than the retention window.
    pub fn cleanup_expired_keys(&self) -> Result<CleanupReport, CofferError> {
        if self.is_static() {
            return Ok(CleanupReport::default());
        }
        let _guard = self.lock_writes()?;
        let mut store = self.repo.load()?;
        let now = Utc::now();
        let cutoff = shift_back(now, self.retention)?;

        let mut report = CleanupReport::default();
        for key in store.keys.iter_mut() {
            if key.status == KeyStatus::VerifyOnly && key.expires_at.is_some_and(|at| at <= now) {
                key.status = KeyStatus::Expired;
                report.expired += 1;
            }
        }
        report.purged = purge_retired(&mut store, cutoff);

        if report != CleanupReport::default() {
            self.persist(&store)?;
        }
        info!(expired = report.expired, purged = report.purged, "signing key cleanup finished");
        Ok(report)
    }

    /// Whether a scheduled rotation is due.
    ///
    /// True when the store has never been rotated (or initialized), or the
    /// last rotation is older than `rotation_days`.
    pub fn should_rotate(&self, rotation_days: u32) -> Result<bool, CofferError> {
        if self.is_static() {
            return Ok(false);
        }
        let store = self.read_store()?;
        Ok(match store.last_rotation_at {
            None => true,
            Some(at) => Utc::now() - at > days(rotation_days),
        })
    }

    /// Drop the read cache so the next read goes to the repository.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    fn read_store(&self) -> Result<Arc<JwtKeyStore>, CofferError> {
        match self.cache.get() {
            Ok(store) => {
                debug!("signing key store cache hit");
                Ok(store)
            }
            Err(observed) => {
                debug!("signing key store cache miss");
                let store = Arc::new(self.repo.load()?);
                self.cache.fill(observed, Arc::clone(&store));
                Ok(store)
            }
        }
    }

    /// Create the first key, or repair a store whose current key is unusable.
    fn ensure_current(&self) -> Result<JwtKeyVersion, CofferError> {
        let _guard = self.lock_writes()?;
        let mut store = self.repo.load()?;
        if let Some(current) = store.current() {
            return Ok(current.clone());
        }
        if !store.is_empty() {
            warn!(
                current_key_id = %store.current_key_id,
                "signing key store has no usable current key; issuing a replacement"
            );
        }
        let key = self.rotate_locked(&mut store, self.transition, Utc::now())?;
        self.persist(&store)?;
        info!(key_id = %key.id, "signing key initialized");
        Ok(key)
    }

    /// Demote every Active key, add a fresh Active key, purge retired keys.
    ///
    /// All fallible work happens before `store` is touched.
    fn rotate_locked(
        &self,
        store: &mut JwtKeyStore,
        transition: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<JwtKeyVersion, CofferError> {
        let expires_at = now.checked_add_signed(transition).ok_or_else(|| {
            CofferError::InvalidArgument(format!(
                "transition of {} days is out of range",
                transition.num_days()
            ))
        })?;
        let cutoff = shift_back(now, self.retention)?;
        let new_key = JwtKeyVersion {
            id: store.next_key_id(),
            key: generate_key_material()?,
            created_at: now,
            expires_at: None,
            status: KeyStatus::Active,
        };

        for key in store.keys.iter_mut().filter(|k| k.status == KeyStatus::Active) {
            key.status = KeyStatus::VerifyOnly;
            key.expires_at = Some(expires_at);
        }

        store.keys.push(new_key.clone());
        store.current_key_id = new_key.id.clone();
        store.last_rotation_at = Some(now);
        purge_retired(store, cutoff);
        Ok(new_key)
    }

    /// Save and invalidate. The cache is dropped even when the save fails so
    /// no reader keeps serving a store the repository may no longer hold.
    fn persist(&self, store: &JwtKeyStore) -> Result<(), CofferError> {
        let result = self.repo.save(store);
        self.cache.invalidate();
        result
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, CofferError> {
        self.write_lock
            .lock()
            .map_err(|_| CofferError::Internal("signing key write lock poisoned".to_string()))
    }

    fn reject_static(&self, operation: &str) -> Result<(), CofferError> {
        if self.is_static() {
            return Err(CofferError::Config(format!(
                "cannot {operation} keys while a static signing key is configured"
            )));
        }
        Ok(())
    }
}

/// Remove Expired and Revoked keys whose expiry (or creation, if unset)
/// predates `cutoff`.
fn purge_retired(store: &mut JwtKeyStore, cutoff: DateTime<Utc>) -> usize {
    let before = store.keys.len();
    store.keys.retain(|k| {
        !matches!(k.status, KeyStatus::Expired | KeyStatus::Revoked)
            || k.expires_at.unwrap_or(k.created_at) >= cutoff
    });
    before - store.keys.len()
}

/// Start of the retention window, or `InvalidArgument` if it precedes the
/// representable range.
fn shift_back(
    now: DateTime<Utc>,
    retention: chrono::Duration,
) -> Result<DateTime<Utc>, CofferError> {
    now.checked_sub_signed(retention).ok_or_else(|| {
        CofferError::InvalidArgument(format!(
            "retention of {} days is out of range",
            retention.num_days()
        ))
    })
}

fn sort_newest_first(keys: &mut [JwtKeyVersion]) {
    keys.sort_by(|a, b| {
        b.version_number()
            .cmp(&a.version_number())
            .then(b.created_at.cmp(&a.created_at))
    });
}

fn days(n: u32) -> chrono::Duration {
    chrono::Duration::days(i64::from(n))
}

fn generate_key_material() -> Result<String, CofferError> {
    let mut bytes = Zeroizing::new([0u8; KEY_MATERIAL_LEN]);
    SystemRandom::new()
        .fill(bytes.as_mut())
        .map_err(|_| CofferError::Internal("failed to generate signing key".to_string()))?;
    Ok(B64.encode(bytes.as_ref()))
}

/// Wrap the operator key as a permanently Active version. Text that is not
/// already base64 is encoded so `key` always holds base64.
fn static_key_version(secret: &SecretString) -> JwtKeyVersion {
    let raw = secret.expose_secret();
    let key = if B64.decode(raw).is_ok() {
        raw.to_string()
    } else {
        B64.encode(raw.as_bytes())
    };
    JwtKeyVersion {
        id: STATIC_KEY_ID.to_string(),
        key,
        created_at: Utc::now(),
        expires_at: None,
        status: KeyStatus::Active,
    }
}
