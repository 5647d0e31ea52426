// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from a password.
//!
//! Cost parameters travel with each key slot, so tuning the defaults later
//! never breaks a vault created under the old ones.

use coffer_config::model::VaultConfig;
use coffer_core::CofferError;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Derived key length in bytes.
pub const KEY_LEN: usize = 32;

/// Length of generated salts.
pub const SALT_LEN: usize = 16;

/// Shortest salt accepted for derivation.
pub const MIN_SALT_LEN: usize = 8;

pub const MIN_MEMORY_KIB: u32 = 8;

/// 4 GiB. Memory cost is also a latency bound, so it is capped.
pub const MAX_MEMORY_KIB: u32 = 4 * 1024 * 1024;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub iterations: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: 4,
            memory_kib: 65536,
            parallelism: 2,
        }
    }
}

impl From<&VaultConfig> for KdfParams {
    fn from(config: &VaultConfig) -> Self {
        Self {
            iterations: config.kdf_iterations,
            memory_kib: config.kdf_memory_kib,
            parallelism: config.kdf_parallelism,
        }
    }
}

impl KdfParams {
    /// Reject cost parameters that are unusable or unreasonably expensive.
    pub fn validate(&self) -> Result<(), CofferError> {
        if self.iterations < 1 {
            return Err(CofferError::InvalidArgument(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(CofferError::InvalidArgument(format!(
                "memory cost must be at least {MIN_MEMORY_KIB} KiB"
            )));
        }
        if self.memory_kib > MAX_MEMORY_KIB {
            return Err(CofferError::InvalidArgument(format!(
                "memory cost must be at most {MAX_MEMORY_KIB} KiB"
            )));
        }
        if self.parallelism < 1 {
            return Err(CofferError::InvalidArgument(
                "parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A derived key together with the salt it was derived with.
pub struct DerivedKey {
    pub key: Zeroizing<[u8; KEY_LEN]>,
    pub salt: Vec<u8>,
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .field("salt_len", &self.salt.len())
            .finish()
    }
}

/// Derive a key, generating a fresh random salt when none is supplied.
pub fn derive_key(
    password: &[u8],
    salt: Option<&[u8]>,
    params: &KdfParams,
) -> Result<DerivedKey, CofferError> {
    let salt = match salt {
        Some(salt) => salt.to_vec(),
        None => generate_salt()?.to_vec(),
    };
    let key = derive_key_with_salt(password, &salt, params)?;
    Ok(DerivedKey { key, salt })
}

/// Derive a key from a password and a known salt.
///
/// The returned key is zeroed when dropped.
pub fn derive_key_with_salt(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, CofferError> {
    if password.is_empty() {
        return Err(CofferError::InvalidArgument(
            "password must not be empty".to_string(),
        ));
    }
    if salt.len() < MIN_SALT_LEN {
        return Err(CofferError::InvalidArgument(format!(
            "salt must be at least {MIN_SALT_LEN} bytes"
        )));
    }
    params.validate()?;

    let argon_params = argon2::Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| CofferError::InvalidArgument(format!("invalid Argon2id parameters: {e}")))?;
    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon_params,
    );

    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, output.as_mut())
        .map_err(|e| CofferError::InvalidArgument(format!("Argon2id derivation failed: {e}")))?;
    Ok(output)
}

/// Re-derive from `password` and compare against `expected_key` in constant time.
pub fn verify_password(
    password: &[u8],
    expected_key: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<bool, CofferError> {
    if expected_key.len() != KEY_LEN {
        return Err(CofferError::InvalidArgument(format!(
            "expected key must be {KEY_LEN} bytes"
        )));
    }
    let derived = derive_key_with_salt(password, salt, params)?;
    #[allow(deprecated)]
    let equal = ring::constant_time::verify_slices_are_equal(derived.as_ref(), expected_key).is_ok();
    Ok(equal)
}

/// Generate a random 16-byte salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], CofferError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| CofferError::Internal("failed to generate random salt".to_string()))?;
    Ok(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Low cost for fast tests.
    const FAST: KdfParams = KdfParams {
        iterations: 1,
        memory_kib: 1024,
        parallelism: 1,
    };

    #[test]
    fn derivation_is_deterministic() {
        let salt = [1u8; 16];
        let a = derive_key_with_salt(b"password", &salt, &FAST).unwrap();
        let b = derive_key_with_salt(b"password", &salt, &FAST).unwrap();
        assert_eq!(*a, *b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn password_and_salt_each_change_output() {
        let base = derive_key_with_salt(b"password", &[1u8; 16], &FAST).unwrap();
        let other_pw = derive_key_with_salt(b"passw0rd", &[1u8; 16], &FAST).unwrap();
        let other_salt = derive_key_with_salt(b"password", &[2u8; 16], &FAST).unwrap();
        assert_ne!(*base, *other_pw);
        assert_ne!(*base, *other_salt);
    }

    #[test]
    fn omitted_salt_is_generated_and_returned() {
        let first = derive_key(b"password", None, &FAST).unwrap();
        let second = derive_key(b"password", None, &FAST).unwrap();
        assert_eq!(first.salt.len(), SALT_LEN);
        assert_ne!(first.salt, second.salt);
        assert_ne!(*first.key, *second.key);

        let again = derive_key(b"password", Some(&first.salt), &FAST).unwrap();
        assert_eq!(*again.key, *first.key);
    }

    #[test]
    fn verify_password_accepts_only_the_right_password() {
        let salt = generate_salt().unwrap();
        let key = derive_key_with_salt(b"right", &salt, &FAST).unwrap();
        assert!(verify_password(b"right", key.as_ref(), &salt, &FAST).unwrap());
        assert!(!verify_password(b"wrong", key.as_ref(), &salt, &FAST).unwrap());
    }

    #[test]
    fn verify_password_rejects_wrong_key_length() {
        let err = verify_password(b"pw", &[0u8; 31], &[0u8; 16], &FAST).unwrap_err();
        assert!(matches!(err, CofferError::InvalidArgument(_)));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let rejects = |password: &[u8], salt: &[u8], params: KdfParams| {
            let err = derive_key_with_salt(password, salt, &params).unwrap_err();
            assert!(matches!(err, CofferError::InvalidArgument(_)), "{params:?}");
        };
        rejects(b"", &[0u8; 16], FAST);
        rejects(b"pw", &[0u8; 7], FAST);
        rejects(b"pw", &[0u8; 16], KdfParams { iterations: 0, ..FAST });
        rejects(b"pw", &[0u8; 16], KdfParams { memory_kib: 7, ..FAST });
        rejects(b"pw", &[0u8; 16], KdfParams { parallelism: 0, ..FAST });
        rejects(b"pw", &[0u8; 16], KdfParams { memory_kib: MAX_MEMORY_KIB + 1, ..FAST });
    }

    #[test]
    fn eight_byte_salt_is_accepted() {
        assert!(derive_key_with_salt(b"pw", &[9u8; 8], &FAST).is_ok());
    }

    #[test]
    fn default_params_match_documented_costs() {
        let params = KdfParams::default();
        assert_eq!(params.iterations, 4);
        assert_eq!(params.memory_kib, 65536);
        assert_eq!(params.parallelism, 2);
    }
}
