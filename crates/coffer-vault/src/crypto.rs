// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM encryption with detached nonce and tag.
//!
//! Every call to [`encrypt`] draws a fresh random 96-bit nonce from the system
//! CSPRNG. Nonce reuse under one key would break GCM entirely.

use coffer_core::CofferError;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Output of [`encrypt`]. The ciphertext is exactly as long as the plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
}

fn aead_key(key: &[u8]) -> Result<LessSafeKey, CofferError> {
    if key.len() != KEY_LEN {
        return Err(CofferError::InvalidArgument(format!(
            "key must be {KEY_LEN} bytes"
        )));
    }
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| CofferError::Internal("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under a 32-byte key. Zero-length plaintext is allowed.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<Sealed, CofferError> {
    let key = aead_key(key)?;

    let mut nonce = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| CofferError::Internal("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    let tag = key
        .seal_in_place_separate_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
        .map_err(|_| CofferError::Internal("AES-256-GCM encryption failed".to_string()))?;

    let tag: [u8; TAG_LEN] = tag
        .as_ref()
        .try_into()
        .map_err(|_| CofferError::Internal("unexpected AES-256-GCM tag length".to_string()))?;

    Ok(Sealed {
        ciphertext: in_out,
        nonce,
        tag,
    })
}

/// Decrypt and authenticate.
///
/// Lengths are checked before any cryptographic work. A tag mismatch (tampered
/// ciphertext, nonce or tag, or the wrong key) yields
/// [`CofferError::AuthenticationFailure`] and no plaintext at all: the working
/// buffer is zeroed on drop.
pub fn decrypt(
    ciphertext: &[u8],
    key: &[u8],
    nonce: &[u8],
    tag: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CofferError> {
    let nonce: [u8; NONCE_LEN] = nonce
        .try_into()
        .map_err(|_| CofferError::InvalidArgument(format!("nonce must be {NONCE_LEN} bytes")))?;
    if tag.len() != TAG_LEN {
        return Err(CofferError::InvalidArgument(format!(
            "tag must be {TAG_LEN} bytes"
        )));
    }
    let key = aead_key(key)?;

    let mut in_out = Zeroizing::new(Vec::with_capacity(ciphertext.len() + TAG_LEN));
    in_out.extend_from_slice(ciphertext);
    in_out.extend_from_slice(tag);

    let plaintext_len = key
        .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::empty(), in_out.as_mut_slice())
        .map_err(|_| {
            CofferError::AuthenticationFailure("AES-256-GCM tag verification failed".to_string())
        })?
        .len();
    in_out.truncate(plaintext_len);

    Ok(in_out)
}

/// Generate a random 32-byte key.
pub fn generate_key() -> Result<Zeroizing<[u8; KEY_LEN]>, CofferError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    SystemRandom::new()
        .fill(key.as_mut())
        .map_err(|_| CofferError::Internal("failed to generate random key".to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn key() -> Zeroizing<[u8; KEY_LEN]> {
        generate_key().unwrap()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = key();
        let sealed = encrypt(b"secret api key value", key.as_ref()).unwrap();
        let plaintext = decrypt(&sealed.ciphertext, key.as_ref(), &sealed.nonce, &sealed.tag).unwrap();
        assert_eq!(plaintext.as_slice(), b"secret api key value");
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let key = key();
        let sealed = encrypt(b"", key.as_ref()).unwrap();
        assert!(sealed.ciphertext.is_empty());
        let plaintext = decrypt(&sealed.ciphertext, key.as_ref(), &sealed.nonce, &sealed.tag).unwrap();
        assert!(plaintext.is_empty());
    }

    #[test]
    fn ciphertext_length_equals_plaintext_length() {
        let sealed = encrypt(b"hello", key().as_ref()).unwrap();
        assert_eq!(sealed.ciphertext.len(), 5);
    }

    #[test]
    fn nonces_never_repeat_over_many_calls() {
        let key = key();
        let mut nonces = HashSet::new();
        let mut ciphertexts = HashSet::new();
        for _ in 0..200 {
            let sealed = encrypt(b"same input every time", key.as_ref()).unwrap();
            assert!(nonces.insert(sealed.nonce), "nonce reused");
            ciphertexts.insert(sealed.ciphertext);
        }
        assert_eq!(ciphertexts.len(), 200);
    }

    #[test]
    fn wrong_key_is_an_authentication_failure() {
        let sealed = encrypt(b"secret data", key().as_ref()).unwrap();
        let err = decrypt(&sealed.ciphertext, key().as_ref(), &sealed.nonce, &sealed.tag).unwrap_err();
        assert!(matches!(err, CofferError::AuthenticationFailure(_)));
    }

    #[test]
    fn length_checks_precede_decryption() {
        let key = key();
        let sealed = encrypt(b"data", key.as_ref()).unwrap();
        let invalid = |r: Result<Zeroizing<Vec<u8>>, CofferError>| {
            assert!(matches!(r, Err(CofferError::InvalidArgument(_))));
        };
        invalid(decrypt(&sealed.ciphertext, &key[..31], &sealed.nonce, &sealed.tag));
        invalid(decrypt(&sealed.ciphertext, key.as_ref(), &sealed.nonce[..11], &sealed.tag));
        invalid(decrypt(&sealed.ciphertext, key.as_ref(), &sealed.nonce, &sealed.tag[..15]));
        assert!(matches!(
            encrypt(b"data", &[0u8; 16]),
            Err(CofferError::InvalidArgument(_))
        ));
    }

    proptest! {
        #[test]
        fn roundtrip_any_plaintext(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
            let key = key();
            let sealed = encrypt(&plaintext, key.as_ref()).unwrap();
            let opened = decrypt(&sealed.ciphertext, key.as_ref(), &sealed.nonce, &sealed.tag).unwrap();
            prop_assert_eq!(opened.as_slice(), plaintext.as_slice());
        }

        #[test]
        fn any_single_bit_flip_is_detected(
            plaintext in proptest::collection::vec(any::<u8>(), 1..128),
            target in 0usize..3,
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let key = key();
            let mut sealed = encrypt(&plaintext, key.as_ref()).unwrap();
            match target {
                0 => sealed.ciphertext[index.index(plaintext.len())] ^= 1 << bit,
                1 => sealed.nonce[index.index(NONCE_LEN)] ^= 1 << bit,
                _ => sealed.tag[index.index(TAG_LEN)] ^= 1 << bit,
            }
            let result = decrypt(&sealed.ciphertext, key.as_ref(), &sealed.nonce, &sealed.tag);
            prop_assert!(matches!(result, Err(CofferError::AuthenticationFailure(_))));
        }
    }
}
