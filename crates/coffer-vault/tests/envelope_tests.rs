// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end envelope behavior with the production cost parameters and the
//! SQLite key slot.

use coffer_core::{CofferError, ErrorClass, KeySlotRepository};
use coffer_vault::{crypto, KdfParams, VaultManager, VaultStore};
use secrecy::SecretString;

fn pw(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

#[test]
fn default_parameters_seal_and_unlock() {
    let vm = VaultManager::default();
    let envelope = vm.initialize(&pw("CorrectHorseBatteryStaple")).unwrap();

    assert_eq!(envelope.encrypted_vault_key.len(), 32);
    assert_eq!(envelope.salt.len(), 16);
    assert_eq!(envelope.iv.len(), 12);
    assert_eq!(envelope.tag.len(), 16);
    assert_eq!(envelope.iterations, 4);
    assert_eq!(envelope.memory_kib, 65536);
    assert_eq!(envelope.parallelism, 2);

    let key = vm.unlock(&pw("CorrectHorseBatteryStaple"), &envelope).unwrap();
    assert_eq!(key.expose().len(), 32);

    let err = vm.unlock(&pw("WrongPassword"), &envelope).unwrap_err();
    assert!(matches!(err, CofferError::AuthenticationFailure(_)));
    assert_eq!(err.class(), ErrorClass::IncorrectPassword);
}

#[test]
fn vault_key_protects_data_across_password_change() {
    let vm = VaultManager::new(KdfParams {
        iterations: 1,
        memory_kib: 1024,
        parallelism: 1,
    })
    .unwrap();
    let store = VaultStore::open_in_memory().unwrap();

    vm.initialize_slot(&store, &pw("before")).unwrap();
    let key = vm.unlock_slot(&store, &pw("before")).unwrap();
    let secret = crypto::encrypt(b"db-password-123", key.expose()).unwrap();
    drop(key);

    let old_slot = store.load().unwrap().unwrap();
    let new_slot = vm
        .change_slot_password(&store, &pw("before"), &pw("after"))
        .unwrap();
    assert_ne!(old_slot.salt, new_slot.salt);
    assert_eq!(new_slot.version, old_slot.version + 1);

    assert!(vm.unlock_slot(&store, &pw("before")).is_err());
    let key = vm.unlock_slot(&store, &pw("after")).unwrap();
    let plaintext =
        crypto::decrypt(&secret.ciphertext, key.expose(), &secret.nonce, &secret.tag).unwrap();
    assert_eq!(plaintext.as_slice(), b"db-password-123");
}

#[test]
fn failed_password_change_leaves_slot_untouched() {
    let vm = VaultManager::new(KdfParams {
        iterations: 1,
        memory_kib: 1024,
        parallelism: 1,
    })
    .unwrap();
    let store = VaultStore::open_in_memory().unwrap();
    let created = vm.initialize_slot(&store, &pw("real")).unwrap();

    let err = vm
        .change_slot_password(&store, &pw("guess"), &pw("new"))
        .unwrap_err();
    assert!(matches!(err, CofferError::AuthenticationFailure(_)));

    let after = store.load().unwrap().unwrap();
    assert_eq!(after.version, created.version);
    assert_eq!(after.encrypted_vault_key, created.encrypted_vault_key);
}

#[test]
fn concurrent_unlocks_are_independent() {
    let vm = VaultManager::new(KdfParams {
        iterations: 1,
        memory_kib: 1024,
        parallelism: 1,
    })
    .unwrap();
    let envelope = vm.initialize(&pw("shared")).unwrap();

    std::thread::scope(|scope| {
        let good = scope.spawn(|| vm.unlock(&pw("shared"), &envelope).map(|k| *k.expose()));
        let bad = scope.spawn(|| vm.unlock(&pw("other"), &envelope).map(|k| *k.expose()));
        assert!(good.join().unwrap().is_ok());
        assert!(bad.join().unwrap().is_err());
    });
}
