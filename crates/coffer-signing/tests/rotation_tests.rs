// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry behavior against the JSON file repository.

use std::sync::Arc;
use std::time::Duration;

use coffer_core::{KeyStatus, KeyStoreRepository};
use coffer_signing::{FileKeyStoreRepository, RegistryOptions, SigningKeyRegistry};

fn options() -> RegistryOptions {
    RegistryOptions {
        cache_ttl: Duration::ZERO,
        ..RegistryOptions::default()
    }
}

#[test]
fn rotation_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys").join("signing-keys.json");

    let first = SigningKeyRegistry::new(Arc::new(FileKeyStoreRepository::new(&path)), options());
    let v1 = first.get_current_key().unwrap();
    let v2 = first.rotate_key(7).unwrap();
    drop(first);

    let second = SigningKeyRegistry::new(Arc::new(FileKeyStoreRepository::new(&path)), options());
    assert_eq!(second.get_current_key().unwrap(), v2);
    let validation = second.get_validation_keys().unwrap();
    assert_eq!(validation.len(), 2);
    assert_eq!(validation[0].id, v2.id);
    assert_eq!(validation[1].id, v1.id);
    assert!(!second.should_rotate(30).unwrap());
}

#[test]
fn revocation_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signing-keys.json");
    let repo = Arc::new(FileKeyStoreRepository::new(&path));

    let registry = SigningKeyRegistry::new(repo.clone(), options());
    let v1 = registry.get_current_key().unwrap();
    registry.revoke_key(&v1.id).unwrap();

    let on_disk = repo.load().unwrap();
    assert_eq!(on_disk.find(&v1.id).unwrap().status, KeyStatus::Revoked);
    assert_eq!(on_disk.current_key_id, "v2");
    assert_eq!(
        on_disk
            .keys
            .iter()
            .filter(|k| k.status == KeyStatus::Active)
            .count(),
        1
    );
}

#[test]
fn corrupt_store_is_a_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signing-keys.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let registry = SigningKeyRegistry::new(Arc::new(FileKeyStoreRepository::new(&path)), options());
    let err = registry.get_current_key().unwrap_err();
    assert!(matches!(err, coffer_core::CofferError::Persistence { .. }));
    assert_eq!(std::fs::read(&path).unwrap(), b"{ not json");
}

#[test]
fn registry_from_config_uses_store_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("from-config.json");
    let config = coffer_config::model::SigningConfig {
        store_path: path.display().to_string(),
        ..Default::default()
    };

    let registry = SigningKeyRegistry::from_config(&config);
    registry.get_current_key().unwrap();
    assert!(path.exists());
}
