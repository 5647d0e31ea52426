// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password-protected vault key for the Coffer secrets store.
//!
//! A random 32-byte VaultKey protects stored secrets. The VaultKey itself is
//! wrapped with AES-256-GCM under a key derived from the master password via
//! Argon2id, so a password change re-wraps one key instead of re-encrypting
//! every secret.

pub mod crypto;
pub mod kdf;
pub mod prompt;
pub mod store;
pub mod vault;

pub use crypto::Sealed;
pub use kdf::{DerivedKey, KdfParams};
pub use prompt::{get_master_password, get_new_master_password};
pub use store::{InMemoryKeySlotRepository, VaultStore};
pub use vault::{Envelope, VaultKey, VaultManager};
