// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token signing-key registry for the Coffer secrets store.
//!
//! Keys move through `Active -> VerifyOnly -> Expired`, with `Revoked`
//! reachable from either live state. Exactly one key is Active at a time.
//! Superseded keys keep validating for a transition window so outstanding
//! tokens survive a rotation.

pub mod cache;
pub mod registry;
pub mod repository;

pub use cache::KeyStoreCache;
pub use registry::{CleanupReport, RegistryOptions, SigningKeyRegistry, STATIC_KEY_ID};
pub use repository::{FileKeyStoreRepository, InMemoryKeyStoreRepository};
