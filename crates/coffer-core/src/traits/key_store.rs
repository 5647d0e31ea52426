// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository trait for the signing-key rotation store.

use crate::error::CofferError;
use crate::types::JwtKeyStore;

/// Durable home of the [`JwtKeyStore`].
///
/// `load` returns an empty store when nothing has been persisted yet. Any
/// read or write failure must surface as [`CofferError::Persistence`]; the
/// registry never continues on a partially written store.
pub trait KeyStoreRepository: Send + Sync {
    /// Read the whole store.
    fn load(&self) -> Result<JwtKeyStore, CofferError>;

    /// Replace the whole store.
    fn save(&self, store: &JwtKeyStore) -> Result<(), CofferError>;
}
