// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository trait for the singleton vault key slot.

use crate::error::CofferError;
use crate::types::KeySlot;

/// Durable home of the singleton [`KeySlot`].
///
/// Writers are serialized with optimistic versioning: a write based on a
/// stale read fails with [`CofferError::ConcurrencyConflict`] instead of
/// silently overwriting the competing change.
pub trait KeySlotRepository: Send + Sync {
    /// Read the slot, if the vault has been initialized.
    fn load(&self) -> Result<Option<KeySlot>, CofferError>;

    /// Store the first slot. Fails with `ConcurrencyConflict` if one exists.
    fn create(&self, slot: &KeySlot) -> Result<KeySlot, CofferError>;

    /// Replace the slot if its stored version still equals `expected_version`.
    ///
    /// Returns the slot as written, with its version advanced.
    fn replace(&self, expected_version: u64, slot: &KeySlot) -> Result<KeySlot, CofferError>;
}
