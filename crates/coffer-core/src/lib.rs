// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Coffer secrets store.
//!
//! This crate provides the error type, the persisted record types shared by
//! the vault and the signing-key registry, and the narrow repository traits
//! through which those components reach durable storage.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CofferError, ErrorClass};
pub use traits::{KeySlotRepository, KeyStoreRepository};
pub use types::{JwtKeyStore, JwtKeyVersion, KeySlot, KeyStatus};
