// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence seams for the crypto core.
//!
//! The vault and the registry never touch files or databases directly; they
//! are handed an implementation of one of these traits.

pub mod key_slot;
pub mod key_store;

pub use key_slot::KeySlotRepository;
pub use key_store::KeyStoreRepository;
