// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-slot persistence.
//!
//! [`VaultStore`] keeps the singleton slot in SQLite with embedded `refinery`
//! migrations. Writes are conditional on the `version` column, so two
//! concurrent password changes cannot both succeed.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use coffer_core::{CofferError, KeySlot, KeySlotRepository};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// SQLite-backed [`KeySlotRepository`].
pub struct VaultStore {
    conn: Mutex<rusqlite::Connection>,
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore").finish_non_exhaustive()
    }
}

impl VaultStore {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CofferError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| CofferError::persistence("failed to create vault directory", e))?;
        }
        let conn = rusqlite::Connection::open(path).map_err(map_db_err)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(map_db_err)?;
        let store = Self::from_connection(conn)?;
        info!(path = %path.display(), "vault store opened");
        Ok(store)
    }

    /// In-memory database, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, CofferError> {
        Self::from_connection(rusqlite::Connection::open_in_memory().map_err(map_db_err)?)
    }

    fn from_connection(mut conn: rusqlite::Connection) -> Result<Self, CofferError> {
        embedded::migrations::runner()
            .run(&mut conn)
            .map_err(|e| CofferError::Persistence {
                message: format!("vault schema migration failed: {e}"),
                source: None,
            })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&rusqlite::Connection) -> Result<T, CofferError>,
    ) -> Result<T, CofferError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| CofferError::Internal("vault store lock poisoned".to_string()))?;
        f(&conn)
    }
}

impl KeySlotRepository for VaultStore {
    fn load(&self) -> Result<Option<KeySlot>, CofferError> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                "SELECT encrypted_vault_key, iv, tag, salt, iterations, memory_kib, parallelism,
                        created_at, updated_at, version
                 FROM key_slot WHERE id = 1",
                [],
                |row| {
                    Ok(SlotRow {
                        encrypted_vault_key: row.get(0)?,
                        iv: row.get(1)?,
                        tag: row.get(2)?,
                        salt: row.get(3)?,
                        iterations: row.get(4)?,
                        memory_kib: row.get(5)?,
                        parallelism: row.get(6)?,
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                        version: row.get(9)?,
                    })
                },
            )
            .optional()
            .map_err(map_db_err)
        })?;
        row.map(SlotRow::into_key_slot).transpose()
    }

    fn create(&self, slot: &KeySlot) -> Result<KeySlot, CofferError> {
        let mut written = slot.clone();
        written.version = 1;
        let inserted = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO key_slot (id, encrypted_vault_key, iv, tag, salt, iterations,
                                       memory_kib, parallelism, created_at, updated_at, version)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)
                 ON CONFLICT (id) DO NOTHING",
                params![
                    written.encrypted_vault_key,
                    written.iv.to_vec(),
                    written.tag.to_vec(),
                    written.salt,
                    written.iterations,
                    written.memory_kib,
                    written.parallelism,
                    written.created_at.to_rfc3339(),
                    written.updated_at.to_rfc3339(),
                ],
            )
            .map_err(map_db_err)
        })?;
        if inserted == 0 {
            return Err(CofferError::ConcurrencyConflict(
                "vault is already initialized".to_string(),
            ));
        }
        info!("vault key slot created");
        Ok(written)
    }

    fn replace(&self, expected_version: u64, slot: &KeySlot) -> Result<KeySlot, CofferError> {
        let mut written = slot.clone();
        written.version = expected_version + 1;
        let expected = to_db_version(expected_version)?;
        let updated = self.with_conn(|conn| {
            conn.execute(
                "UPDATE key_slot
                 SET encrypted_vault_key = ?1, iv = ?2, tag = ?3, salt = ?4, iterations = ?5,
                     memory_kib = ?6, parallelism = ?7, updated_at = ?8, version = version + 1
                 WHERE id = 1 AND version = ?9",
                params![
                    written.encrypted_vault_key,
                    written.iv.to_vec(),
                    written.tag.to_vec(),
                    written.salt,
                    written.iterations,
                    written.memory_kib,
                    written.parallelism,
                    written.updated_at.to_rfc3339(),
                    expected,
                ],
            )
            .map_err(map_db_err)
        })?;
        if updated == 0 {
            return Err(CofferError::ConcurrencyConflict(format!(
                "key slot changed since version {expected_version} was read"
            )));
        }
        debug!(version = written.version, "vault key slot replaced");
        Ok(written)
    }
}

/// Raw column values, converted to a [`KeySlot`] after the connection is released.
struct SlotRow {
    encrypted_vault_key: Vec<u8>,
    iv: Vec<u8>,
    tag: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
    memory_kib: u32,
    parallelism: u32,
    created_at: String,
    updated_at: String,
    version: i64,
}

impl SlotRow {
    fn into_key_slot(self) -> Result<KeySlot, CofferError> {
        Ok(KeySlot {
            encrypted_vault_key: self.encrypted_vault_key,
            iv: self
                .iv
                .try_into()
                .map_err(|_| corrupted("iv must be 12 bytes"))?,
            tag: self
                .tag
                .try_into()
                .map_err(|_| corrupted("tag must be 16 bytes"))?,
            salt: self.salt,
            iterations: self.iterations,
            memory_kib: self.memory_kib,
            parallelism: self.parallelism,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            version: u64::try_from(self.version).map_err(|_| corrupted("negative version"))?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, CofferError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CofferError::persistence("corrupted key slot timestamp", e))
}

fn to_db_version(version: u64) -> Result<i64, CofferError> {
    i64::try_from(version)
        .map_err(|_| CofferError::InvalidArgument("key slot version out of range".to_string()))
}

fn corrupted(detail: &str) -> CofferError {
    CofferError::Persistence {
        message: format!("corrupted key slot: {detail}"),
        source: None,
    }
}

fn map_db_err(e: rusqlite::Error) -> CofferError {
    CofferError::persistence("vault database error", e)
}

/// Process-local [`KeySlotRepository`] with the same versioning rules as [`VaultStore`].
#[derive(Debug, Default)]
pub struct InMemoryKeySlotRepository {
    slot: Mutex<Option<KeySlot>>,
}

impl KeySlotRepository for InMemoryKeySlotRepository {
    fn load(&self) -> Result<Option<KeySlot>, CofferError> {
        Ok(self.lock()?.clone())
    }

    fn create(&self, slot: &KeySlot) -> Result<KeySlot, CofferError> {
        let mut guard = self.lock()?;
        if guard.is_some() {
            return Err(CofferError::ConcurrencyConflict(
                "vault is already initialized".to_string(),
            ));
        }
        let mut written = slot.clone();
        written.version = 1;
        *guard = Some(written.clone());
        Ok(written)
    }

    fn replace(&self, expected_version: u64, slot: &KeySlot) -> Result<KeySlot, CofferError> {
        let mut guard = self.lock()?;
        let current = guard
            .as_ref()
            .ok_or_else(|| CofferError::InvalidArgument("vault is not initialized".to_string()))?;
        if current.version != expected_version {
            return Err(CofferError::ConcurrencyConflict(format!(
                "key slot changed since version {expected_version} was read"
            )));
        }
        let mut written = slot.clone();
        written.created_at = current.created_at;
        written.version = expected_version + 1;
        *guard = Some(written.clone());
        Ok(written)
    }
}

impl InMemoryKeySlotRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<KeySlot>>, CofferError> {
        self.slot
            .lock()
            .map_err(|_| CofferError::Internal("key slot lock poisoned".to_string()))
    }
}
