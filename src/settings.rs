// Settings - byte-oriented key-value persistence
//
// The expense store keeps its whole list under one key. Anything that can
// get and set a blob by name can back it: a SQLite file in the app, a
// HashMap in tests.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

// ============================================================================
// KEY-VALUE TRAIT
// ============================================================================

/// Synchronous key-value persistence used by the store
pub trait KeyValueStore {
    /// Read the blob stored under `key`, `None` if absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Overwrite the blob stored under `key`
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete `key`, returns whether it existed
    fn remove(&self, key: &str) -> Result<bool>;
}

// ============================================================================
// SQLITE SETTINGS
// ============================================================================

/// Settings table in a SQLite database (WAL mode)
pub struct SqliteSettings {
    conn: Connection,
}

impl SqliteSettings {
    /// Open (or create) a settings database on disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open settings database: {:?}", path.as_ref()))?;
        Self::from_connection(conn)
    }

    /// Open a throwaway in-memory settings database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    /// Wrap an existing connection, creating the table if needed
    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_settings(&conn)?;
        Ok(SqliteSettings { conn })
    }

    /// Number of keys currently stored
    pub fn key_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?;
        Ok(count)
    }
}

pub fn setup_settings(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY NOT NULL,
            value BLOB NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

impl KeyValueStore for SqliteSettings {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
            .with_context(|| format!("Failed to read setting {:?}", key))?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("Failed to write setting {:?}", key))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])
            .with_context(|| format!("Failed to delete setting {:?}", key))?;

        Ok(deleted > 0)
    }
}

// ============================================================================
// IN-MEMORY SETTINGS
// ============================================================================

/// HashMap-backed settings
///
/// Clones share the same map, so a second store built from a clone sees
/// whatever the first one wrote (a simulated restart).
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemorySettings {
    /// Create new empty settings
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemorySettings {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        Ok(entries.remove(key).is_some())
    }
}
