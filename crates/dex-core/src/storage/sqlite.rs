//! SQLite-backed key-value store
//!
//! Every payload lives in one row of the `kv` table. Writes are upserts, so
//! a failed write (quota, disk) leaves the previous value in place.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::kv::{check_quota, KeyValueStore, DEFAULT_QUOTA};
use crate::storage::schema::{init_schema, needs_init};

/// Key-value store persisted in a SQLite database file
pub struct SqliteKv {
    conn: Connection,
    path: Option<PathBuf>,
    quota: usize,
}

/// Size of what is currently stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KvStats {
    /// Number of stored keys
    pub keys: usize,
    /// Total bytes of stored values
    pub value_bytes: usize,
    /// Size of the database file (0 when in memory)
    pub file_bytes: u64,
}

impl SqliteKv {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| match source.kind() {
                    std::io::ErrorKind::PermissionDenied => {
                        StorageError::from_io(source, parent.to_path_buf())
                    }
                    _ => StorageError::CreateDirectory {
                        path: parent.to_path_buf(),
                        source,
                    },
                })?;
            }
        }

        let conn = Connection::open(path)?;
        if needs_init(&conn) {
            debug!("Initializing key-value schema at {:?}", path);
            init_schema(&conn)?;
        }

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
            quota: DEFAULT_QUOTA,
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn,
            path: None,
            quota: DEFAULT_QUOTA,
        })
    }

    /// Set the per-value size limit
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = quota;
        self
    }

    /// Path of the database file, if on disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Count keys and bytes currently stored
    pub fn stats(&self) -> StorageResult<KvStats> {
        let (keys, value_bytes): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let file_bytes = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(KvStats {
            keys: keys as usize,
            value_bytes: value_bytes as usize,
            file_bytes,
        })
    }

    /// All stored key names, sorted
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        check_quota(key, value, self.quota)?;
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}
