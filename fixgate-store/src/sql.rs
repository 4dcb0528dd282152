/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! SQL-backed message store.
//!
//! Serves both the `DatabaseDriver` and the `EmbeddedDatabaseDir`
//! configurations. Rows are keyed by the session's display form so several
//! sessions can share one database.

use crate::database::{self, database_error};
use crate::traits::{MessageStore, MessageStoreFactory, StoreKind};
use async_trait::async_trait;
use bytes::Bytes;
use fixgate_core::error::StoreError;
use fixgate_core::types::SessionId;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS sessions (
        session_key   TEXT PRIMARY KEY,
        creation_time INTEGER NOT NULL,
        sender_seq    INTEGER NOT NULL,
        target_seq    INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS messages (
        session_key TEXT NOT NULL,
        seq_num     INTEGER NOT NULL,
        body        BLOB NOT NULL,
        PRIMARY KEY (session_key, seq_num)
    );";

#[derive(Debug, Clone, Copy)]
struct SessionRow {
    creation_time: SystemTime,
    sender_seq: u64,
    target_seq: u64,
}

/// Message store backed by a SQL database.
#[derive(Debug)]
pub struct SqlStore {
    session_key: String,
    conn: Mutex<Connection>,
    cache: Mutex<SessionRow>,
}

impl SqlStore {
    /// Opens the store for `session_id` on an existing connection.
    ///
    /// # Errors
    /// Returns `StoreError::Database` if the schema cannot be created.
    pub fn with_connection(conn: Connection, session_id: &SessionId) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(database_error)?;
        let session_key = session_id.to_string();
        let row = load_or_insert_session(&conn, &session_key)?;
        debug!(session = %session_id, "sql store opened");
        Ok(Self {
            session_key,
            conn: Mutex::new(conn),
            cache: Mutex::new(row),
        })
    }

    /// Opens the store using `driver` and `url`.
    ///
    /// # Errors
    /// Returns `StoreError` if the driver is unsupported or the database
    /// cannot be opened.
    pub fn open(driver: &str, url: &str, session_id: &SessionId) -> Result<Self, StoreError> {
        Self::with_connection(database::open(driver, url)?, session_id)
    }

    fn write_seqs(&self, sender: u64, target: u64) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute(
                "UPDATE sessions SET sender_seq = ?1, target_seq = ?2 WHERE session_key = ?3",
                params![sender as i64, target as i64, self.session_key],
            )
            .map_err(database_error)?;
        Ok(())
    }
}

fn to_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn load_or_insert_session(conn: &Connection, key: &str) -> Result<SessionRow, StoreError> {
    let existing = conn
        .query_row(
            "SELECT creation_time, sender_seq, target_seq FROM sessions WHERE session_key = ?1",
            params![key],
            |row| {
                let created: i64 = row.get(0)?;
                let sender: i64 = row.get(1)?;
                let target: i64 = row.get(2)?;
                Ok(SessionRow {
                    creation_time: UNIX_EPOCH + Duration::from_millis(created.max(0) as u64),
                    sender_seq: sender.max(1) as u64,
                    target_seq: target.max(1) as u64,
                })
            },
        )
        .optional()
        .map_err(database_error)?;
    if let Some(row) = existing {
        return Ok(row);
    }

    let row = SessionRow {
        creation_time: SystemTime::now(),
        sender_seq: 1,
        target_seq: 1,
    };
    conn.execute(
        "INSERT INTO sessions (session_key, creation_time, sender_seq, target_seq) VALUES (?1, ?2, 1, 1)",
        params![key, to_millis(row.creation_time)],
    )
    .map_err(database_error)?;
    Ok(row)
}

#[async_trait]
impl MessageStore for SqlStore {
    async fn store(&self, seq_num: u64, message: &[u8]) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO messages (session_key, seq_num, body) VALUES (?1, ?2, ?3)",
                params![self.session_key, seq_num as i64, message],
            )
            .map_err(|e| StoreError::StoreFailed {
                seq_num,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn get_range(&self, begin: u64, end: u64) -> Result<Vec<Bytes>, StoreError> {
        let end = if end == 0 { i64::MAX } else { end as i64 };
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT body FROM messages WHERE session_key = ?1 AND seq_num BETWEEN ?2 AND ?3 ORDER BY seq_num",
            )
            .map_err(database_error)?;
        let rows = stmt
            .query_map(params![self.session_key, begin as i64, end], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .map_err(database_error)?;

        let mut found = Vec::new();
        for row in rows {
            found.push(Bytes::from(row.map_err(database_error)?));
        }
        if found.is_empty() {
            return Err(StoreError::RangeNotAvailable {
                range: begin..(end as u64).saturating_add(1),
            });
        }
        Ok(found)
    }

    fn next_sender_seq(&self) -> u64 {
        self.cache.lock().sender_seq
    }

    fn next_target_seq(&self) -> u64 {
        self.cache.lock().target_seq
    }

    fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError> {
        let mut cache = self.cache.lock();
        cache.sender_seq = seq;
        self.write_seqs(seq, cache.target_seq)
    }

    fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError> {
        let mut cache = self.cache.lock();
        cache.target_seq = seq;
        self.write_seqs(cache.sender_seq, seq)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let now = SystemTime::now();
        {
            let conn = self.conn.lock();
            conn.execute(
                "DELETE FROM messages WHERE session_key = ?1",
                params![self.session_key],
            )
            .map_err(database_error)?;
            conn.execute(
                "UPDATE sessions SET creation_time = ?1, sender_seq = 1, target_seq = 1 WHERE session_key = ?2",
                params![to_millis(now), self.session_key],
            )
            .map_err(database_error)?;
        }
        *self.cache.lock() = SessionRow {
            creation_time: now,
            sender_seq: 1,
            target_seq: 1,
        };
        Ok(())
    }

    fn creation_time(&self) -> SystemTime {
        self.cache.lock().creation_time
    }

    async fn refresh(&self) -> Result<(), StoreError> {
        let row = load_or_insert_session(&self.conn.lock(), &self.session_key)?;
        *self.cache.lock() = row;
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Location {
    Url { driver: String, url: String },
    Embedded(PathBuf),
}

/// Factory for [`SqlStore`].
#[derive(Debug, Clone)]
pub struct SqlStoreFactory {
    location: Location,
}

impl SqlStoreFactory {
    /// Creates a factory for an external database (`DatabaseDriver`).
    #[must_use]
    pub fn database(driver: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            location: Location::Url {
                driver: driver.into(),
                url: url.into(),
            },
        }
    }

    /// Creates a factory for a database kept in `dir` (`EmbeddedDatabaseDir`).
    #[must_use]
    pub fn embedded(dir: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::Embedded(dir.into()),
        }
    }

    /// Returns the configured driver name, if any.
    #[must_use]
    pub fn driver(&self) -> Option<&str> {
        match &self.location {
            Location::Url { driver, .. } => Some(driver),
            Location::Embedded(_) => None,
        }
    }
}

impl MessageStoreFactory for SqlStoreFactory {
    fn kind(&self) -> StoreKind {
        match self.location {
            Location::Url { .. } => StoreKind::Database,
            Location::Embedded(_) => StoreKind::EmbeddedDatabase,
        }
    }

    fn create(&self, session_id: &SessionId) -> Result<Arc<dyn MessageStore>, StoreError> {
        let store = match &self.location {
            Location::Url { driver, url } => SqlStore::open(driver, url, session_id)?,
            Location::Embedded(dir) => {
                fs::create_dir_all(dir)?;
                let path = database::embedded_path(dir);
                SqlStore::open(
                    database::SQLITE_DRIVER,
                    &path.to_string_lossy(),
                    session_id,
                )?
            }
        };
        Ok(Arc::new(store))
    }
}
