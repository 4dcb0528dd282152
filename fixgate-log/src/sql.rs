/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! SQL log.
//!
//! Chosen when a `DatabaseDriver` is configured without any other log
//! setting. Shares the driver and URL with the database message store.

use crate::traits::{Log, LogError, LogFactory, LogKind};
use fixgate_core::error::StoreError;
use fixgate_core::types::{SessionId, Timestamp};
use fixgate_store::database;
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::sync::Arc;
use tracing::warn;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS messages_log (
        session_key TEXT NOT NULL,
        time        TEXT NOT NULL,
        direction   TEXT NOT NULL,
        text        TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS event_log (
        session_key TEXT NOT NULL,
        time        TEXT NOT NULL,
        text        TEXT NOT NULL
    );";

/// Log writing rows into a SQL database.
#[derive(Debug)]
pub struct SqlLog {
    session_key: String,
    conn: Mutex<Connection>,
}

impl SqlLog {
    /// Opens the log for `session_id` using `driver` and `url`.
    ///
    /// # Errors
    /// Returns `LogError::Database` if the driver is unsupported or the
    /// schema cannot be created.
    pub fn open(driver: &str, url: &str, session_id: &SessionId) -> Result<Self, LogError> {
        let conn = database::open(driver, url)?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self {
            session_key: session_id.to_string(),
            conn: Mutex::new(conn),
        })
    }

    fn insert_message(&self, direction: &str, text: &str) {
        let result = self.conn.lock().execute(
            "INSERT INTO messages_log (session_key, time, direction, text) VALUES (?1, ?2, ?3, ?4)",
            params![
                self.session_key,
                Timestamp::now().to_string(),
                direction,
                text
            ],
        );
        if let Err(e) = result {
            warn!(session = %self.session_key, error = %e, "message log insert failed");
        }
    }

    /// Returns the number of message rows recorded for this session.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.conn
            .lock()
            .query_row(
                "SELECT COUNT(*) FROM messages_log WHERE session_key = ?1",
                params![self.session_key],
                |row| row.get::<_, i64>(0),
            )
            .map_or(0, |n| n.max(0) as usize)
    }
}

impl Log for SqlLog {
    fn on_incoming(&self, message: &str) {
        self.insert_message("incoming", message);
    }

    fn on_outgoing(&self, message: &str) {
        self.insert_message("outgoing", message);
    }

    fn on_event(&self, text: &str) {
        let result = self.conn.lock().execute(
            "INSERT INTO event_log (session_key, time, text) VALUES (?1, ?2, ?3)",
            params![self.session_key, Timestamp::now().to_string(), text],
        );
        if let Err(e) = result {
            warn!(session = %self.session_key, error = %e, "event log insert failed");
        }
    }

    fn clear(&self) {
        let conn = self.conn.lock();
        for table in ["messages_log", "event_log"] {
            let sql = format!("DELETE FROM {table} WHERE session_key = ?1");
            if let Err(e) = conn.execute(&sql, params![self.session_key]) {
                warn!(session = %self.session_key, error = %e, "log clear failed");
            }
        }
    }
}

/// Factory for [`SqlLog`].
#[derive(Debug, Clone)]
pub struct SqlLogFactory {
    driver: String,
    url: String,
}

impl SqlLogFactory {
    /// Creates a factory for `driver` at `url`.
    #[must_use]
    pub fn new(driver: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            url: url.into(),
        }
    }

    /// Returns the driver name.
    #[must_use]
    pub fn driver(&self) -> &str {
        &self.driver
    }
}

impl LogFactory for SqlLogFactory {
    fn kind(&self) -> LogKind {
        LogKind::Database
    }

    fn create(&self, session_id: &SessionId) -> Result<Arc<dyn Log>, LogError> {
        Ok(Arc::new(SqlLog::open(&self.driver, &self.url, session_id)?))
    }
}
