/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Database access shared by SQL-backed stores and logs.
//!
//! Only the `sqlite` driver is available. A `DatabaseUrl` of `:memory:`
//! opens a private in-memory database per connection.

use fixgate_core::error::StoreError;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Name of the only supported driver.
pub const SQLITE_DRIVER: &str = "sqlite";

/// File name used inside an embedded database directory.
pub const EMBEDDED_DATABASE_FILE: &str = "fixgate.db";

/// Returns true if `driver` names a supported database driver.
#[must_use]
pub fn is_supported_driver(driver: &str) -> bool {
    driver.trim().eq_ignore_ascii_case(SQLITE_DRIVER)
}

/// Opens a connection for `driver` at `url`.
///
/// # Errors
/// Returns `StoreError::UnsupportedDriver` for any driver other than
/// `sqlite`, or `StoreError::Database` if the database cannot be opened.
pub fn open(driver: &str, url: &str) -> Result<Connection, StoreError> {
    if !is_supported_driver(driver) {
        return Err(StoreError::UnsupportedDriver(driver.to_string()));
    }
    let url = url.strip_prefix("sqlite:").unwrap_or(url);
    Connection::open(url).map_err(database_error)
}

/// Returns the database file path for an embedded directory.
#[must_use]
pub fn embedded_path(dir: &Path) -> PathBuf {
    dir.join(EMBEDDED_DATABASE_FILE)
}

pub(crate) fn database_error(err: rusqlite::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_support() {
        assert!(is_supported_driver("sqlite"));
        assert!(is_supported_driver("SQLite"));
        assert!(!is_supported_driver("org.postgresql.Driver"));
    }

    #[test]
    fn test_open_rejects_unknown_driver() {
        assert!(matches!(
            open("com.mysql.Driver", ":memory:"),
            Err(StoreError::UnsupportedDriver(_))
        ));
        assert!(open("sqlite", ":memory:").is_ok());
        assert!(open("sqlite", "sqlite::memory:").is_ok());
    }
}
