/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! File log.
//!
//! Writes `<session>.messages.log` and `<session>.event.log` under the
//! configured `FileLogPath`.

use crate::traits::{Log, LogError, LogFactory, LogKind};
use fixgate_core::types::{SessionId, Timestamp};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug)]
struct Sink {
    path: PathBuf,
    file: Mutex<File>,
}

impl Sink {
    fn open(path: PathBuf) -> Result<Self, LogError> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    fn append(&self, line: &str) {
        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{}: {}", Timestamp::now(), line) {
            warn!(path = %self.path.display(), error = %e, "log write failed");
        }
    }

    fn truncate(&self) {
        match File::create(&self.path) {
            Ok(fresh) => *self.file.lock() = fresh,
            Err(e) => warn!(path = %self.path.display(), error = %e, "log truncate failed"),
        }
    }
}

/// Log appending to per-session files.
#[derive(Debug)]
pub struct FileLog {
    messages: Sink,
    events: Sink,
}

impl FileLog {
    /// Opens the log files for `session_id` under `dir`.
    ///
    /// # Errors
    /// Returns `LogError::Io` if the directory or files cannot be created.
    pub fn open(dir: impl AsRef<Path>, session_id: &SessionId) -> Result<Self, LogError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let stem = session_id.file_stem();
        Ok(Self {
            messages: Sink::open(dir.join(format!("{stem}.messages.log")))?,
            events: Sink::open(dir.join(format!("{stem}.event.log")))?,
        })
    }
}

impl Log for FileLog {
    fn on_incoming(&self, message: &str) {
        self.messages.append(message);
    }

    fn on_outgoing(&self, message: &str) {
        self.messages.append(message);
    }

    fn on_event(&self, text: &str) {
        self.events.append(text);
    }

    fn clear(&self) {
        self.messages.truncate();
        self.events.truncate();
    }
}

/// Factory for [`FileLog`], configured by `FileLogPath`.
#[derive(Debug, Clone)]
pub struct FileLogFactory {
    path: PathBuf,
}

impl FileLogFactory {
    /// Creates a factory writing under `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the log directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogFactory for FileLogFactory {
    fn kind(&self) -> LogKind {
        LogKind::File
    }

    fn create(&self, session_id: &SessionId) -> Result<Arc<dyn Log>, LogError> {
        Ok(Arc::new(FileLog::open(&self.path, session_id)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_log_writes_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let id = SessionId::new("FIX.4.2", "TRADER", "MARKET");
        let log = FileLogFactory::new(dir.path()).create(&id).unwrap();

        log.on_outgoing("8=FIX.4.2\x0135=A\x01");
        log.on_event("Created session");

        let stem = id.file_stem();
        let messages = fs::read_to_string(dir.path().join(format!("{stem}.messages.log"))).unwrap();
        let events = fs::read_to_string(dir.path().join(format!("{stem}.event.log"))).unwrap();
        assert!(messages.contains("35=A"));
        assert!(events.contains("Created session"));

        log.clear();
        let messages = fs::read_to_string(dir.path().join(format!("{stem}.messages.log"))).unwrap();
        assert!(messages.is_empty());
    }
}
