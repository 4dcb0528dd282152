/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Log and log factory traits.

use fixgate_core::error::StoreError;
use fixgate_core::types::SessionId;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while opening a log.
#[derive(Debug, Error)]
pub enum LogError {
    /// Log file could not be opened.
    #[error("log i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Database backed log could not be opened.
    #[error("log database error: {0}")]
    Database(#[from] StoreError),
}

/// Per-session sink for message traffic and session events.
///
/// Writes never fail the session; implementations report their own
/// failures through `tracing`.
pub trait Log: Send + Sync {
    /// Records an inbound frame.
    fn on_incoming(&self, message: &str);

    /// Records an outbound frame.
    fn on_outgoing(&self, message: &str);

    /// Records a session event.
    fn on_event(&self, text: &str);

    /// Discards everything recorded so far.
    fn clear(&self) {}
}

/// The family a log factory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// Standard output.
    Screen,
    /// Flat files under a directory.
    File,
    /// Records emitted through `tracing`.
    Structured,
    /// Rows in a SQL database.
    Database,
    /// A caller supplied implementation.
    Custom,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Screen => "screen",
            Self::File => "file",
            Self::Structured => "structured",
            Self::Database => "database",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Creates one [`Log`] per session.
pub trait LogFactory: Send + Sync + fmt::Debug {
    /// Returns the family of logs this factory produces.
    fn kind(&self) -> LogKind {
        LogKind::Custom
    }

    /// Creates the log for `session_id`.
    ///
    /// # Errors
    /// Returns `LogError` if the log destination cannot be opened.
    fn create(&self, session_id: &SessionId) -> Result<Arc<dyn Log>, LogError>;
}

/// Replaces SOH delimiters with `|` for human readable output.
#[must_use]
pub fn printable(frame: &str) -> String {
    frame.replace('\x01', "|")
}
