/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Standard output log.

use crate::traits::{Log, LogError, LogFactory, LogKind, printable};
use fixgate_core::types::{SessionId, Timestamp};
use std::io::Write;
use std::sync::Arc;

/// Which records a [`ScreenLog`] prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLogOptions {
    /// Print inbound frames.
    pub incoming: bool,
    /// Print outbound frames.
    pub outgoing: bool,
    /// Print session events.
    pub events: bool,
}

impl Default for ScreenLogOptions {
    fn default() -> Self {
        Self {
            incoming: true,
            outgoing: true,
            events: true,
        }
    }
}

/// Log printing to standard output.
#[derive(Debug)]
pub struct ScreenLog {
    session: String,
    options: ScreenLogOptions,
}

impl ScreenLog {
    /// Creates a screen log for `session_id`.
    #[must_use]
    pub fn new(session_id: &SessionId, options: ScreenLogOptions) -> Self {
        Self {
            session: session_id.to_string(),
            options,
        }
    }

    fn print(&self, label: &str, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(
            out,
            "<{}, {}, {}> ({})",
            Timestamp::now(),
            self.session,
            label,
            text
        );
    }
}

impl Log for ScreenLog {
    fn on_incoming(&self, message: &str) {
        if self.options.incoming {
            self.print("incoming", &printable(message));
        }
    }

    fn on_outgoing(&self, message: &str) {
        if self.options.outgoing {
            self.print("outgoing", &printable(message));
        }
    }

    fn on_event(&self, text: &str) {
        if self.options.events {
            self.print("event", text);
        }
    }
}

/// Factory for [`ScreenLog`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenLogFactory {
    options: ScreenLogOptions,
}

impl ScreenLogFactory {
    /// Creates a factory printing every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets which records are printed.
    #[must_use]
    pub const fn with_options(mut self, options: ScreenLogOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the configured options.
    #[must_use]
    pub const fn options(&self) -> ScreenLogOptions {
        self.options
    }
}

impl LogFactory for ScreenLogFactory {
    fn kind(&self) -> LogKind {
        LogKind::Screen
    }

    fn create(&self, session_id: &SessionId) -> Result<Arc<dyn Log>, LogError> {
        Ok(Arc::new(ScreenLog::new(session_id, self.options)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_factory_options() {
        let options = ScreenLogOptions {
            incoming: false,
            ..ScreenLogOptions::default()
        };
        let factory = ScreenLogFactory::new().with_options(options);
        assert_eq!(factory.kind(), LogKind::Screen);
        assert!(!factory.options().incoming);
        assert!(factory.options().events);

        let log = factory
            .create(&SessionId::new("FIX.4.2", "A", "B"))
            .unwrap();
        log.on_incoming("8=FIX.4.2\x0135=0\x01");
        log.on_event("created");
    }
}
