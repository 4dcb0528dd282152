/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Log records emitted through `tracing`.
//!
//! Selected by the `LogEventCategory` setting; the category is attached to
//! every record so subscribers can route FIX traffic separately.

use crate::traits::{Log, LogError, LogFactory, LogKind, printable};
use fixgate_core::types::SessionId;
use std::sync::Arc;
use tracing::info;

/// Log forwarding to the active `tracing` subscriber.
#[derive(Debug)]
pub struct StructuredLog {
    category: String,
    session: String,
}

impl Log for StructuredLog {
    fn on_incoming(&self, message: &str) {
        info!(
            target: "fixgate::fix",
            category = %self.category,
            session = %self.session,
            direction = "incoming",
            message = %printable(message)
        );
    }

    fn on_outgoing(&self, message: &str) {
        info!(
            target: "fixgate::fix",
            category = %self.category,
            session = %self.session,
            direction = "outgoing",
            message = %printable(message)
        );
    }

    fn on_event(&self, text: &str) {
        info!(
            target: "fixgate::fix",
            category = %self.category,
            session = %self.session,
            event = %text
        );
    }
}

/// Factory for [`StructuredLog`].
#[derive(Debug, Clone)]
pub struct StructuredLogFactory {
    category: String,
}

impl StructuredLogFactory {
    /// Creates a factory tagging records with `category`.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }

    /// Returns the event category.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }
}

impl LogFactory for StructuredLogFactory {
    fn kind(&self) -> LogKind {
        LogKind::Structured
    }

    fn create(&self, session_id: &SessionId) -> Result<Arc<dyn Log>, LogError> {
        Ok(Arc::new(StructuredLog {
            category: self.category.clone(),
            session: session_id.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_factory() {
        let factory = StructuredLogFactory::new("fix.events");
        assert_eq!(factory.kind(), LogKind::Structured);
        assert_eq!(factory.category(), "fix.events");

        let log = factory.create(&SessionId::new("FIX.4.4", "A", "B")).unwrap();
        log.on_outgoing("8=FIX.4.4\x0135=0\x01");
        log.on_event("Logon");
    }
}
