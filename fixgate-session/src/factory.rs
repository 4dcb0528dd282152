/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Session construction from settings and resolved components.

use crate::application::Application;
use crate::config::SessionConfig;
use crate::error::FactoryError;
use crate::message_factory::MessageFactory;
use crate::session::Session;
use crate::settings::SessionSettings;
use fixgate_core::types::SessionId;
use fixgate_log::LogFactory;
use fixgate_store::MessageStoreFactory;
use std::sync::Arc;
use tracing::debug;

/// Builds [`Session`]s that share one set of components.
#[derive(Clone)]
pub struct SessionFactory {
    application: Arc<dyn Application>,
    store_factory: Arc<dyn MessageStoreFactory>,
    log_factory: Arc<dyn LogFactory>,
    message_factory: Arc<dyn MessageFactory>,
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("store_factory", &self.store_factory)
            .field("log_factory", &self.log_factory)
            .field("message_factory", &self.message_factory)
            .finish_non_exhaustive()
    }
}

impl SessionFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new(
        application: Arc<dyn Application>,
        store_factory: Arc<dyn MessageStoreFactory>,
        log_factory: Arc<dyn LogFactory>,
        message_factory: Arc<dyn MessageFactory>,
    ) -> Self {
        Self {
            application,
            store_factory,
            log_factory,
            message_factory,
        }
    }

    /// Creates the session `id` described in `settings`.
    ///
    /// The application's `on_create` callback has returned by the time the
    /// session is handed back.
    ///
    /// # Errors
    /// Returns `FactoryError` if the settings are invalid or the store or
    /// log cannot be opened.
    pub async fn create(
        &self,
        id: &SessionId,
        settings: &SessionSettings,
    ) -> Result<Arc<Session>, FactoryError> {
        let config = SessionConfig::from_settings(settings, id)?;
        let store = self.store_factory.create(id)?;
        let log = self.log_factory.create(id)?;
        debug!(session = %id, role = %config.role, "creating session");

        let session = Arc::new(Session::new(
            id.clone(),
            config,
            store,
            Arc::clone(&log),
            Arc::clone(&self.message_factory),
            Arc::clone(&self.application),
        ));
        log.on_event("Session created");
        self.application.on_create(id).await;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::NoOpApplication;
    use crate::message_factory::DefaultMessageFactory;
    use crate::settings::keys;
    use fixgate_core::error::ConfigError;
    use fixgate_core::types::ConnectionRole;
    use fixgate_log::StructuredLogFactory;
    use fixgate_store::MemoryStoreFactory;

    fn factory() -> SessionFactory {
        SessionFactory::new(
            Arc::new(NoOpApplication),
            Arc::new(MemoryStoreFactory),
            Arc::new(StructuredLogFactory::new("test")),
            Arc::new(DefaultMessageFactory),
        )
    }

    #[tokio::test]
    async fn test_create_session() {
        let id = SessionId::new("FIX.4.2", "TRADER", "MARKET");
        let mut settings = SessionSettings::default();
        settings.set_default(keys::CONNECTION_TYPE, "initiator");
        settings.add_session(id.clone());

        let session = factory().create(&id, &settings).await.unwrap();
        assert_eq!(session.id(), &id);
        assert_eq!(session.role(), ConnectionRole::Initiator);
        assert!(!session.status().is_connected());
    }

    #[tokio::test]
    async fn test_create_without_role_fails() {
        let id = SessionId::new("FIX.4.2", "TRADER", "MARKET");
        let mut settings = SessionSettings::default();
        settings.add_session(id.clone());

        let err = factory().create(&id, &settings).await.unwrap_err();
        assert!(matches!(err, FactoryError::Config(ConfigError::MissingSetting { .. })));
    }
}
