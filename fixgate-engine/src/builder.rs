/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Engine builder for fluent configuration.
//!
//! The builder loads the settings resource, resolves the engine components
//! and constructs one connector per role found in the settings. Any
//! failure aborts the build; no partially built engine is returned.

use crate::connector::{Acceptor, Initiator, ThreadModel};
use crate::engine::{Engine, EngineParts};
use crate::error::Result;
use crate::events::EventDispatcher;
use crate::resolver::{self, ExplicitComponents};
use crate::resource;
use fixgate_core::error::ConfigError;
use fixgate_core::types::{ConnectionRole, SessionId};
use fixgate_log::LogFactory;
use fixgate_session::settings::{SessionSettings, keys};
use fixgate_session::{Application, MessageFactory, SessionFactory};
use fixgate_store::MessageStoreFactory;
use fixgate_transport::{PipeHub, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Builder for configuring a FIX engine.
#[derive(Debug)]
pub struct EngineBuilder {
    /// Identifier echoed back by [`Engine::uri`].
    uri: String,
    /// Settings resource name.
    resource: String,
    /// Directories the resource is looked up in.
    roots: Vec<PathBuf>,
    /// Pre-parsed settings, used instead of the resource.
    settings: Option<SessionSettings>,
    /// Whether `build` also starts the engine.
    start_immediately: bool,
    /// Caller-supplied factories.
    explicit: ExplicitComponents,
    /// Hub for in-process endpoints.
    pipes: Option<Arc<PipeHub>>,
}

impl EngineBuilder {
    /// Creates a builder for an engine named `uri`, configured by the
    /// settings resource `resource`.
    #[must_use]
    pub fn new(uri: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            resource: resource.into(),
            roots: Vec::new(),
            settings: None,
            start_immediately: false,
            explicit: ExplicitComponents::default(),
            pipes: None,
        }
    }

    /// Adds a directory to look the settings resource up in.
    ///
    /// Roots are searched in the order they were added. Without any root
    /// the resource is resolved against the current directory.
    #[must_use]
    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Uses already parsed settings instead of loading the resource.
    #[must_use]
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Starts the engine at the end of `build`.
    #[must_use]
    pub const fn start_immediately(mut self, start: bool) -> Self {
        self.start_immediately = start;
        self
    }

    /// Uses `factory` for message stores instead of inferring one.
    #[must_use]
    pub fn with_message_store_factory(mut self, factory: Arc<dyn MessageStoreFactory>) -> Self {
        self.explicit.message_store_factory = Some(factory);
        self
    }

    /// Uses `factory` for logs instead of inferring one.
    #[must_use]
    pub fn with_log_factory(mut self, factory: Arc<dyn LogFactory>) -> Self {
        self.explicit.log_factory = Some(factory);
        self
    }

    /// Uses `factory` for messages instead of the default one.
    #[must_use]
    pub fn with_message_factory(mut self, factory: Arc<dyn MessageFactory>) -> Self {
        self.explicit.message_factory = Some(factory);
        self
    }

    /// Shares an in-process pipe hub with other engines.
    ///
    /// Engines built without one get a private hub, so their `VM_PIPE`
    /// ports never collide.
    #[must_use]
    pub fn with_pipe_hub(mut self, pipes: Arc<PipeHub>) -> Self {
        self.pipes = Some(pipes);
        self
    }

    /// Returns the engine identifier.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the settings resource name.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Builds the engine.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidArgument` (wrapped in
    /// `EngineError::Config`) if the settings resource cannot be read,
    /// `ConfigError::Ambiguous` if the components cannot be resolved, any
    /// other `ConfigError` for a missing or malformed setting, and the
    /// start error if `start_immediately` was requested.
    pub async fn build(self) -> Result<Engine> {
        let settings = match self.settings {
            Some(settings) => settings,
            None => resource::load(&self.resource, &self.roots)?,
        };
        let settings = Arc::new(settings);

        let components = resolver::resolve(&settings, self.explicit)?;
        let thread_model = ThreadModel::from_settings(&settings)?;
        let use_management = settings.get_bool_or(None, keys::USE_MANAGEMENT, false)?;
        let (initiator_ids, acceptor_ids) = partition(&settings)?;

        let dispatcher = Arc::new(EventDispatcher::new());
        let application: Arc<dyn Application> = Arc::clone(&dispatcher) as Arc<dyn Application>;
        let factory = SessionFactory::new(
            application,
            Arc::clone(components.message_store_factory()),
            Arc::clone(components.log_factory()),
            Arc::clone(components.message_factory()),
        );
        let transport = Transport::new(self.pipes.unwrap_or_default());

        let initiator = (!initiator_ids.is_empty()).then(|| {
            Initiator::new(
                thread_model,
                Arc::clone(&settings),
                initiator_ids,
                factory.clone(),
                transport.clone(),
            )
        });
        let acceptor = if acceptor_ids.is_empty() {
            None
        } else {
            Some(
                Acceptor::new(
                    thread_model,
                    Arc::clone(&settings),
                    acceptor_ids,
                    factory,
                    transport,
                )
                .await?,
            )
        };

        debug!(
            uri = %self.uri,
            %thread_model,
            initiator = initiator.is_some(),
            acceptor = acceptor.is_some(),
            "connectors built"
        );
        let engine = Engine::from_parts(EngineParts {
            uri: self.uri,
            settings,
            components,
            thread_model,
            initiator,
            acceptor,
            dispatcher,
            use_management,
        });
        if self.start_immediately {
            engine.start().await?;
        }
        info!(uri = %engine.uri(), "engine built");
        Ok(engine)
    }
}

/// Splits the configured sessions by `ConnectionType`.
fn partition(
    settings: &SessionSettings,
) -> std::result::Result<(Vec<SessionId>, Vec<SessionId>), ConfigError> {
    let mut initiators = Vec::new();
    let mut acceptors = Vec::new();
    for id in settings.session_ids() {
        let raw = settings.get_string(Some(id), keys::CONNECTION_TYPE)?;
        match raw.parse::<ConnectionRole>() {
            Ok(ConnectionRole::Initiator) => initiators.push(id.clone()),
            Ok(ConnectionRole::Acceptor) => acceptors.push(id.clone()),
            Err(value) => {
                return Err(ConfigError::InvalidSetting {
                    key: keys::CONNECTION_TYPE.to_string(),
                    value,
                    session: Some(id.to_string()),
                });
            }
        }
    }
    Ok((initiators, acceptors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn session(settings: &mut SessionSettings, sender: &str, target: &str, role: &str) -> SessionId {
        let id = SessionId::new("FIX.4.2", sender, target);
        settings.add_session(id.clone());
        settings.set(&id, keys::CONNECTION_TYPE, role);
        id
    }

    #[test]
    fn test_partition_by_connection_type() {
        let mut settings = SessionSettings::new();
        let a = session(&mut settings, "MARKET", "TRADER", "acceptor");
        let i = session(&mut settings, "TRADER", "MARKET", "Initiator");

        let (initiators, acceptors) = partition(&settings).unwrap();
        assert_eq!(initiators, vec![i]);
        assert_eq!(acceptors, vec![a]);
    }

    #[test]
    fn test_partition_rejects_unknown_role() {
        let mut settings = SessionSettings::new();
        session(&mut settings, "MARKET", "TRADER", "listener");
        assert!(matches!(
            partition(&settings),
            Err(ConfigError::InvalidSetting { value, .. }) if value == "listener"
        ));

        let mut settings = SessionSettings::new();
        settings.add_session(SessionId::new("FIX.4.2", "MARKET", "TRADER"));
        assert!(matches!(
            partition(&settings),
            Err(ConfigError::MissingSetting { .. })
        ));
    }

    #[tokio::test]
    async fn test_initiator_only() {
        let mut settings = SessionSettings::new();
        session(&mut settings, "TRADER", "MARKET", "initiator");

        let engine = EngineBuilder::new("fix:initiator", "unused.toml")
            .with_settings(settings)
            .build()
            .await
            .unwrap();
        assert_eq!(engine.uri(), "fix:initiator");
        assert!(engine.initiator().is_some());
        assert!(engine.acceptor().is_none());
        assert_eq!(engine.thread_model(), ThreadModel::SingleThreaded);
    }

    #[tokio::test]
    async fn test_acceptor_requires_port() {
        let mut settings = SessionSettings::new();
        session(&mut settings, "MARKET", "TRADER", "acceptor");

        let result = EngineBuilder::new("fix:acceptor", "unused.toml")
            .with_settings(settings)
            .build()
            .await;
        assert!(matches!(
            result,
            Err(EngineError::Config(ConfigError::MissingSetting { .. }))
        ));
    }

    #[tokio::test]
    async fn test_thread_per_session() {
        let mut settings = SessionSettings::new();
        settings.set_default(keys::THREAD_MODEL, "ThreadPerSession");
        settings.set_default(keys::SOCKET_ACCEPT_PROTOCOL, "VM_PIPE");
        let id = session(&mut settings, "MARKET", "TRADER", "acceptor");
        settings.set(&id, keys::SOCKET_ACCEPT_PORT, "6201");

        let engine = EngineBuilder::new("fix:acceptor", "unused.toml")
            .with_settings(settings)
            .build()
            .await
            .unwrap();
        let acceptor = engine.acceptor().unwrap();
        assert_eq!(acceptor.thread_model(), ThreadModel::ThreadPerSession);
        assert_eq!(acceptor.session_ids(), &[id.clone()]);
        assert!(acceptor.session(&id).is_some());
        assert!(engine.initiator().is_none());
    }

    #[tokio::test]
    async fn test_missing_resource() {
        let dir = tempfile::tempdir().unwrap();
        let result = EngineBuilder::new("fix:missing", "bogus.cfg")
            .with_resource_root(dir.path())
            .build()
            .await;
        assert!(matches!(
            result,
            Err(EngineError::Config(ConfigError::InvalidArgument(_)))
        ));
    }

    #[tokio::test]
    async fn test_ambiguous_store_aborts_build() {
        let mut settings = SessionSettings::new();
        settings.set_default(keys::FILE_STORE_PATH, "target/store");
        settings.set_default(keys::DATABASE_DRIVER, "sqlite");
        session(&mut settings, "TRADER", "MARKET", "initiator");

        let result = EngineBuilder::new("fix:ambiguous", "unused.toml")
            .with_settings(settings)
            .build()
            .await;
        match result {
            Err(EngineError::Config(e)) => assert!(e.to_string().contains("Ambiguous message store")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
