/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Component resolution.
//!
//! Picks the message store, log and message factory an engine wires into
//! every session. Caller-supplied factories are used as given; otherwise
//! the kind is inferred from which settings keys are present anywhere in
//! the document.
//!
//! Inference is an ordered rule list. Every rule is evaluated and the set
//! of matching kinds is collected, so a document that implies two kinds is
//! rejected no matter which key appears first.

use fixgate_core::error::ConfigError;
use fixgate_log::{
    FileLogFactory, LogFactory, LogKind, ScreenLogFactory, ScreenLogOptions, SqlLogFactory,
    StructuredLogFactory,
};
use fixgate_session::settings::{SessionSettings, keys};
use fixgate_session::{DefaultMessageFactory, MessageFactory};
use fixgate_store::{FileStoreFactory, MemoryStoreFactory, MessageStoreFactory, SqlStoreFactory, StoreKind};
use std::sync::Arc;
use tracing::debug;

/// Database URL used when `DatabaseDriver` is set without `DatabaseUrl`.
pub const DEFAULT_DATABASE_URL: &str = ":memory:";

/// An inference rule: any of `keys` present implies `kind`.
#[derive(Debug)]
struct Rule<K> {
    keys: &'static [&'static str],
    kind: K,
}

const STORE_RULES: &[Rule<StoreKind>] = &[
    Rule {
        keys: &[keys::FILE_STORE_PATH],
        kind: StoreKind::File,
    },
    Rule {
        keys: &[keys::DATABASE_DRIVER],
        kind: StoreKind::Database,
    },
    Rule {
        keys: &[keys::EMBEDDED_DATABASE_DIR],
        kind: StoreKind::EmbeddedDatabase,
    },
];

const LOG_RULES: &[Rule<LogKind>] = &[
    Rule {
        keys: &[keys::FILE_LOG_PATH],
        kind: LogKind::File,
    },
    Rule {
        keys: &[keys::LOG_EVENT_CATEGORY],
        kind: LogKind::Structured,
    },
    Rule {
        keys: &[
            keys::SCREEN_LOG_EVENTS,
            keys::SCREEN_LOG_SHOW_INCOMING,
            keys::SCREEN_LOG_SHOW_OUTGOING,
        ],
        kind: LogKind::Screen,
    },
];

/// Factories supplied by the caller. `None` slots are inferred.
#[derive(Debug, Clone, Default)]
pub struct ExplicitComponents {
    /// Message store factory to use verbatim.
    pub message_store_factory: Option<Arc<dyn MessageStoreFactory>>,
    /// Log factory to use verbatim.
    pub log_factory: Option<Arc<dyn LogFactory>>,
    /// Message factory to use verbatim.
    pub message_factory: Option<Arc<dyn MessageFactory>>,
}

/// The store, log and message factories chosen for an engine.
#[derive(Debug, Clone)]
pub struct ResolvedComponents {
    message_store_factory: Arc<dyn MessageStoreFactory>,
    log_factory: Arc<dyn LogFactory>,
    message_factory: Arc<dyn MessageFactory>,
}

impl ResolvedComponents {
    /// Returns the message store factory.
    #[must_use]
    pub fn message_store_factory(&self) -> &Arc<dyn MessageStoreFactory> {
        &self.message_store_factory
    }

    /// Returns the log factory.
    #[must_use]
    pub fn log_factory(&self) -> &Arc<dyn LogFactory> {
        &self.log_factory
    }

    /// Returns the message factory.
    #[must_use]
    pub fn message_factory(&self) -> &Arc<dyn MessageFactory> {
        &self.message_factory
    }

    /// Returns the kind of the message store factory.
    #[must_use]
    pub fn store_kind(&self) -> StoreKind {
        self.message_store_factory.kind()
    }

    /// Returns the kind of the log factory.
    #[must_use]
    pub fn log_kind(&self) -> LogKind {
        self.log_factory.kind()
    }
}

/// Resolves the engine components from `settings`.
///
/// # Errors
/// Returns `ConfigError::Ambiguous` when the settings imply more than one
/// store or more than one log, or `ConfigError::InvalidSetting` when a
/// screen log flag is not a boolean.
pub fn resolve(
    settings: &SessionSettings,
    explicit: ExplicitComponents,
) -> Result<ResolvedComponents, ConfigError> {
    let message_store_factory = match explicit.message_store_factory {
        Some(factory) => factory,
        None => store_factory(settings, infer_store(settings)?),
    };
    let log_factory = match explicit.log_factory {
        Some(factory) => factory,
        None => log_factory(settings, infer_log(settings)?)?,
    };
    let message_factory = explicit
        .message_factory
        .unwrap_or_else(|| Arc::new(DefaultMessageFactory));

    debug!(
        store = %message_store_factory.kind(),
        log = %log_factory.kind(),
        "resolved engine components"
    );
    Ok(ResolvedComponents {
        message_store_factory,
        log_factory,
        message_factory,
    })
}

/// Infers the message store kind. Memory when no rule matches.
///
/// # Errors
/// Returns `ConfigError::Ambiguous` if more than one store kind is implied.
pub fn infer_store(settings: &SessionSettings) -> Result<StoreKind, ConfigError> {
    Ok(infer(settings, STORE_RULES, "message store")?.unwrap_or(StoreKind::Memory))
}

/// Infers the log kind.
///
/// A configured `DatabaseDriver` selects the database log when no log key
/// is present at all; otherwise the screen log is the fallback.
///
/// # Errors
/// Returns `ConfigError::Ambiguous` if more than one log kind is implied.
pub fn infer_log(settings: &SessionSettings) -> Result<LogKind, ConfigError> {
    Ok(match infer(settings, LOG_RULES, "log")? {
        Some(kind) => kind,
        None if settings.is_set_anywhere(keys::DATABASE_DRIVER) => LogKind::Database,
        None => LogKind::Screen,
    })
}

fn infer<K: Copy + PartialEq>(
    settings: &SessionSettings,
    rules: &[Rule<K>],
    category: &'static str,
) -> Result<Option<K>, ConfigError> {
    let mut found = None;
    for rule in rules {
        if !rule.keys.iter().any(|key| settings.is_set_anywhere(key)) {
            continue;
        }
        match found {
            Some(kind) if kind != rule.kind => return Err(ConfigError::Ambiguous { category }),
            _ => found = Some(rule.kind),
        }
    }
    Ok(found)
}

fn store_factory(settings: &SessionSettings, kind: StoreKind) -> Arc<dyn MessageStoreFactory> {
    let value = |key| settings.first_value(key).unwrap_or_default();
    match kind {
        StoreKind::File => Arc::new(FileStoreFactory::new(value(keys::FILE_STORE_PATH))),
        StoreKind::Database => Arc::new(SqlStoreFactory::database(
            value(keys::DATABASE_DRIVER),
            database_url(settings),
        )),
        StoreKind::EmbeddedDatabase => {
            Arc::new(SqlStoreFactory::embedded(value(keys::EMBEDDED_DATABASE_DIR)))
        }
        StoreKind::Memory | StoreKind::Custom => Arc::new(MemoryStoreFactory),
    }
}

fn log_factory(
    settings: &SessionSettings,
    kind: LogKind,
) -> Result<Arc<dyn LogFactory>, ConfigError> {
    let value = |key| settings.first_value(key).unwrap_or_default();
    Ok(match kind {
        LogKind::File => Arc::new(FileLogFactory::new(value(keys::FILE_LOG_PATH))),
        LogKind::Structured => Arc::new(StructuredLogFactory::new(value(keys::LOG_EVENT_CATEGORY))),
        LogKind::Database => Arc::new(SqlLogFactory::new(
            value(keys::DATABASE_DRIVER),
            database_url(settings),
        )),
        LogKind::Screen | LogKind::Custom => {
            let options = ScreenLogOptions {
                incoming: settings.first_bool(keys::SCREEN_LOG_SHOW_INCOMING, true)?,
                outgoing: settings.first_bool(keys::SCREEN_LOG_SHOW_OUTGOING, true)?,
                events: settings.first_bool(keys::SCREEN_LOG_EVENTS, true)?,
            };
            Arc::new(ScreenLogFactory::new().with_options(options))
        }
    })
}

fn database_url(settings: &SessionSettings) -> &str {
    settings
        .first_value(keys::DATABASE_URL)
        .unwrap_or(DEFAULT_DATABASE_URL)
}
