/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Engine construction from settings resources.

mod common;

use common::{in_process, resources};
use fixgate_core::error::ConfigError;
use fixgate_engine::{EngineBuilder, EngineError, ThreadModel};
use fixgate_log::{LogFactory, LogKind, ScreenLogFactory};
use fixgate_session::settings::{SessionSettings, keys};
use fixgate_session::{DefaultMessageFactory, MessageFactory};
use fixgate_store::{MemoryStoreFactory, MessageStoreFactory, StoreKind};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const INITIATOR: &str = r#"
[[session]]
BeginString = "FIX.4.2"
SenderCompID = "TRADER"
TargetCompID = "MARKET"
ConnectionType = "initiator"
SocketConnectPort = 5001
"#;

const ACCEPTOR: &str = r#"
[[session]]
BeginString = "FIX.4.2"
SenderCompID = "MARKET"
TargetCompID = "TRADER"
ConnectionType = "acceptor"
SocketAcceptProtocol = "VM_PIPE"
SocketAcceptPort = 5001
"#;

fn write(dir: &Path, name: &str, defaults: &str, sessions: &[&str]) {
    let mut document = format!("[default]\n{defaults}\n");
    for session in sessions {
        document.push_str(session);
    }
    fs::write(dir.join(name), document).unwrap();
}

async fn build(dir: &Path, name: &str) -> Result<fixgate_engine::Engine, EngineError> {
    EngineBuilder::new(format!("fix:{name}"), name)
        .with_resource_root(dir)
        .build()
        .await
}

#[tokio::test]
async fn test_default_initiator() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "initiator.toml", "", &[INITIATOR]);

    let engine = build(dir.path(), "initiator.toml").await.unwrap();
    assert_eq!(engine.uri(), "fix:initiator.toml");
    assert!(engine.initiator().is_some());
    assert!(engine.acceptor().is_none());
    assert_eq!(engine.thread_model(), ThreadModel::SingleThreaded);
    assert_eq!(engine.components().store_kind(), StoreKind::Memory);
    assert_eq!(engine.components().log_kind(), LogKind::Screen);
}

#[tokio::test]
async fn test_thread_per_session_acceptor() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "acceptor.toml",
        "ThreadModel = \"ThreadPerSession\"",
        &[ACCEPTOR],
    );

    let engine = build(dir.path(), "acceptor.toml").await.unwrap();
    assert!(engine.initiator().is_none());
    let acceptor = engine.acceptor().unwrap();
    assert_eq!(acceptor.thread_model(), ThreadModel::ThreadPerSession);
    assert_eq!(acceptor.endpoints().len(), 1);
}

#[tokio::test]
async fn test_both_roles() {
    let engine = in_process("fix:both").build().await.unwrap();
    assert!(engine.initiator().is_some());
    assert!(engine.acceptor().is_some());
    assert!(!engine.is_started());
}

#[tokio::test]
async fn test_database_store_with_screen_log() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "db.toml",
        "DatabaseDriver = \"sqlite\"\nScreenLogEvents = true",
        &[INITIATOR],
    );

    let engine = build(dir.path(), "db.toml").await.unwrap();
    assert_eq!(engine.components().store_kind(), StoreKind::Database);
    assert_eq!(engine.components().log_kind(), LogKind::Screen);
}

#[tokio::test]
async fn test_database_driver_implies_database_log() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "db.toml", "DatabaseDriver = \"sqlite\"", &[INITIATOR]);

    let engine = build(dir.path(), "db.toml").await.unwrap();
    assert_eq!(engine.components().store_kind(), StoreKind::Database);
    assert_eq!(engine.components().log_kind(), LogKind::Database);
}

#[tokio::test]
async fn test_ambiguous_message_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");
    write(
        dir.path(),
        "ambiguous.toml",
        &format!(
            "FileStorePath = {:?}\nDatabaseDriver = \"sqlite\"",
            store.display().to_string()
        ),
        &[INITIATOR],
    );

    let error = build(dir.path(), "ambiguous.toml").await.unwrap_err();
    assert!(matches!(error, EngineError::Config(ConfigError::Ambiguous { .. })));
    assert!(error.to_string().contains("Ambiguous message store"));
}

#[tokio::test]
async fn test_ambiguous_log() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("logs");
    write(
        dir.path(),
        "ambiguous.toml",
        &format!(
            "FileLogPath = {:?}\nScreenLogEvents = true",
            logs.display().to_string()
        ),
        &[INITIATOR],
    );

    let error = build(dir.path(), "ambiguous.toml").await.unwrap_err();
    assert!(error.to_string().contains("Ambiguous log"));
}

#[tokio::test]
async fn test_explicit_factories_are_used_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "ambiguous.toml",
        "FileStorePath = \"unused\"\nDatabaseDriver = \"sqlite\"\nFileLogPath = \"unused\"\nScreenLogEvents = true",
        &[INITIATOR],
    );

    let store: Arc<dyn MessageStoreFactory> = Arc::new(MemoryStoreFactory);
    let log: Arc<dyn LogFactory> = Arc::new(ScreenLogFactory::new());
    let messages: Arc<dyn MessageFactory> = Arc::new(DefaultMessageFactory);
    let engine = EngineBuilder::new("fix:explicit", "ambiguous.toml")
        .with_resource_root(dir.path())
        .with_message_store_factory(Arc::clone(&store))
        .with_log_factory(Arc::clone(&log))
        .with_message_factory(Arc::clone(&messages))
        .build()
        .await
        .unwrap();

    assert!(std::ptr::addr_eq(
        Arc::as_ptr(engine.message_store_factory()),
        Arc::as_ptr(&store)
    ));
    assert!(std::ptr::addr_eq(Arc::as_ptr(engine.log_factory()), Arc::as_ptr(&log)));
    assert!(std::ptr::addr_eq(
        Arc::as_ptr(engine.message_factory()),
        Arc::as_ptr(&messages)
    ));
}

#[tokio::test]
async fn test_resolution_is_deterministic() {
    let settings = SessionSettings::load(resources().join("inprocess.toml")).unwrap();
    let first = EngineBuilder::new("fix:a", "unused.toml")
        .with_settings(settings.clone())
        .build()
        .await
        .unwrap();
    let second = EngineBuilder::new("fix:b", "unused.toml")
        .with_settings(settings)
        .build()
        .await
        .unwrap();
    assert_eq!(first.components().store_kind(), second.components().store_kind());
    assert_eq!(first.components().log_kind(), second.components().log_kind());
}

#[tokio::test]
async fn test_missing_resource_is_invalid_argument() {
    let result = EngineBuilder::new("fix:missing", "bogus.cfg")
        .with_resource_root(resources())
        .build()
        .await;
    assert!(matches!(
        result,
        Err(EngineError::Config(ConfigError::InvalidArgument(_)))
    ));
}

#[tokio::test]
async fn test_management_disabled_by_default() {
    let engine = in_process("fix:unmanaged").build().await.unwrap();
    engine.start().await.unwrap();
    assert!(engine.management().query("org.fixgate:*").unwrap().is_empty());
    engine.stop().await;
}

#[tokio::test]
async fn test_management_enabled() {
    let mut settings = SessionSettings::load(resources().join("inprocess.toml")).unwrap();
    settings.set_default(keys::USE_MANAGEMENT, "Y");
    let engine = EngineBuilder::new("fix:managed", "unused.toml")
        .with_settings(settings)
        .start_immediately(true)
        .build()
        .await
        .unwrap();

    for role in ["Initiator", "Acceptor"] {
        let names = engine
            .management()
            .query(&format!("org.fixgate:type=Connector,role={role},*"))
            .unwrap();
        assert_eq!(names.len(), 1, "no {role} registered");
    }

    engine.stop().await;
    assert!(engine.management().query("org.fixgate:*").unwrap().is_empty());
}
