//! Common utilities shared across examples.

#![allow(dead_code)]

use fixgate::prelude::*;
use std::path::PathBuf;

/// Directory holding the example settings documents.
pub fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

/// Initializes logging for examples.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

/// Prints every session event.
pub fn print_event(category: EventCategory, id: &SessionId, message: Option<&Message>) -> ListenerResult {
    match message {
        Some(message) => tracing::info!(%category, session = %id, msg_type = %message.msg_type(), "event"),
        None => tracing::info!(%category, session = %id, "event"),
    }
    Ok(())
}

/// Waits for Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c");
    }
}
