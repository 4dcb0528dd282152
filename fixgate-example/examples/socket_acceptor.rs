//! Socket Acceptor Example
//!
//! Accepts TRADER on 127.0.0.1:9878 until Ctrl-C. Run `socket_initiator`
//! in another terminal to connect.

use fixgate::prelude::*;
use tracing::info;
mod common;
use common::{config_dir, init_logging, print_event, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let engine = EngineBuilder::new("fix:market", "acceptor.toml")
        .with_resource_root(config_dir())
        .build()
        .await?;
    engine.add_event_listener(print_event);
    engine.start().await?;

    if let Some(acceptor) = engine.acceptor() {
        for endpoint in acceptor.endpoints() {
            info!(%endpoint, thread_model = %acceptor.thread_model(), "listening");
        }
    }
    shutdown_signal().await;
    engine.stop().await;
    Ok(())
}
