//! Socket Initiator Example
//!
//! Connects to the `socket_acceptor` example, sends a news message every
//! few seconds while logged on and stops on Ctrl-C.

use fixgate::prelude::*;
use std::time::Duration;
use tracing::{info, warn};
mod common;
use common::{config_dir, init_logging, print_event, shutdown_signal};

const SEND_INTERVAL: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let engine = EngineBuilder::new("fix:trader", "initiator.toml")
        .with_resource_root(config_dir())
        .start_immediately(true)
        .build()
        .await?;
    engine.add_event_listener(print_event);
    info!(
        store = %engine.components().store_kind(),
        log = %engine.components().log_kind(),
        "components"
    );

    let trader = SessionId::new("FIX.4.4", "TRADER", "MARKET");
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(SEND_INTERVAL);
    let mut headline = 0u32;
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticker.tick() => {
                let logged_on = engine.session(&trader).is_some_and(|s| s.is_logged_on());
                if !logged_on {
                    continue;
                }
                headline += 1;
                let news = Message::new(MsgType::News).with_field(tags::HEADLINE, format!("update {headline}"));
                if let Err(e) = engine.send_to_target(news, &trader).await {
                    warn!(error = %e, "send failed");
                }
            }
        }
    }

    engine.stop().await;
    Ok(())
}
