//! In-process Engine Example
//!
//! Builds one engine holding both roles, waits for the logons, sends an
//! email from TRADER to MARKET and stops.

use fixgate::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;
mod common;
use common::{config_dir, init_logging, print_event};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let engine = EngineBuilder::new("fix:inprocess", "inprocess.toml")
        .with_resource_root(config_dir())
        .build()
        .await?;
    engine.add_event_listener(print_event);

    let logons = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&logons);
    engine.add_event_listener(
        move |category: EventCategory, _id: &SessionId, _message: Option<&Message>| -> ListenerResult {
            if category == EventCategory::SessionLogon {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        },
    );

    engine.start().await?;
    for name in engine.management().query("org.fixgate:*")? {
        info!(%name, "registered");
    }
    while logons.load(Ordering::SeqCst) < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let trader = SessionId::new("FIX.4.2", "TRADER", "MARKET");
    let email = Message::new(MsgType::Email)
        .with_field(tags::SUBJECT, "hello from TRADER")
        .with_field(tags::TEXT, "in-process delivery");
    engine.send_to_target(email, &trader).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    engine.stop().await;
    info!("engine stopped");
    Ok(())
}
