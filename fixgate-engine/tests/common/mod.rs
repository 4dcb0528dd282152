/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

#![allow(dead_code)]

use fixgate_core::message::Message;
use fixgate_core::types::SessionId;
use fixgate_engine::{EngineBuilder, EventCategory, EventListener, EventRecord, ListenerResult};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn resources() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/resources")
}

pub fn in_process(uri: &str) -> EngineBuilder {
    EngineBuilder::new(uri, "inprocess.toml").with_resource_root(resources())
}

pub fn acceptor_id() -> SessionId {
    SessionId::new("FIX.4.2", "MARKET", "TRADER")
}

pub fn initiator_id() -> SessionId {
    SessionId::new("FIX.4.2", "TRADER", "MARKET")
}

/// Unblocks waiters once counted down to zero.
#[derive(Debug)]
pub struct CountDownLatch {
    remaining: watch::Sender<usize>,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Arc<Self> {
        let (remaining, _) = watch::channel(count);
        Arc::new(Self { remaining })
    }

    pub fn count_down(&self) {
        self.remaining.send_modify(|n| *n = n.saturating_sub(1));
    }

    pub fn count(&self) -> usize {
        *self.remaining.borrow()
    }

    /// Returns false if the count did not reach zero within `timeout`.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.remaining.subscribe();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0)).await,
            Ok(Ok(_))
        )
    }
}

/// Records every event and counts down latches keyed by category.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<EventRecord>>,
    latches: Mutex<Vec<(EventCategory, Arc<CountDownLatch>)>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a latch released after `count` events of `category`.
    pub fn latch(&self, category: EventCategory, count: usize) -> Arc<CountDownLatch> {
        let latch = CountDownLatch::new(count);
        self.latches.lock().push((category, Arc::clone(&latch)));
        latch
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn of(&self, category: EventCategory) -> Vec<EventRecord> {
        self.events()
            .into_iter()
            .filter(|e| e.category == category)
            .collect()
    }
}

impl EventListener for Recorder {
    fn on_event(
        &self,
        category: EventCategory,
        session_id: &SessionId,
        message: Option<&Message>,
    ) -> ListenerResult {
        self.events
            .lock()
            .push(EventRecord::new(category, session_id, message));
        for (wanted, latch) in self.latches.lock().iter() {
            if *wanted == category {
                latch.count_down();
            }
        }
        Ok(())
    }
}
