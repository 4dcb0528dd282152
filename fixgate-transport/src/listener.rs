/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Bound listeners.

use crate::connection::Connection;
use crate::pipe::PipeHub;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What a listener holds on to while it is bound.
#[derive(Debug)]
pub(crate) enum Binding {
    Pipe { hub: Arc<PipeHub>, port: u16 },
    Socket(CancellationToken),
}

impl Drop for Binding {
    fn drop(&mut self) {
        match self {
            Self::Pipe { hub, port } => hub.unbind(*port),
            Self::Socket(token) => token.cancel(),
        }
    }
}

/// A bound listener yielding inbound connections.
///
/// Dropping the listener releases the address.
#[derive(Debug)]
pub struct Listener {
    local_addr: String,
    incoming: mpsc::UnboundedReceiver<Connection>,
    _binding: Binding,
}

impl Listener {
    pub(crate) fn new(
        local_addr: String,
        incoming: mpsc::UnboundedReceiver<Connection>,
        binding: Binding,
    ) -> Self {
        Self {
            local_addr,
            incoming,
            _binding: binding,
        }
    }

    /// Waits for the next inbound connection.
    pub async fn accept(&mut self) -> Option<Connection> {
        self.incoming.recv().await
    }

    /// Returns the bound address.
    #[must_use]
    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }
}
