/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! In-process pipe transport.
//!
//! A [`PipeHub`] maps port numbers to listeners living in the same process.
//! Connecting through the hub produces two linked [`Connection`]s that share
//! one close signal, so closing either end ends both.

use crate::connection::Connection;
use crate::error::TransportError;
use crate::listener::{Binding, Listener};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Registry of in-process listeners keyed by port.
#[derive(Debug, Default)]
pub struct PipeHub {
    listeners: Mutex<HashMap<u16, mpsc::UnboundedSender<Connection>>>,
}

impl PipeHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a listener on `port`.
    ///
    /// The port is released when the returned [`Listener`] is dropped.
    ///
    /// # Errors
    /// Returns `TransportError::AddressInUse` if the port is already bound.
    pub fn bind(self: &Arc<Self>, port: u16) -> Result<Listener, TransportError> {
        let mut listeners = self.listeners.lock();
        if listeners.contains_key(&port) {
            return Err(TransportError::AddressInUse(port));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        listeners.insert(port, tx);
        debug!(port, "pipe listener bound");
        Ok(Listener::new(
            format!("vm://{port}"),
            rx,
            Binding::Pipe {
                hub: Arc::clone(self),
                port,
            },
        ))
    }

    /// Opens a connection to the listener bound on `port`.
    ///
    /// # Errors
    /// Returns `TransportError::ConnectionRefused` if nothing listens there.
    pub fn connect(&self, port: u16) -> Result<Connection, TransportError> {
        let listeners = self.listeners.lock();
        let incoming = listeners
            .get(&port)
            .ok_or(TransportError::ConnectionRefused(port))?;

        let (to_server, server_rx) = mpsc::unbounded_channel();
        let (to_client, client_rx) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();
        let client = Connection::new(format!("vm://{port}"), to_server, client_rx, closed.clone());
        let server = Connection::new(format!("vm://{port}/client"), to_client, server_rx, closed);

        incoming
            .send(server)
            .map_err(|_| TransportError::ConnectionRefused(port))?;
        Ok(client)
    }

    /// Returns true if a listener is bound on `port`.
    #[must_use]
    pub fn is_bound(&self, port: u16) -> bool {
        self.listeners.lock().contains_key(&port)
    }

    pub(crate) fn unbind(&self, port: u16) {
        if self.listeners.lock().remove(&port).is_some() {
            debug!(port, "pipe listener released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_pipe_connect_and_exchange() {
        let hub = Arc::new(PipeHub::new());
        let mut listener = hub.bind(9876).unwrap();
        let client = hub.connect(9876).unwrap();
        let server = listener.accept().await.unwrap();

        let (client_tx, mut client_rx) = client.split();
        let (server_tx, mut server_rx) = server.split();

        client_tx.send(Bytes::from_static(b"ping")).unwrap();
        assert_eq!(server_rx.recv().await.unwrap(), Bytes::from_static(b"ping"));
        server_tx.send(Bytes::from_static(b"pong")).unwrap();
        assert_eq!(client_rx.recv().await.unwrap(), Bytes::from_static(b"pong"));

        server_tx.close();
        assert!(client_rx.recv().await.is_none());
        assert!(client_tx.is_closed());
    }

    #[tokio::test]
    async fn test_pipe_port_in_use() {
        let hub = Arc::new(PipeHub::new());
        let _listener = hub.bind(1).unwrap();
        assert!(matches!(hub.bind(1), Err(TransportError::AddressInUse(1))));
    }

    #[tokio::test]
    async fn test_pipe_released_on_drop() {
        let hub = Arc::new(PipeHub::new());
        let listener = hub.bind(2).unwrap();
        assert!(hub.is_bound(2));
        drop(listener);
        assert!(!hub.is_bound(2));
        assert!(matches!(
            hub.connect(2),
            Err(TransportError::ConnectionRefused(2))
        ));
    }
}
