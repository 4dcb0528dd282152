/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Protocol-independent entry point for binding and connecting.

use crate::codec::FixCodec;
use crate::connection::Connection;
use crate::error::TransportError;
use crate::listener::Listener;
use crate::pipe::PipeHub;
use crate::protocol::{Endpoint, TransportProtocol};
use crate::tcp;
use std::sync::Arc;

/// Binds listeners and opens connections over any [`TransportProtocol`].
#[derive(Debug, Clone, Default)]
pub struct Transport {
    pipes: Arc<PipeHub>,
    codec: FixCodec,
}

impl Transport {
    /// Creates a transport using the given pipe hub for in-process endpoints.
    #[must_use]
    pub fn new(pipes: Arc<PipeHub>) -> Self {
        Self {
            pipes,
            codec: FixCodec::new(),
        }
    }

    /// Sets the codec used to frame socket traffic.
    #[must_use]
    pub fn with_codec(mut self, codec: FixCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Returns the in-process pipe hub.
    #[must_use]
    pub fn pipes(&self) -> &Arc<PipeHub> {
        &self.pipes
    }

    /// Binds a listener on `endpoint`.
    ///
    /// # Errors
    /// Returns `TransportError` if the address cannot be bound.
    pub async fn bind(&self, endpoint: &Endpoint) -> Result<Listener, TransportError> {
        match endpoint.protocol {
            TransportProtocol::VmPipe => self.pipes.bind(endpoint.port),
            TransportProtocol::Socket => tcp::bind(endpoint, self.codec.clone()).await,
        }
    }

    /// Connects to `endpoint`.
    ///
    /// # Errors
    /// Returns `TransportError` if the peer cannot be reached.
    pub async fn connect(&self, endpoint: &Endpoint) -> Result<Connection, TransportError> {
        match endpoint.protocol {
            TransportProtocol::VmPipe => self.pipes.connect(endpoint.port),
            TransportProtocol::Socket => tcp::connect(endpoint, self.codec.clone()).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transport_routes_pipe_endpoints() {
        let transport = Transport::default();
        let endpoint = Endpoint::pipe(4242);
        let mut listener = transport.bind(&endpoint).await.unwrap();
        assert_eq!(listener.local_addr(), "vm://4242");

        let client = transport.connect(&endpoint).await.unwrap();
        assert_eq!(client.peer(), "vm://4242");
        assert!(listener.accept().await.is_some());
    }

    #[tokio::test]
    async fn test_shared_hub_between_transports() {
        let hub = Arc::new(PipeHub::new());
        let server = Transport::new(Arc::clone(&hub));
        let client = Transport::new(hub);

        let _listener = server.bind(&Endpoint::pipe(7)).await.unwrap();
        assert!(client.connect(&Endpoint::pipe(7)).await.is_ok());
        assert!(Transport::default().connect(&Endpoint::pipe(7)).await.is_err());
    }
}
