/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! TCP transport.
//!
//! Each socket is driven by two tasks: a reader that frames inbound bytes
//! with [`FixCodec`] and a writer that drains the outbound channel. Closing
//! the connection stops the reader and lets the writer flush before the
//! socket is shut down.

use crate::codec::FixCodec;
use crate::connection::Connection;
use crate::error::TransportError;
use crate::listener::{Binding, Listener};
use crate::protocol::Endpoint;
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Binds a TCP listener on the endpoint's address.
///
/// # Errors
/// Returns `TransportError::Io` if the address cannot be bound.
pub async fn bind(endpoint: &Endpoint, codec: FixCodec) -> Result<Listener, TransportError> {
    let socket = TcpListener::bind(endpoint.socket_addr()).await?;
    let local_addr = socket.local_addr()?.to_string();
    let token = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let accept_token = token.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = accept_token.cancelled() => break,
                accepted = socket.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!(%addr, "accepted tcp connection");
                        if tx.send(spawn_connection(stream, codec.clone())).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "tcp accept failed"),
                },
            }
        }
    });

    debug!(%local_addr, "tcp listener bound");
    Ok(Listener::new(local_addr, rx, Binding::Socket(token)))
}

/// Opens a TCP connection to the endpoint.
///
/// # Errors
/// Returns `TransportError::Io` if the connection fails.
pub async fn connect(endpoint: &Endpoint, codec: FixCodec) -> Result<Connection, TransportError> {
    let stream = TcpStream::connect(endpoint.socket_addr()).await?;
    stream.set_nodelay(true)?;
    Ok(spawn_connection(stream, codec))
}

fn spawn_connection(stream: TcpStream, codec: FixCodec) -> Connection {
    let peer = stream
        .peer_addr()
        .map_or_else(|_| "unknown".to_string(), |a| a.to_string());
    let (read_half, write_half) = stream.into_split();
    let closed = CancellationToken::new();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

    let write_codec = codec.clone();
    let reader_closed = closed.clone();
    let reader_peer = peer.clone();
    tokio::spawn(async move {
        let mut frames = FramedRead::new(read_half, codec);
        loop {
            tokio::select! {
                () = reader_closed.cancelled() => break,
                next = frames.next() => match next {
                    Some(Ok(frame)) => {
                        if inbound_tx.send(frame.freeze()).is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(peer = %reader_peer, error = %e, "dropping connection on bad frame");
                        break;
                    }
                    None => break,
                },
            }
        }
        reader_closed.cancel();
    });

    let writer_closed = closed.clone();
    let writer_peer = peer.clone();
    tokio::spawn(async move {
        let mut sink = FramedWrite::new(write_half, write_codec);
        loop {
            tokio::select! {
                biased;
                frame = outbound_rx.recv() => match frame {
                    Some(frame) => {
                        if let Err(e) = sink.send(frame).await {
                            warn!(peer = %writer_peer, error = %e, "tcp write failed");
                            break;
                        }
                    }
                    None => break,
                },
                () = writer_closed.cancelled() => {
                    while let Ok(frame) = outbound_rx.try_recv() {
                        if sink.send(frame).await.is_err() {
                            break;
                        }
                    }
                    break;
                }
            }
        }
        writer_closed.cancel();
        let _ = sink.get_mut().shutdown().await;
    });

    Connection::new(peer, outbound_tx, inbound_rx, closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TransportProtocol;
    use bytes::Bytes;
    use fixgate_tagvalue::Encoder;

    fn heartbeat() -> Bytes {
        let mut encoder = Encoder::new("FIX.4.4");
        encoder.put_str(35, "0");
        encoder.finish().freeze()
    }

    #[tokio::test]
    async fn test_tcp_exchange_and_close() {
        let endpoint = Endpoint::new(TransportProtocol::Socket, "127.0.0.1", 0);
        let mut listener = bind(&endpoint, FixCodec::new()).await.unwrap();
        let port: u16 = listener
            .local_addr()
            .rsplit(':')
            .next()
            .unwrap()
            .parse()
            .unwrap();

        let target = Endpoint::new(TransportProtocol::Socket, "127.0.0.1", port);
        let client = connect(&target, FixCodec::new()).await.unwrap();
        let server = listener.accept().await.unwrap();

        let (client_tx, mut client_rx) = client.split();
        let (_server_tx, mut server_rx) = server.split();

        client_tx.send(heartbeat()).unwrap();
        assert_eq!(server_rx.recv().await.unwrap(), heartbeat());

        client_tx.close();
        assert!(client_rx.recv().await.is_none());
        assert!(server_rx.recv().await.is_none());
    }
}
