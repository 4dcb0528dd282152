/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Frame-level connections.
//!
//! A [`Connection`] is a pair of unbounded frame channels plus a close
//! signal, independent of the underlying wire. Splitting it yields a
//! cloneable [`FrameSender`] for the session and a [`FrameReceiver`] for
//! the task that pumps inbound frames.

use crate::error::TransportError;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// An established connection carrying complete FIX frames.
#[derive(Debug)]
pub struct Connection {
    sender: FrameSender,
    receiver: FrameReceiver,
}

impl Connection {
    /// Creates a connection from its frame channels.
    ///
    /// # Arguments
    /// * `peer` - Human readable remote address
    /// * `writer` - Outbound frame channel
    /// * `reader` - Inbound frame channel
    /// * `closed` - Signal cancelled when either side closes
    #[must_use]
    pub fn new(
        peer: impl Into<String>,
        writer: mpsc::UnboundedSender<Bytes>,
        reader: mpsc::UnboundedReceiver<Bytes>,
        closed: CancellationToken,
    ) -> Self {
        Self {
            sender: FrameSender {
                peer: Arc::from(peer.into()),
                writer,
                closed: closed.clone(),
            },
            receiver: FrameReceiver { reader, closed },
        }
    }

    /// Returns the remote address.
    #[must_use]
    pub fn peer(&self) -> &str {
        self.sender.peer()
    }

    /// Splits the connection into its outbound and inbound halves.
    #[must_use]
    pub fn split(self) -> (FrameSender, FrameReceiver) {
        (self.sender, self.receiver)
    }
}

/// Outbound half of a connection.
#[derive(Debug, Clone)]
pub struct FrameSender {
    peer: Arc<str>,
    writer: mpsc::UnboundedSender<Bytes>,
    closed: CancellationToken,
}

impl FrameSender {
    /// Queues a complete frame for writing.
    ///
    /// # Errors
    /// Returns `TransportError::Closed` if the connection has been closed.
    pub fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed(self.peer.to_string()));
        }
        self.writer
            .send(frame)
            .map_err(|_| TransportError::Closed(self.peer.to_string()))
    }

    /// Closes the connection. Frames already queued are still delivered.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Returns true once the connection has been closed by either side.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.writer.is_closed()
    }

    /// Returns the remote address.
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

/// Inbound half of a connection.
#[derive(Debug)]
pub struct FrameReceiver {
    reader: mpsc::UnboundedReceiver<Bytes>,
    closed: CancellationToken,
}

impl FrameReceiver {
    /// Waits for the next inbound frame.
    ///
    /// Returns `None` once the connection is closed and every frame queued
    /// before the close has been handed out.
    pub async fn recv(&mut self) -> Option<Bytes> {
        tokio::select! {
            biased;
            frame = self.reader.recv() => frame,
            () = self.closed.cancelled() => self.reader.try_recv().ok(),
        }
    }
}
