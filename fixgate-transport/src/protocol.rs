/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Transport protocol selection and endpoints.

use crate::error::TransportError;
use std::fmt;
use std::str::FromStr;

/// The wire used by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportProtocol {
    /// TCP socket.
    #[default]
    Socket,
    /// In-process pipe addressed by port number only.
    VmPipe,
}

impl TransportProtocol {
    /// Returns the configuration name of the protocol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Socket => "SOCKET",
            Self::VmPipe => "VM_PIPE",
        }
    }
}

impl FromStr for TransportProtocol {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SOCKET" | "TCP" => Ok(Self::Socket),
            "VM_PIPE" | "VMPIPE" => Ok(Self::VmPipe),
            _ => Err(TransportError::UnknownProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a listener or of a remote peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Transport protocol.
    pub protocol: TransportProtocol,
    /// Host name or address. Ignored for in-process pipes.
    pub host: String,
    /// Port number.
    pub port: u16,
}

impl Endpoint {
    /// Creates a new endpoint.
    #[must_use]
    pub fn new(protocol: TransportProtocol, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
        }
    }

    /// Creates an in-process pipe endpoint.
    #[must_use]
    pub fn pipe(port: u16) -> Self {
        Self::new(TransportProtocol::VmPipe, "localhost", port)
    }

    /// Returns the `host:port` form of the endpoint.
    #[must_use]
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            TransportProtocol::Socket => write!(f, "tcp://{}:{}", self.host, self.port),
            TransportProtocol::VmPipe => write!(f, "vm://{}", self.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse() {
        assert_eq!(
            "VM_PIPE".parse::<TransportProtocol>().unwrap(),
            TransportProtocol::VmPipe
        );
        assert_eq!(
            "socket".parse::<TransportProtocol>().unwrap(),
            TransportProtocol::Socket
        );
        assert!("carrier-pigeon".parse::<TransportProtocol>().is_err());
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::pipe(9876).to_string(), "vm://9876");
        let tcp = Endpoint::new(TransportProtocol::Socket, "127.0.0.1", 5001);
        assert_eq!(tcp.to_string(), "tcp://127.0.0.1:5001");
        assert_eq!(tcp.socket_addr(), "127.0.0.1:5001");
    }
}
