use std::fmt;

use huddle_core::net::protocol::ProtocolError;
use tokio_tungstenite::tungstenite;

#[derive(Debug)]
pub enum ClientError {
    Connect {
        url: String,
        source: tungstenite::Error,
    },
    Send(tungstenite::Error),
    Receive(tungstenite::Error),
    Protocol(ProtocolError),
    Stdin(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Connect { url, source } => {
                write!(f, "failed to connect to {url}: {source}")
            },
            ClientError::Send(e) => write!(f, "failed to send: {e}"),
            ClientError::Receive(e) => write!(f, "connection error: {e}"),
            ClientError::Protocol(e) => write!(f, "protocol error: {e}"),
            ClientError::Stdin(e) => write!(f, "failed to read input: {e}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Connect { source, .. } => Some(source),
            ClientError::Send(e) | ClientError::Receive(e) => Some(e),
            ClientError::Protocol(e) => Some(e),
            ClientError::Stdin(e) => Some(e),
        }
    }
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        ClientError::Protocol(e)
    }
}
