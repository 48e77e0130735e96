use futures::{Sink, SinkExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use huddle_core::net::messages::Message;
use huddle_core::net::protocol::{ProtocolError, decode_message, encode_message};

use crate::error::ClientError;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_PORT: u16 = 8766;

pub fn server_url(server: &str, port: u16) -> String {
    format!("ws://{server}:{port}/")
}

/// Open the WebSocket and send the join handshake.
pub async fn connect(url: &str, name: &str) -> Result<WsStream, ClientError> {
    let (mut stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|source| ClientError::Connect {
            url: url.to_string(),
            source,
        })?;
    send(&mut stream, &Message::join(name)).await?;
    tracing::debug!(url, name, "Joined");
    Ok(stream)
}

pub async fn send<S>(sink: &mut S, msg: &Message) -> Result<(), ClientError>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    let text = encode_message(msg)?;
    sink.send(WsMessage::Text(text.into()))
        .await
        .map_err(ClientError::Send)
}

/// Decode a data frame. Control frames yield `None`.
pub fn decode_frame(frame: &WsMessage) -> Option<Result<Message, ProtocolError>> {
    match frame {
        WsMessage::Text(text) => Some(decode_message(text.as_bytes())),
        WsMessage::Binary(data) => Some(decode_message(data)),
        _ => None,
    }
}
