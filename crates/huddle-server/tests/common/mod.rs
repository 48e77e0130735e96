use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use huddle_core::net::messages::{ChatMsg, GameActionMsg, Message};
use huddle_core::net::protocol::{decode_message, encode_message};

use huddle_server::build_app;
use huddle_server::config::ServerConfig;
use huddle_server::state::AppState;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with default config.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// Start a test server with a short join handshake timeout.
    pub async fn with_join_timeout(secs: u64) -> Self {
        let mut config = ServerConfig::default();
        config.handshake.join_timeout_secs = secs;
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            _handle: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Root path, which is what a bare `ws://host:port` client connects to.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    pub async fn player_count(&self) -> usize {
        self.state.registry.read().await.count()
    }

    /// Poll until the registry holds exactly `n` players (5s timeout).
    pub async fn wait_for_players(&self, n: usize) {
        let deadline = Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            while self.player_count().await != n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("Timed out waiting for {n} players"));
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a raw text frame.
pub async fn ws_send_text(stream: &mut WsStream, text: &str) {
    stream
        .send(WsMessage::Text(text.to_string().into()))
        .await
        .unwrap();
}

pub async fn ws_send_msg(stream: &mut WsStream, msg: &Message) {
    let encoded = encode_message(msg).unwrap();
    ws_send_text(stream, &encoded).await;
}

pub async fn ws_send_chat(stream: &mut WsStream, text: &str) {
    ws_send_msg(stream, &Message::Chat(ChatMsg::new(text))).await;
}

pub async fn ws_send_action(stream: &mut WsStream, action: &str) {
    ws_send_msg(stream, &Message::GameAction(GameActionMsg::new(action))).await;
}

/// Read the next protocol message (5s timeout).
pub async fn ws_read_msg(stream: &mut WsStream) -> Message {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    return decode_message(text.as_str().as_bytes()).unwrap();
                },
                Some(Ok(WsMessage::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read a message, returning None on timeout.
pub async fn ws_try_read_msg(stream: &mut WsStream, timeout_ms: u64) -> Option<Message> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    return decode_message(text.as_str().as_bytes()).unwrap();
                },
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Wait until the server closes the connection (5s timeout).
pub async fn ws_expect_closed(stream: &mut WsStream) {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(WsMessage::Text(text))) => {
                    panic!("Expected close, got message: {}", text.as_str())
                },
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for server to close the connection")
}

/// Connect, send a join and return the stream plus the welcome message.
pub async fn ws_join(server: &TestServer, name: &str) -> (WsStream, Message) {
    let mut stream = ws_connect(&server.ws_url()).await;
    ws_send_msg(&mut stream, &Message::join(name)).await;
    let welcome = ws_read_msg(&mut stream).await;
    (stream, welcome)
}

/// `HH:MM:SS`
pub fn is_clock_timestamp(ts: &str) -> bool {
    let parts: Vec<&str> = ts.split(':').collect();
    parts.len() == 3 && parts.iter().all(|p| p.len() == 2 && p.parse::<u8>().is_ok())
}
