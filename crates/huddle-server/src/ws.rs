use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, Utf8Bytes, WebSocket};
use axum::extract::{ConnectInfo, FromRequest, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use huddle_core::net::messages::{Message, MessageType};
use huddle_core::net::protocol::{MAX_MESSAGE_SIZE, ProtocolError, decode_message};
use huddle_core::player::{ConnectionId, is_valid_display_name};
use huddle_core::time::clock_timestamp;

use crate::state::{AppState, ConnectionGuard};

/// Lifecycle of one connection. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Accepted,
    AwaitingJoin,
    Active,
    Closed,
}

impl ConnectionState {
    fn advance(self, next: ConnectionState, connection_id: ConnectionId) -> ConnectionState {
        debug_assert!(next > self, "connection state went backwards: {self:?} -> {next:?}");
        tracing::debug!(connection_id, from = ?self, to = ?next, "Connection state change");
        next
    }

    /// Terminal transition. Consumes the state so nothing can follow it.
    fn close(self, connection_id: ConnectionId) {
        self.advance(ConnectionState::Closed, connection_id);
    }
}

/// Why a connection was closed before it finished joining.
#[derive(Debug)]
pub enum JoinRejection {
    Timeout,
    Disconnected,
    Malformed(ProtocolError),
    UnexpectedType(MessageType),
    InvalidName,
}

impl std::fmt::Display for JoinRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "no join message before timeout"),
            Self::Disconnected => write!(f, "connection closed before join"),
            Self::Malformed(e) => write!(f, "invalid join message: {e}"),
            Self::UnexpectedType(t) => write!(f, "expected join, got {t}"),
            Self::InvalidName => write!(f, "empty or overlong player name"),
        }
    }
}

/// One inbound data frame. Text and binary frames both carry JSON.
enum Frame {
    Text(Utf8Bytes),
    Binary(Bytes),
}

impl Frame {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(t) => t.as_str().as_bytes(),
            Self::Binary(b) => b,
        }
    }
}

pub async fn ws_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<axum::response::Response, StatusCode> {
    let max = state.config.limits.max_connections;
    let current = state.connection_count.load(Ordering::Relaxed);
    if current >= max {
        tracing::warn!(current, max, "Connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);

    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    // Frames beyond the protocol limit fail the read instead of being buffered
    Ok(ws
        .max_message_size(MAX_MESSAGE_SIZE)
        .max_frame_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, peer))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState, peer: Option<SocketAddr>) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.connection_count));
    let connection_id = state.next_connection_id();
    let mut phase = ConnectionState::Accepted;
    tracing::debug!(connection_id, ?peer, "Connection accepted");

    let (ws_sender, mut ws_receiver) = socket.split();

    phase = phase.advance(ConnectionState::AwaitingJoin, connection_id);
    let name = match await_join(
        &mut ws_receiver,
        state.config.handshake.join_timeout(),
        state.config.limits.max_name_len,
    )
    .await
    {
        Ok(name) => name,
        Err(reason) => {
            tracing::info!(connection_id, ?peer, %reason, "Closing connection before join");
            phase.close(connection_id);
            return;
        },
    };

    let (tx, rx) = mpsc::channel::<Utf8Bytes>(state.config.limits.player_message_buffer);
    let players_count = {
        let mut registry = state.registry.write().await;
        match registry.register(connection_id, name.clone(), tx) {
            Ok(_) => registry.count(),
            Err(e) => {
                drop(registry);
                tracing::warn!(
                    connection_id,
                    error = %e,
                    "Registration failed, closing connection"
                );
                phase.close(connection_id);
                return;
            },
        }
    };

    let mut writer = spawn_writer(ws_sender, rx, connection_id);
    tracing::info!(connection_id, player = %name, players_count, "Player joined");

    if let Err(e) = state
        .broadcaster
        .send_to(connection_id, &Message::welcome(&name, players_count))
        .await
    {
        tracing::debug!(connection_id, error = %e, "Failed to send welcome");
    }
    state
        .broadcaster
        .send_to_all_except(connection_id, &Message::player_joined(&name, players_count))
        .await;

    phase = phase.advance(ConnectionState::Active, connection_id);
    // The writer stops when the socket write fails or when a broadcast
    // unregistered this player; either way the connection is over.
    let writer_finished = tokio::select! {
        () = read_loop(&mut ws_receiver, &state, connection_id, &name) => false,
        _ = &mut writer => true,
    };

    // A failed broadcast may already have removed and announced this
    // player, in which case this is a no-op.
    phase.close(connection_id);
    state.broadcaster.remove_and_announce(connection_id).await;

    // The writer exits on its own once every queued sender is dropped; give
    // it a moment to flush, then stop waiting on a peer that is not reading.
    if !writer_finished {
        let abort = writer.abort_handle();
        if tokio::time::timeout(Duration::from_secs(1), writer)
            .await
            .is_err()
        {
            tracing::debug!(connection_id, "Writer did not finish, dropping connection");
            abort.abort();
        }
    }

    tracing::debug!(connection_id, player = %name, "Connection closed");
}

/// Wait for the join handshake and return the display name as supplied.
async fn await_join(
    ws_receiver: &mut SplitStream<WebSocket>,
    timeout: Duration,
    max_name_len: Option<usize>,
) -> Result<String, JoinRejection> {
    let frame = match tokio::time::timeout(timeout, next_frame(ws_receiver)).await {
        Err(_) => return Err(JoinRejection::Timeout),
        Ok(None) => return Err(JoinRejection::Disconnected),
        Ok(Some(frame)) => frame,
    };

    match decode_message(frame.as_bytes()) {
        Ok(Message::Join(join)) if is_valid_display_name(&join.name, max_name_len) => {
            Ok(join.name)
        },
        Ok(Message::Join(_)) => Err(JoinRejection::InvalidName),
        Ok(other) => Err(JoinRejection::UnexpectedType(other.message_type())),
        Err(e) => Err(JoinRejection::Malformed(e)),
    }
}

/// Next data frame, or `None` once the peer closed or the transport failed.
async fn next_frame(ws_receiver: &mut SplitStream<WebSocket>) -> Option<Frame> {
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(WsMessage::Text(t)) => return Some(Frame::Text(t)),
            Ok(WsMessage::Binary(b)) => return Some(Frame::Binary(b)),
            Ok(WsMessage::Close(_)) => return None,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket read failed");
                return None;
            },
        }
    }
    None
}

fn spawn_writer(
    mut ws_sender: SplitSink<WebSocket, WsMessage>,
    mut rx: mpsc::Receiver<Utf8Bytes>,
    connection_id: ConnectionId,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if let Err(e) = ws_sender.send(WsMessage::Text(data)).await {
                tracing::debug!(connection_id, error = %e, "WebSocket write failed");
                return;
            }
        }
        let _ = ws_sender.close().await;
    })
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    connection_id: ConnectionId,
    player: &str,
) {
    let rate = state.config.limits.rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(frame) = next_frame(ws_receiver).await {
        let data = frame.as_bytes();

        if state.registry.read().await.get(connection_id).is_none() {
            tracing::debug!(connection_id, player, "Removed by a broadcast, ending session");
            break;
        }

        if !rate_limiter.allow() {
            tracing::warn!(connection_id, player, "Rate limited");
            continue;
        }

        let msg = match decode_message(data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(connection_id, player, error = %e, "Invalid message");
                continue;
            },
        };

        match msg {
            Message::Chat(chat) => {
                tracing::info!(connection_id, player, message = %chat.message, "Chat");
                let out = Message::Chat(chat.stamped(player, clock_timestamp()));
                state.broadcaster.send_to_all(&out).await;
            },
            Message::GameAction(action) => {
                tracing::info!(connection_id, player, action = %action.action, "Game action");
                let out = Message::GameAction(action.stamped(player, clock_timestamp()));
                state.broadcaster.send_to_all(&out).await;
            },
            Message::Join(_)
            | Message::Welcome(_)
            | Message::PlayerJoined(_)
            | Message::PlayerLeft(_) => {
                tracing::debug!(
                    connection_id,
                    player,
                    kind = %msg.message_type(),
                    "Ignoring message type not accepted from joined clients"
                );
            },
        }
    }
}
