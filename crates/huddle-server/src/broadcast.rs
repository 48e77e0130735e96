use std::collections::VecDeque;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc::error::TrySendError;

use huddle_core::net::messages::Message;
use huddle_core::net::protocol::{ProtocolError, encode_message};
use huddle_core::player::{ConnectionId, PlayerRecord};

use crate::registry::PlayerSender;
use crate::state::SharedRegistry;

#[derive(Debug)]
pub enum SendError {
    NotRegistered(ConnectionId),
    /// The recipient is not keeping up and its queue is full. Broadcasts
    /// treat this like a closed connection.
    QueueFull(ConnectionId),
    /// The recipient's writer is gone. Treated as an implicit disconnect.
    Closed(ConnectionId),
    Encode(ProtocolError),
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotRegistered(id) => write!(f, "connection {id} is not registered"),
            Self::QueueFull(id) => write!(f, "outbound queue for connection {id} is full"),
            Self::Closed(id) => write!(f, "connection {id} is closed"),
            Self::Encode(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SendError {}

impl From<ProtocolError> for SendError {
    fn from(e: ProtocolError) -> Self {
        Self::Encode(e)
    }
}

/// Delivers messages to one, all, or all-but-one registered players.
///
/// Fan-out works on a registry snapshot, so no lock is held while sending.
/// Recipients whose queue is closed or full are unregistered after the
/// pass completes, and each removal is announced with a `player_left`.
/// Every player still registered afterwards got the message exactly once.
#[derive(Clone)]
pub struct Broadcaster {
    registry: SharedRegistry,
}

impl Broadcaster {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Best-effort send to a single player. Never mutates the registry;
    /// the caller decides what a failure means.
    pub async fn send_to(
        &self,
        connection_id: ConnectionId,
        msg: &Message,
    ) -> Result<(), SendError> {
        let data = Utf8Bytes::from(encode_message(msg)?);
        let sender = {
            let registry = self.registry.read().await;
            registry.sender(connection_id)
        };
        let sender = sender.ok_or(SendError::NotRegistered(connection_id))?;
        deliver(connection_id, &sender, data)
    }

    /// Send to every registered player. Returns the players that were
    /// found unreachable and removed along the way.
    pub async fn send_to_all(&self, msg: &Message) -> Vec<PlayerRecord> {
        self.fan_out(msg, None).await
    }

    /// Send to every registered player except `excluded`.
    pub async fn send_to_all_except(
        &self,
        excluded: ConnectionId,
        msg: &Message,
    ) -> Vec<PlayerRecord> {
        self.fan_out(msg, Some(excluded)).await
    }

    /// Unregister a player and, if it was still registered, tell everyone
    /// else it left. Returns `None` when someone already cleaned it up.
    pub async fn remove_and_announce(&self, connection_id: ConnectionId) -> Option<PlayerRecord> {
        let (record, players_count) = {
            let mut registry = self.registry.write().await;
            let record = registry.unregister(connection_id).ok()?;
            (record, registry.count())
        };
        tracing::info!(
            connection_id,
            player = %record.display_name,
            players_count,
            "Player left"
        );
        self.send_to_all(&Message::player_left(&record.display_name, players_count))
            .await;
        Some(record)
    }

    async fn fan_out(&self, msg: &Message, excluded: Option<ConnectionId>) -> Vec<PlayerRecord> {
        let data = match encode_message(msg) {
            Ok(text) => Utf8Bytes::from(text),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    kind = %msg.message_type(),
                    "Dropping unencodable broadcast"
                );
                return Vec::new();
            },
        };

        // Each pass may uncover dead recipients; their departures are queued
        // as further passes instead of recursing.
        let mut pending = VecDeque::from([(data, excluded)]);
        let mut departed = Vec::new();

        while let Some((data, excluded)) = pending.pop_front() {
            let snapshot = {
                let registry = self.registry.read().await;
                registry.snapshot()
            };

            let mut failed = Vec::new();
            for entry in &snapshot {
                let id = entry.record.connection_id;
                if Some(id) == excluded {
                    continue;
                }
                if deliver(id, &entry.sender, data.clone()).is_err() {
                    failed.push(id);
                }
            }

            if failed.is_empty() {
                continue;
            }

            let (removed, players_count) = {
                let mut registry = self.registry.write().await;
                let removed: Vec<PlayerRecord> = failed
                    .iter()
                    .filter_map(|&id| registry.unregister(id).ok())
                    .collect();
                (removed, registry.count())
            };

            for record in removed {
                tracing::info!(
                    connection_id = record.connection_id,
                    player = %record.display_name,
                    players_count,
                    "Unreachable player removed during broadcast"
                );
                match encode_message(&Message::player_left(&record.display_name, players_count)) {
                    Ok(text) => pending.push_back((Utf8Bytes::from(text), None)),
                    Err(e) => tracing::warn!(error = %e, "Failed to encode player_left"),
                }
                departed.push(record);
            }
        }

        departed
    }
}

fn deliver(
    connection_id: ConnectionId,
    sender: &PlayerSender,
    data: Utf8Bytes,
) -> Result<(), SendError> {
    match sender.try_send(data) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => {
            tracing::warn!(connection_id, "Outbound queue full, client is not keeping up");
            Err(SendError::QueueFull(connection_id))
        },
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(connection_id, "Send failed, connection closed");
            Err(SendError::Closed(connection_id))
        },
    }
}
