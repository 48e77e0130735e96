use std::collections::HashMap;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;

use huddle_core::player::{ConnectionId, PlayerRecord};
use huddle_core::time::clock_timestamp;

/// Per-connection sender for outbound text frames.
/// Bounded (see `limits.player_message_buffer`) so a slow client cannot
/// grow server memory without limit. `Utf8Bytes` clones are cheap, so one
/// encoded message is shared by every recipient of a broadcast.
pub type PlayerSender = mpsc::Sender<Utf8Bytes>;

/// A registered player together with the queue feeding its socket writer.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub record: PlayerRecord,
    pub sender: PlayerSender,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateRegistration(ConnectionId),
    /// Benign: the connection was never registered or is already gone.
    NotFound(ConnectionId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateRegistration(id) => write!(f, "connection {id} is already registered"),
            Self::NotFound(id) => write!(f, "connection {id} is not registered"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Who is connected: the single source of truth for joined players.
///
/// A connection id is present exactly while that connection has completed
/// the join handshake and has not been unregistered. The registry is shared
/// as [`crate::state::SharedRegistry`]; callers take the write lock for
/// `register`/`unregister` and the read lock for everything else, and never
/// hold either across a send.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<ConnectionId, RegistryEntry>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        connection_id: ConnectionId,
        display_name: String,
        sender: PlayerSender,
    ) -> Result<PlayerRecord, RegistryError> {
        if self.players.contains_key(&connection_id) {
            return Err(RegistryError::DuplicateRegistration(connection_id));
        }
        let record = PlayerRecord {
            connection_id,
            display_name,
            joined_at: clock_timestamp(),
        };
        self.players.insert(
            connection_id,
            RegistryEntry {
                record: record.clone(),
                sender,
            },
        );
        Ok(record)
    }

    /// Remove a player. Safe to call more than once; later calls return
    /// `NotFound`, which callers should treat as "someone else cleaned up".
    pub fn unregister(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<PlayerRecord, RegistryError> {
        self.players
            .remove(&connection_id)
            .map(|entry| entry.record)
            .ok_or(RegistryError::NotFound(connection_id))
    }

    /// Point-in-time copy for iterating outside the lock, ordered by join.
    pub fn snapshot(&self) -> Vec<RegistryEntry> {
        let mut entries: Vec<RegistryEntry> = self.players.values().cloned().collect();
        entries.sort_by_key(|e| e.record.connection_id);
        entries
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }

    pub fn sender(&self, connection_id: ConnectionId) -> Option<PlayerSender> {
        self.players.get(&connection_id).map(|e| e.sender.clone())
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<&PlayerRecord> {
        self.players.get(&connection_id).map(|e| &e.record)
    }

    /// Display names of everyone currently joined, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .players
            .values()
            .map(|e| e.record.display_name.clone())
            .collect();
        names.sort();
        names
    }
}
