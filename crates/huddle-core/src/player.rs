use serde::Serialize;

/// Identity of one accepted connection. Allocated at accept time and
/// never reused within a server process.
pub type ConnectionId = u64;

/// Metadata for a connection that completed the join handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRecord {
    pub connection_id: ConnectionId,
    pub display_name: String,
    /// Local wall-clock time of the join, `HH:MM:SS`.
    pub joined_at: String,
}

/// A join name is usable when it is non-empty and, if a cap is set, no
/// longer than `max_len` characters. The name is never altered.
pub fn is_valid_display_name(name: &str, max_len: Option<usize>) -> bool {
    if name.is_empty() {
        return false;
    }
    match max_len {
        Some(max) => name.chars().count() <= max,
        None => true,
    }
}
