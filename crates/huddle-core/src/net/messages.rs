use serde::{Deserialize, Serialize};

/// Network message type discriminator, carried as the `"type"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    // Client -> Server
    Join,

    // Server -> Client
    Welcome,
    PlayerJoined,
    PlayerLeft,

    // Both directions
    Chat,
    GameAction,
}

impl MessageType {
    pub const ALL: [MessageType; 6] = [
        MessageType::Join,
        MessageType::Welcome,
        MessageType::PlayerJoined,
        MessageType::PlayerLeft,
        MessageType::Chat,
        MessageType::GameAction,
    ];

    /// The tag written to the `"type"` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Welcome => "welcome",
            Self::PlayerJoined => "player_joined",
            Self::PlayerLeft => "player_left",
            Self::Chat => "chat",
            Self::GameAction => "game_action",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Client -> Server ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinMsg {
    pub name: String,
}

// --- Server -> Client ---

/// Payload shared by `welcome`, `player_joined` and `player_left`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementMsg {
    pub message: String,
    pub players_count: usize,
}

// --- Both directions ---

/// A chat line. `player` and `timestamp` are filled in by the server;
/// whatever a client sends in those fields is overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMsg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ChatMsg {
    /// Client-side constructor: just the text.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            player: None,
            message: message.into(),
            timestamp: None,
        }
    }

    /// Copy with the sender and server clock attached.
    pub fn stamped(&self, player: &str, timestamp: String) -> Self {
        Self {
            player: Some(player.to_string()),
            message: self.message.clone(),
            timestamp: Some(timestamp),
        }
    }
}

/// An opaque game action string, relayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameActionMsg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl GameActionMsg {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            player: None,
            action: action.into(),
            timestamp: None,
        }
    }

    pub fn stamped(&self, player: &str, timestamp: String) -> Self {
        Self {
            player: Some(player.to_string()),
            action: self.action.clone(),
            timestamp: Some(timestamp),
        }
    }
}

/// Every message that can cross the wire, tagged by its `"type"` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Join(JoinMsg),
    Welcome(AnnouncementMsg),
    PlayerJoined(AnnouncementMsg),
    PlayerLeft(AnnouncementMsg),
    Chat(ChatMsg),
    GameAction(GameActionMsg),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Join(_) => MessageType::Join,
            Self::Welcome(_) => MessageType::Welcome,
            Self::PlayerJoined(_) => MessageType::PlayerJoined,
            Self::PlayerLeft(_) => MessageType::PlayerLeft,
            Self::Chat(_) => MessageType::Chat,
            Self::GameAction(_) => MessageType::GameAction,
        }
    }

    pub fn join(name: impl Into<String>) -> Self {
        Self::Join(JoinMsg { name: name.into() })
    }

    /// Greeting sent only to the player who just joined.
    pub fn welcome(name: &str, players_count: usize) -> Self {
        Self::Welcome(AnnouncementMsg {
            message: format!("Welcome {name}! You're connected to the game."),
            players_count,
        })
    }

    pub fn player_joined(name: &str, players_count: usize) -> Self {
        Self::PlayerJoined(AnnouncementMsg {
            message: format!("{name} joined the game!"),
            players_count,
        })
    }

    pub fn player_left(name: &str, players_count: usize) -> Self {
        Self::PlayerLeft(AnnouncementMsg {
            message: format!("{name} left the game."),
            players_count,
        })
    }
}
