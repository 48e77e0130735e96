use huddle_core::net::messages::Message;

/// Format a server message for the terminal.
///
/// Returns `None` for messages that should not be shown: our own chat and
/// actions (the server echoes them back) and client-only types.
pub fn render(msg: &Message, own_name: &str) -> Option<String> {
    match msg {
        Message::Welcome(w) => Some(format!(
            "{}\nPlayers in game: {}",
            w.message, w.players_count
        )),
        Message::PlayerJoined(j) => Some(format!(
            "{}\nTotal players: {}",
            j.message, j.players_count
        )),
        Message::PlayerLeft(l) => Some(format!(
            "{}\nRemaining players: {}",
            l.message, l.players_count
        )),
        Message::Chat(chat) => {
            let player = chat.player.as_deref().unwrap_or("?");
            if player == own_name {
                return None;
            }
            Some(format!(
                "{player} ({}): {}",
                chat.timestamp.as_deref().unwrap_or("--:--:--"),
                chat.message
            ))
        },
        Message::GameAction(action) => {
            let player = action.player.as_deref().unwrap_or("?");
            if player == own_name {
                return None;
            }
            Some(format!(
                "{player} {} ({})",
                action.action,
                action.timestamp.as_deref().unwrap_or("--:--:--")
            ))
        },
        Message::Join(_) => None,
    }
}
