use huddle_core::net::messages::{ChatMsg, GameActionMsg, Message};

pub const HELP: &str = "Commands: /quit, /action <action>";

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat(String),
    Action(String),
    Quit,
    Help,
    Empty,
}

impl Command {
    /// The message to send for this command, if any.
    pub fn into_message(self) -> Option<Message> {
        match self {
            Command::Chat(text) => Some(Message::Chat(ChatMsg::new(text))),
            Command::Action(action) => Some(Message::GameAction(GameActionMsg::new(action))),
            Command::Quit | Command::Help | Command::Empty => None,
        }
    }
}

/// Plain text is chat, `/action <text>` is a game action, `/quit` leaves
/// and any other slash command asks for help.
pub fn parse_input(line: &str) -> Command {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Command::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return Command::Chat(line.to_string());
    };

    if command == "quit" {
        return Command::Quit;
    }
    if let Some(action) = command.strip_prefix("action ")
        && !action.trim().is_empty()
    {
        return Command::Action(action.to_string());
    }
    Command::Help
}
