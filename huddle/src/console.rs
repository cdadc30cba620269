//! Line commands understood by the console presentation

use huddle_types::Privacy;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// List channels and direct messages
    Channels,
    /// Select a channel by name or id
    Join(String),
    /// Open the direct channel with a user id
    Direct(String),
    /// Create a group channel
    NewChannel(String),
    Members,
    /// Start an AI chat from a first prompt
    NewAiChat(String),
    Chats,
    /// Select an AI chat by list position (1-based) or id
    Open(String),
    Privacy(Privacy),
    DeleteChat,
    /// Upload a local file as a resource
    Upload(String),
    Help,
    Quit,
    /// Plain text: send to whatever is focused
    Say(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: /{0} (try /help)")]
    Unknown(String),

    #[error("/{command} needs {what}")]
    MissingArgument { command: &'static str, what: &'static str },

    #[error("{0}")]
    InvalidArgument(String),
}

impl Command {
    /// `None` for a blank line
    pub fn parse(line: &str) -> Option<Result<Command, CommandError>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Ok(Command::Say(line.to_string())));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let required = |command: &'static str, what: &'static str| {
            if arg.is_empty() {
                Err(CommandError::MissingArgument { command, what })
            } else {
                Ok(arg.to_string())
            }
        };

        let command = match name {
            "channels" => Ok(Command::Channels),
            "join" => required("join", "a channel name or id").map(Command::Join),
            "dm" => required("dm", "a user id").map(Command::Direct),
            "new" => required("new", "a channel name").map(Command::NewChannel),
            "members" => Ok(Command::Members),
            "ai" => required("ai", "a prompt").map(Command::NewAiChat),
            "chats" => Ok(Command::Chats),
            "open" => required("open", "a chat number or id").map(Command::Open),
            "privacy" => required("privacy", "private, team or public").and_then(|value| {
                value
                    .parse::<Privacy>()
                    .map(Command::Privacy)
                    .map_err(CommandError::InvalidArgument)
            }),
            "delete" => Ok(Command::DeleteChat),
            "upload" => required("upload", "a file path").map(Command::Upload),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        };
        Some(command)
    }
}

pub const HELP: &str = "\
/channels              list channels and direct messages
/join <name|id>        switch channel
/dm <user id>          open a direct message
/new <name>            create a channel
/members               members of the active channel
/ai <prompt>           start an AI chat
/chats                 list AI chats
/open <n|id>           switch AI chat
/privacy <mode>        private, team or public (creator only)
/delete                delete the active AI chat (creator only)
/upload <path>         upload a file to your resources
/quit                  leave
anything else          send to the focused channel or AI chat";
