//! Input line parsing.

/// What an input line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: a display name before joining, a chat message after.
    Say(String),
    /// Register a display name explicitly.
    Name(String),
    /// Connect again, e.g. after the client gave up reconnecting.
    Connect,
    /// Print the connection status.
    Status,
    /// Print the command list.
    Help,
    /// Leave.
    Quit,
    /// A `/command` this client does not know.
    Unknown(String),
}

/// Help text listing every command.
pub const HELP: &str = "\
/name <name>   register a display name
/connect       reconnect after giving up
/status        show the connection status
/quit          leave
//text         send text starting with a slash";

impl Command {
    /// Parse one input line.
    ///
    /// Lines starting with `/` are commands; `//` escapes a literal slash.
    /// Everything else is passed through untouched, including whitespace.
    pub fn parse(line: &str) -> Self {
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };
        if rest.starts_with('/') {
            return Self::Say(rest.to_string());
        }

        let (name, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        match name {
            "name" | "nick" => Self::Name(arg.trim().to_string()),
            "connect" | "reconnect" => Self::Connect,
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}
