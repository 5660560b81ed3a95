//! Line command parsing for the interactive loop.
//!
//! A handful of bare words control the session; every other non-empty line
//! is sent to the service as a new user turn.

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Leave the interactive loop.
    Exit,

    /// Undo the last user/assistant exchange.
    Backtrack,

    /// Display help information.
    Help,

    /// Send the text as a new user turn.
    Message(String),
}

/// Parses one line of user input.
///
/// Returns `None` for blank lines. Command words are matched
/// case-insensitively after trimming.
///
/// # Examples
///
/// ```
/// # use ppxity::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("exit"), Some(ChatCommand::Exit));
/// assert_eq!(parse_command("  "), None);
/// assert_eq!(
///     parse_command("What does main do?"),
///     Some(ChatCommand::Message("What does main do?".to_string()))
/// );
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let command = match input.to_ascii_lowercase().as_str() {
        "exit" | "quit" => ChatCommand::Exit,
        "backtrack" => ChatCommand::Backtrack,
        "help" => ChatCommand::Help,
        _ => ChatCommand::Message(input.to_string()),
    };
    Some(command)
}

/// Returns the help text listing the available commands.
pub fn help_text() -> &'static str {
    "Available commands:
  exit, quit   Leave the chat (Ctrl+D works too)
  backtrack    Forget the last question and answer
  help         Show this help message
Anything else is sent as a new message."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("   \t"), None);
    }

    #[test]
    fn exit_words() {
        assert_eq!(parse_command("exit"), Some(ChatCommand::Exit));
        assert_eq!(parse_command("quit"), Some(ChatCommand::Exit));
        assert_eq!(parse_command("  EXIT  "), Some(ChatCommand::Exit));
    }

    #[test]
    fn control_words() {
        assert_eq!(parse_command("backtrack"), Some(ChatCommand::Backtrack));
        assert_eq!(parse_command("Help"), Some(ChatCommand::Help));
    }

    #[test]
    fn everything_else_is_a_message() {
        assert_eq!(
            parse_command("  exit the loop early? "),
            Some(ChatCommand::Message("exit the loop early?".to_string()))
        );
        assert_eq!(
            parse_command("/help"),
            Some(ChatCommand::Message("/help".to_string()))
        );
    }

    #[test]
    fn help_mentions_every_command() {
        let help = help_text();
        for word in ["exit", "quit", "backtrack", "help"] {
            assert!(help.contains(word), "help text is missing {word}");
        }
    }
}
