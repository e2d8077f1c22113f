//! Slash commands typed at the client prompt.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    /// Queue files for the next message.
    Attach(Vec<PathBuf>),
    Files,
    Clear,
    /// Anything else goes out as chat text, verbatim.
    Say,
}

/// Commands match on the whole first word, so `/attachments` is plain text.
pub fn parse(line: &str) -> Command {
    let trimmed = line.trim();
    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest),
        None => (trimmed, ""),
    };

    match word {
        "/quit" if rest.is_empty() => Command::Quit,
        "/attach" => Command::Attach(rest.split_whitespace().map(PathBuf::from).collect()),
        "/files" if rest.is_empty() => Command::Files,
        "/clear" if rest.is_empty() => Command::Clear,
        _ => Command::Say,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_takes_every_path() {
        assert_eq!(
            parse("/attach a.png  docs/b.pdf"),
            Command::Attach(vec![PathBuf::from("a.png"), PathBuf::from("docs/b.pdf")])
        );
        assert_eq!(parse("  /attach  "), Command::Attach(Vec::new()));
    }

    #[test]
    fn words_starting_with_a_command_are_chat() {
        assert_eq!(parse("/attachments are broken"), Command::Say);
        assert_eq!(parse("/quitting now"), Command::Say);
        assert_eq!(parse("/files please"), Command::Say);
    }

    #[test]
    fn bare_commands() {
        assert_eq!(parse("/quit"), Command::Quit);
        assert_eq!(parse(" /files "), Command::Files);
        assert_eq!(parse("/clear"), Command::Clear);
        assert_eq!(parse("hello"), Command::Say);
        assert_eq!(parse(""), Command::Say);
    }
}
