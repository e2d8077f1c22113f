//! Local replica of the server log, plus how messages look in the terminal.

use chrono::Local;
use colored::*;
use relay_core::{Message, MessageKind, ServerEvent};

#[derive(Debug, Default)]
pub struct Feed {
    messages: Vec<Message>,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a server event and returns the messages that became visible.
    pub fn apply(&mut self, event: ServerEvent) -> &[Message] {
        match event {
            ServerEvent::Messages(backlog) => {
                self.messages = backlog;
                &self.messages[..]
            }
            ServerEvent::NewMessage(message) => {
                self.messages.push(message);
                let last = self.messages.len() - 1;
                &self.messages[last..]
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

pub fn render(message: &Message) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M:%S").to_string();
    let body = match message.kind {
        MessageKind::Text => message.content.cyan().to_string(),
        MessageKind::Image | MessageKind::File => {
            let name = message.file_name.as_deref().unwrap_or("attachment");
            let size = message.file_size.map(human_size).unwrap_or_default();
            format!(
                "{} {} {} {}",
                format!("[{}]", message.kind.as_str()).magenta(),
                name.bold(),
                size,
                message.content.underline()
            )
        }
    };
    format!("[{}] {}: {}", time.yellow(), message.sender.green().bold(), body)
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("({bytes} B)")
    } else {
        format!("({size:.1} {})", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn message(content: &str, kind: MessageKind) -> Message {
        let file = kind.has_attachment();
        Message {
            id: Default::default(),
            content: content.into(),
            kind,
            sender: "alice".into(),
            timestamp: Utc::now(),
            file_name: file.then(|| "cat.png".to_string()),
            file_size: file.then_some(2048),
        }
    }

    #[test]
    fn backlog_replaces_and_new_messages_append() {
        let mut feed = Feed::new();
        feed.apply(ServerEvent::NewMessage(message("stale", MessageKind::Text)));

        let shown = feed.apply(ServerEvent::Messages(vec![
            message("a", MessageKind::Text),
            message("b", MessageKind::Text),
        ]));
        assert_eq!(shown.len(), 2);

        let shown = feed.apply(ServerEvent::NewMessage(message("c", MessageKind::Text)));
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].content, "c");

        let contents: Vec<_> = feed.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["a", "b", "c"]);
    }

    #[test]
    fn render_shows_attachment_details() {
        colored::control::set_override(false);
        let line = render(&message("http://h/uploads/x.png", MessageKind::Image));
        assert!(line.contains("alice: [image] cat.png (2.0 KiB) http://h/uploads/x.png"));
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(human_size(512), "(512 B)");
        assert_eq!(human_size(10 * 1024 * 1024), "(10.0 MiB)");
    }
}
