use thiserror::Error;

use crate::types::{Candidate, MessageKind, SendMessage};
use crate::upload::classify;

/// Why a publish was dropped. Never sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("unrecognized message type {0:?}")]
    UnknownType(String),
    #[error("text message has no content")]
    EmptyText,
    #[error("{0} message carries no file reference")]
    MissingFile(&'static str),
}

/// Turns a client request into something the log will accept.
pub fn validate(request: SendMessage) -> Result<Candidate, Rejection> {
    let kind = MessageKind::parse(&request.kind).ok_or(Rejection::UnknownType(request.kind))?;

    match kind {
        MessageKind::Text => {
            if request.content.trim().is_empty() {
                // no text but a file reference: treat it as the attachment it carries
                let Some(file_name) = request.file_name else {
                    return Err(Rejection::EmptyText);
                };
                return Ok(Candidate {
                    content: request.content,
                    kind: classify(&file_name),
                    sender: request.sender,
                    file_name: Some(file_name),
                    file_size: request.file_size,
                });
            }
            Ok(Candidate {
                content: request.content,
                kind,
                sender: request.sender,
                file_name: None,
                file_size: None,
            })
        }
        MessageKind::Image | MessageKind::File => {
            if request.file_name.is_none() {
                return Err(Rejection::MissingFile(kind.as_str()));
            }
            Ok(Candidate {
                content: request.content,
                kind,
                sender: request.sender,
                file_name: request.file_name,
                file_size: request.file_size,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: &str, content: &str, file: Option<&str>) -> SendMessage {
        SendMessage {
            content: content.into(),
            kind: kind.into(),
            sender: "alice".into(),
            file_name: file.map(Into::into),
            file_size: file.map(|_| 10),
        }
    }

    #[test]
    fn accepts_plain_text() {
        let candidate = validate(request("text", "hello", None)).unwrap();
        assert_eq!(candidate.content, "hello");
        assert_eq!(candidate.kind, MessageKind::Text);
    }

    #[test]
    fn rejects_blank_text() {
        for content in ["", "   ", "\n\t"] {
            assert_eq!(validate(request("text", content, None)), Err(Rejection::EmptyText));
        }
    }

    #[test]
    fn empty_without_file_is_rejected_for_every_type() {
        for kind in ["text", "image", "file", "video", ""] {
            assert!(validate(request(kind, "", None)).is_err(), "type {kind:?}");
        }
    }

    #[test]
    fn rejects_unknown_type() {
        assert_eq!(
            validate(request("sticker", "x", None)),
            Err(Rejection::UnknownType("sticker".into()))
        );
    }

    #[test]
    fn file_messages_need_a_descriptor() {
        assert_eq!(
            validate(request("image", "http://h/uploads/a.png", None)),
            Err(Rejection::MissingFile("image"))
        );
        let candidate = validate(request("file", "http://h/uploads/a.pdf", Some("a.pdf"))).unwrap();
        assert_eq!(candidate.file_name.as_deref(), Some("a.pdf"));
        assert_eq!(candidate.file_size, Some(10));
    }

    #[test]
    fn blank_text_with_file_reference_becomes_an_attachment() {
        let candidate = validate(request("text", "", Some("cat.PNG"))).unwrap();
        assert_eq!(candidate.kind, MessageKind::Image);
        assert_eq!(candidate.file_name.as_deref(), Some("cat.PNG"));
        assert_eq!(candidate.file_size, Some(10));

        let candidate = validate(request("text", "  ", Some("report.pdf"))).unwrap();
        assert_eq!(candidate.kind, MessageKind::File);
    }

    #[test]
    fn text_drops_stray_file_fields() {
        let candidate = validate(request("text", "caption", Some("a.pdf"))).unwrap();
        assert_eq!(candidate.file_name, None);
        assert_eq!(candidate.file_size, None);
    }
}
