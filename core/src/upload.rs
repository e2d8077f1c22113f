//! Turning upload gateway descriptors into publishable messages.

use std::path::Path;

use crate::types::{FileDescriptor, MessageKind, SendMessage};

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Route prefix under which stored objects are served.
pub const RETRIEVAL_PREFIX: &str = "/uploads";

/// Image when the extension is a known picture format, otherwise a generic file.
pub fn classify(file_name: &str) -> MessageKind {
    let is_image = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)));

    if is_image { MessageKind::Image } else { MessageKind::File }
}

/// Publish request for an uploaded object. `base_url` is the gateway origin,
/// the descriptor's retrieval path is appended untouched.
pub fn file_message(base_url: &str, sender: &str, descriptor: &FileDescriptor) -> SendMessage {
    SendMessage {
        content: format!("{}{}", base_url.trim_end_matches('/'), descriptor.retrieval_path),
        kind: classify(&descriptor.original_name).as_str().to_string(),
        sender: sender.to_string(),
        file_name: Some(descriptor.original_name.clone()),
        file_size: Some(descriptor.size_bytes),
    }
}
