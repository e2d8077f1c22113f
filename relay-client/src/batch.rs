//! One user action: some attachments plus optional text.

use std::future::Future;
use std::path::{Path, PathBuf};

use relay_core::upload::file_message;
use relay_core::{FileDescriptor, SendMessage};
use thiserror::Error;
use tracing::debug;

/// Anything that can push a local file to the upload gateway.
pub trait Uploader {
    fn upload(&self, path: &Path) -> impl Future<Output = anyhow::Result<FileDescriptor>> + Send;
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{count} files selected, at most {max} can be sent at once")]
    TooManyFiles { count: usize, max: usize },
}

#[derive(Debug)]
pub struct UploadFailure {
    pub path: PathBuf,
    pub error: anyhow::Error,
}

/// Publishes ready to go out, in wire order.
#[derive(Debug, Default)]
pub struct PreparedBatch {
    pub messages: Vec<SendMessage>,
    pub failures: Vec<UploadFailure>,
}

impl PreparedBatch {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Uploads `files` one at a time, then appends the text publish. File
/// messages follow upload completion order and always precede the text.
/// A failed upload is recorded and the rest of the batch carries on.
pub async fn prepare<U: Uploader>(
    uploader: &U,
    base_url: &str,
    sender: &str,
    files: &[PathBuf],
    text: &str,
    max_files: usize,
) -> Result<PreparedBatch, BatchError> {
    if files.len() > max_files {
        return Err(BatchError::TooManyFiles {
            count: files.len(),
            max: max_files,
        });
    }

    let mut batch = PreparedBatch::default();
    for path in files {
        match uploader.upload(path).await {
            Ok(descriptor) => {
                debug!(path = %path.display(), identifier = %descriptor.identifier, "uploaded");
                batch.messages.push(file_message(base_url, sender, &descriptor));
            }
            Err(error) => batch.failures.push(UploadFailure {
                path: path.clone(),
                error,
            }),
        }
    }

    if !text.trim().is_empty() {
        batch.messages.push(SendMessage::text(sender, text));
    }
    Ok(batch)
}
