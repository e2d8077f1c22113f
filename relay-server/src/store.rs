//! Disk-backed upload gateway.

use std::io;
use std::path::{Path, PathBuf};

use relay_core::FileDescriptor;
use relay_core::upload::RETRIEVAL_PREFIX;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file is {size} bytes, the limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("file is empty")]
    Empty,
    #[error("no file name given")]
    MissingName,
    #[error("{count} files sent, at most {max} per request")]
    TooManyFiles { count: usize, max: usize },
    #[error("no files in request")]
    NoFiles,
    #[error("malformed upload: {0}")]
    Malformed(String),
    #[error("failed to store file: {0}")]
    Storage(#[from] io::Error),
}

#[derive(Debug)]
pub struct DiskStore {
    dir: PathBuf,
    max_bytes: usize,
    max_files: usize,
}

impl DiskStore {
    /// Creates the upload directory if needed.
    pub async fn open(dir: impl Into<PathBuf>, max_bytes: usize, max_files: usize) -> io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(DiskStore { dir, max_bytes, max_files })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<FileDescriptor, UploadError> {
        let original_name = self.check(original_name, bytes)?;
        self.write(original_name, bytes).await
    }

    /// Stores a whole request or nothing: every file is checked before the first write.
    pub async fn store_all<B>(&self, files: &[(String, B)]) -> Result<Vec<FileDescriptor>, UploadError>
    where
        B: AsRef<[u8]>,
    {
        if files.is_empty() {
            return Err(UploadError::NoFiles);
        }
        if files.len() > self.max_files {
            return Err(UploadError::TooManyFiles {
                count: files.len(),
                max: self.max_files,
            });
        }

        let mut checked = Vec::with_capacity(files.len());
        for (name, bytes) in files {
            checked.push((self.check(name, bytes.as_ref())?, bytes.as_ref()));
        }

        let mut stored = Vec::with_capacity(checked.len());
        for (name, bytes) in checked {
            stored.push(self.write(name, bytes).await?);
        }
        Ok(stored)
    }

    fn check(&self, original_name: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let original_name = base_name(original_name).ok_or(UploadError::MissingName)?;
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }
        Ok(original_name)
    }

    async fn write(&self, original_name: String, bytes: &[u8]) -> Result<FileDescriptor, UploadError> {
        let identifier = identifier_for(&original_name);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.dir.join(&identifier))
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        Ok(FileDescriptor {
            retrieval_path: format!("{RETRIEVAL_PREFIX}/{identifier}"),
            identifier,
            original_name,
            size_bytes: bytes.len() as u64,
        })
    }
}

/// Last path component of a client-supplied name.
fn base_name(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    (!name.is_empty() && name != "." && name != "..").then(|| name.to_string())
}

/// Fresh uuid, keeping the original extension when it is plain alphanumeric.
fn identifier_for(original_name: &str) -> String {
    let id = Uuid::new_v4();
    match Path::new(original_name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!("{id}.{ext}")
        }
        _ => id.to_string(),
    }
}
