use std::path::Path;

use anyhow::{Context, Result, anyhow};
use relay_core::FileDescriptor;
use serde::Deserialize;

use crate::batch::Uploader;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to the server's `/upload/single` route.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUploader {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpUploader {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Uploader for HttpUploader {
    async fn upload(&self, path: &Path) -> Result<FileDescriptor> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("{} has no usable file name", path.display()))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let response = self
            .client
            .post(format!("{}/upload/single", self.base_url))
            .query(&[("name", name.as_str())])
            .body(bytes)
            .send()
            .await
            .context("Upload request failed")?;

        let status = response.status();
        if !status.is_success() {
            let reason = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            return Err(anyhow!("upload of {name} rejected: {reason}"));
        }

        response
            .json::<FileDescriptor>()
            .await
            .context("Upload gateway sent an unreadable response")
    }
}
