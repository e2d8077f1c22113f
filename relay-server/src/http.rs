//! HTTP surface of the upload gateway.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use relay_core::FileDescriptor;
use relay_core::upload::RETRIEVAL_PREFIX;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::store::{DiskStore, UploadError};

#[derive(Debug, Deserialize)]
struct UploadQuery {
    name: Option<String>,
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = match &self {
            UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Empty
            | UploadError::MissingName
            | UploadError::TooManyFiles { .. }
            | UploadError::NoFiles
            | UploadError::Malformed(_) => StatusCode::BAD_REQUEST,
            UploadError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub fn router(store: Arc<DiskStore>) -> Router {
    let files = ServeDir::new(store.dir());
    let limit = store.max_bytes();
    // room for every file at full size plus the multipart framing
    let batch_limit = limit
        .saturating_mul(store.max_files())
        .saturating_add(64 * 1024);

    Router::new()
        .route("/upload/single", post(upload_single).layer(DefaultBodyLimit::max(limit)))
        .route("/upload/multiple", post(upload_multiple).layer(DefaultBodyLimit::max(batch_limit)))
        .nest_service(RETRIEVAL_PREFIX, files)
        .with_state(store)
}

async fn upload_single(
    State(store): State<Arc<DiskStore>>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<FileDescriptor>, UploadError> {
    let name = query.name.unwrap_or_default();
    match store.store(&name, &body).await {
        Ok(descriptor) => {
            info!(
                identifier = %descriptor.identifier,
                original = %descriptor.original_name,
                size = descriptor.size_bytes,
                "stored upload"
            );
            Ok(Json(descriptor))
        }
        Err(e) => {
            warn!(name = %name, size = body.len(), error = %e, "upload rejected");
            Err(e)
        }
    }
}

/// Every part carrying a file name is one file. All of them are stored, or none.
async fn upload_multiple(
    State(store): State<Arc<DiskStore>>,
    mut multipart: Multipart,
) -> Result<Json<Vec<FileDescriptor>>, UploadError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Malformed(e.body_text()))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| UploadError::Malformed(e.body_text()))?;
        files.push((name, bytes));
    }

    match store.store_all(&files).await {
        Ok(stored) => {
            info!(count = stored.len(), "stored upload batch");
            Ok(Json(stored))
        }
        Err(e) => {
            warn!(count = files.len(), error = %e, "upload batch rejected");
            Err(e)
        }
    }
}

pub async fn serve(listener: TcpListener, store: Arc<DiskStore>) -> Result<()> {
    axum::serve(listener, router(store))
        .await
        .context("Upload gateway stopped")
}
