//! Public catch-all: resolve a requested path to a servable resource,
//! preferring a pre-compressed sibling.
//!
//! A `.gz` sibling is served with the *original* path's content type; the
//! compression is transparent to the client apart from the
//! `Content-Encoding: gzip` marker. Bodies stream straight from the store
//! without buffering.

use crate::{content_type::content_type_for, errors::AppError, state::AppState};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, Uri, header},
    response::Response,
};
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::services::file_store::{FileStore, FileStoreError};

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub download: Option<String>,
}

pub async fn serve_static(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
    uri: Uri,
) -> Result<Response, AppError> {
    let Ok(resource) = FileStore::normalize(uri.path()) else {
        return Err(AppError::NotFound);
    };
    let content_type = content_type_for(&resource, query.download.is_some());

    let compressed = format!("{resource}.gz");
    if state.store.exists(&compressed).await {
        let (file, len) = state.store.open(&compressed).await.map_err(AppError::from)?;
        debug!(resource, len, "serving compressed sibling");
        return Ok(stream_response(file, len, content_type, true));
    }

    match state.store.open(&resource).await {
        Ok((file, len)) => {
            debug!(resource, len, "serving file");
            Ok(stream_response(file, len, content_type, false))
        }
        Err(FileStoreError::NotFound(_)) => Err(AppError::NotFound),
        Err(err) => Err(err.into()),
    }
}

fn stream_response(file: File, len: u64, content_type: &'static str, gzip: bool) -> Response {
    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    if gzip {
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    }
    response
}
