//! Handlers for the file-management surface: list, create, delete, upload,
//! and the bundled editor page.
//!
//! Authentication is the first check of every handler here, before argument
//! validation, so unauthenticated callers cannot probe for paths or trigger
//! side effects. Failure responses keep the legacy device wire codes.

use crate::{
    errors::AppError,
    handlers::{AuthHeader, supplied_credentials},
    services::{file_store::FileStoreError, upload::UploadSession},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

fn empty_ok() -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], "").into_response()
}

/// GET `/list?dir=<path>` — enumerate store entries as `{type, name}`
/// records. Legacy clients expect the body labeled `text/json`.
pub async fn list_files(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    state.auth.require(supplied_credentials(&auth))?;
    let dir = query.dir.ok_or(AppError::BadArgs)?;
    let entries = state.store.list(&dir).await.map_err(AppError::from)?;
    debug!(dir, count = entries.len(), "list files");
    Ok(([(header::CONTENT_TYPE, "text/json")], Json(entries)).into_response())
}

/// PUT `<edit-path>?path=<path>` — create an empty resource.
pub async fn create_file(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<PathQuery>,
) -> Result<Response, AppError> {
    state.auth.require(supplied_credentials(&auth))?;
    let path = query.path.ok_or(AppError::BadArgs)?;
    if path == "/" {
        return Err(AppError::BadPath);
    }
    state.store.create_empty(&path).await.map_err(|err| match err {
        FileStoreError::AlreadyExists(_) => AppError::AlreadyExists,
        FileStoreError::InvalidPath(_) => AppError::BadPath,
        _ => AppError::CreateFailed,
    })?;
    info!(path, "created file");
    Ok(empty_ok())
}

/// DELETE `<edit-path>?path=<path>` — remove a resource unconditionally.
pub async fn delete_file(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<PathQuery>,
) -> Result<Response, AppError> {
    state.auth.require(supplied_credentials(&auth))?;
    let path = query.path.ok_or(AppError::BadArgs)?;
    if path == "/" {
        return Err(AppError::BadPath);
    }
    if !state.store.exists(&path).await {
        return Err(AppError::NotFound);
    }
    state.store.remove(&path).await.map_err(AppError::from)?;
    info!(path, "deleted file");
    Ok(empty_ok())
}

/// GET `<edit-path>` — the bundled, pre-compressed editor page.
pub async fn editor_ui(
    State(state): State<AppState>,
    auth: AuthHeader,
) -> Result<Response, AppError> {
    state.auth.require(supplied_credentials(&auth))?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html"),
            (header::CONTENT_ENCODING, "gzip"),
        ],
        state.editor_page_gz.clone(),
    )
        .into_response())
}

/// POST `<edit-path>` — multipart upload; each file field drives one
/// `UploadSession`. Completes with an empty 200 once delivery ends.
pub async fn upload_files(
    State(state): State<AppState>,
    auth: AuthHeader,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    state.auth.require(supplied_credentials(&auth))?;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::Internal(err.to_string()))?
    {
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let mut session = UploadSession::start_file(&state.uploads, &state.store, &filename).await?;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|err| AppError::Internal(err.to_string()))?
        {
            session.append(&chunk).await?;
        }
        let bytes = session.finish().await?;
        info!(filename, bytes, "upload complete");
    }
    Ok(empty_ok())
}
