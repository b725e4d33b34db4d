//! Response-side error type preserving the legacy device wire codes.
//!
//! The legacy firmware conflates bad-request conditions with server errors
//! and reports them as fixed textual codes on status 500; existing clients
//! parse those codes, so the contract is preserved rather than corrected.
//! The one new condition, a concurrent upload rejected by the
//! single-session guard, has no legacy code and responds 409.

use crate::services::file_store::FileStoreError;
use crate::services::upload::UploadError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthorized,
    #[error("missing or invalid arguments")]
    BadArgs,
    #[error("bad path")]
    BadPath,
    #[error("file not found")]
    NotFound,
    #[error("file already exists")]
    AlreadyExists,
    #[error("create failed")]
    CreateFailed,
    #[error("another upload is in progress")]
    UploadBusy,
    #[error("firmware update failed: {0}")]
    Flash(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized => {
                let mut response =
                    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Basic realm="flashweb""#),
                );
                return response;
            }
            AppError::BadArgs => (StatusCode::INTERNAL_SERVER_ERROR, "BAD ARGS".to_string()),
            AppError::BadPath => (StatusCode::INTERNAL_SERVER_ERROR, "BAD PATH".to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "FileNotFound".to_string()),
            AppError::AlreadyExists => {
                (StatusCode::INTERNAL_SERVER_ERROR, "FILE EXISTS".to_string())
            }
            AppError::CreateFailed => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CREATE FAILED".to_string())
            }
            AppError::UploadBusy => (StatusCode::CONFLICT, "UPLOAD BUSY".to_string()),
            AppError::Flash(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("UPDATE FAILED: {msg}"),
            ),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
    }
}

impl From<FileStoreError> for AppError {
    fn from(err: FileStoreError) -> Self {
        match err {
            FileStoreError::InvalidPath(_) => AppError::BadPath,
            FileStoreError::NotFound(_) => AppError::NotFound,
            FileStoreError::AlreadyExists(_) => AppError::AlreadyExists,
            FileStoreError::Io(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Busy => AppError::UploadBusy,
            UploadError::Flash(err) => AppError::Flash(err.to_string()),
            UploadError::Io(err) => AppError::Internal(err.to_string()),
        }
    }
}
