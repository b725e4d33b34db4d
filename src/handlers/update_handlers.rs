//! Firmware-update route.
//!
//! Accepts an image either as a raw body or as the first file field of a
//! multipart form, streams it chunk by chunk into an `UploadSession`
//! targeting the flash coordinator, and reports the installed byte count.

use crate::{
    errors::AppError,
    handlers::{AuthHeader, supplied_credentials},
    services::upload::UploadSession,
    state::AppState,
};
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tracing::info;

pub async fn flash_firmware(
    State(state): State<AppState>,
    auth: AuthHeader,
    req: Request,
) -> Result<Response, AppError> {
    state.auth.require(supplied_credentials(&auth))?;

    let mut session = UploadSession::start_firmware(&state.uploads, state.firmware.as_ref())?;

    if is_multipart(req.headers()) {
        let mut multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|err| AppError::Internal(err.to_string()))?;
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|err| AppError::Internal(err.to_string()))?
        {
            if field.file_name().is_none() {
                continue;
            }
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|err| AppError::Internal(err.to_string()))?
            {
                session.append(&chunk).await?;
            }
        }
    } else {
        let mut stream = req.into_body().into_data_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| AppError::Internal(err.to_string()))?;
            session.append(&chunk).await?;
        }
    }

    let bytes = session.finish().await?;
    info!(bytes, "firmware image accepted");
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        format!("Update OK: {bytes} bytes"),
    )
        .into_response())
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthGate, Credentials};
    use crate::services::{
        file_store::FileStore,
        firmware::StagedFlash,
        upload::UploadGate,
    };
    use axum::body::Body;
    use bytes::Bytes;
    use std::sync::Arc;
    use tempfile::tempdir;
    use tokio::fs;

    fn make_state(creds: Option<Credentials>) -> (tempfile::TempDir, AppState, StagedFlash) {
        let temp = tempdir().expect("tempdir");
        let storage = temp.path().join("files");
        std::fs::create_dir_all(&storage).expect("create storage root");
        let flash = StagedFlash::new(temp.path().join("firmware"));
        let state = AppState {
            store: FileStore::new(&storage),
            auth: AuthGate::new(creds),
            uploads: UploadGate::new(),
            firmware: Arc::new(flash.clone()),
            editor_page_gz: Bytes::new(),
        };
        (temp, state, flash)
    }

    fn raw_request(payload: &'static [u8]) -> Request {
        Request::builder()
            .method("POST")
            .uri("/update")
            .body(Body::from(payload))
            .expect("request")
    }

    #[tokio::test]
    async fn raw_body_installs_image() {
        let (_temp, state, flash) = make_state(None);
        let response = flash_firmware(State(state), AuthHeader(None), raw_request(b"new firmware image"))
            .await
            .expect("flash");
        assert_eq!(response.status(), StatusCode::OK);

        let image = fs::read(flash.image_path()).await.expect("read image");
        assert_eq!(image, b"new firmware image");
    }

    #[tokio::test]
    async fn multipart_body_installs_image() {
        let (_temp, state, flash) = make_state(None);
        let body = concat!(
            "--FW\r\n",
            "Content-Disposition: form-data; name=\"update\"; filename=\"fw.bin\"\r\n",
            "\r\n",
            "multipart image",
            "\r\n--FW--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/update")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=FW")
            .body(Body::from(body))
            .expect("request");

        flash_firmware(State(state), AuthHeader(None), request)
            .await
            .expect("flash");
        let image = fs::read(flash.image_path()).await.expect("read image");
        assert_eq!(image, b"multipart image");
    }

    #[tokio::test]
    async fn empty_image_surfaces_coordinator_failure() {
        let (_temp, state, flash) = make_state(None);
        let result = flash_firmware(State(state), AuthHeader(None), raw_request(b"")).await;
        assert!(matches!(result, Err(AppError::Flash(_))));
        assert!(!flash.image_path().exists());
    }

    #[tokio::test]
    async fn unauthenticated_flash_is_challenged_before_staging() {
        let (_temp, state, flash) = make_state(Some(Credentials {
            username: "admin".into(),
            password: "hunter2".into(),
        }));
        let result = flash_firmware(State(state), AuthHeader(None), raw_request(b"image")).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
        assert!(!flash.image_path().exists());
    }

    #[tokio::test]
    async fn concurrent_upload_is_rejected() {
        let (_temp, state, _flash) = make_state(None);
        let held = UploadSession::start_firmware(&state.uploads, state.firmware.as_ref())
            .expect("hold gate");

        let result = flash_firmware(State(state.clone()), AuthHeader(None), raw_request(b"image")).await;
        assert!(matches!(result, Err(AppError::UploadBusy)));
        drop(held);
    }
}
