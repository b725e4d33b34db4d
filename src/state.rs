//! Shared request context.
//!
//! Credentials and collaborators are explicit configuration threaded through
//! one state object rather than process-wide statics.

use crate::auth::AuthGate;
use crate::services::file_store::FileStore;
use crate::services::firmware::FirmwareCoordinator;
use crate::services::upload::UploadGate;
use bytes::Bytes;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: FileStore,
    pub auth: AuthGate,
    pub uploads: UploadGate,
    pub firmware: Arc<dyn FirmwareCoordinator>,
    /// The bundled editor page, gzipped once at startup.
    pub editor_page_gz: Bytes,
}
