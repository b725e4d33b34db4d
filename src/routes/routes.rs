//! Static route table for the management surface and the public catch-all.
//!
//! ## Structure
//! - **Management endpoints** (auth checked first inside each handler)
//!   - `GET    /list?dir=`          — directory listing
//!   - `GET    <edit-path>`         — bundled editor page (gzip)
//!   - `PUT    <edit-path>?path=`   — create empty file
//!   - `DELETE <edit-path>?path=`   — delete file
//!   - `POST   <edit-path>`         — multipart file upload
//!   - `POST   <update-path>`       — firmware image upload
//!
//! - **Public catch-all** — serves arbitrary site content from the store,
//!   preferring `.gz` siblings; unresolved paths report `FileNotFound`.
//!
//! The editor and update routes are configuration values; the table is
//! built once at startup and carries shared state to all handlers.

use crate::{
    handlers::{
        edit_handlers::{create_file, delete_file, editor_ui, list_files, upload_files},
        static_handlers::serve_static,
        update_handlers::flash_firmware,
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

pub fn routes(state: AppState, edit_path: &str, update_path: &str) -> Router {
    Router::new()
        .route("/list", get(list_files))
        .route(
            edit_path,
            get(editor_ui)
                .put(create_file)
                .delete(delete_file)
                .post(upload_files),
        )
        .route(update_path, post(flash_firmware))
        .fallback(serve_static)
        .with_state(state)
}
