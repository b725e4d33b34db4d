use anyhow::Result;
use bytes::Bytes;
use flate2::{Compression, write::GzEncoder};
use std::{fs, io::ErrorKind, io::Write, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod content_type;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use crate::auth::AuthGate;
use crate::services::{file_store::FileStore, firmware::StagedFlash, upload::UploadGate};
use crate::state::AppState;

const EDITOR_PAGE: &str = include_str!("../assets/edit.html");

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;
    tracing::info!("Starting flashweb with config: {:?}", cfg);

    // --- Ensure storage directories exist ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }
    fs::create_dir_all(&cfg.firmware_dir)?;

    // --- Build shared state + router ---
    let state = AppState {
        store: FileStore::new(&cfg.storage_dir),
        auth: AuthGate::new(cfg.credentials.clone()),
        uploads: UploadGate::new(),
        firmware: Arc::new(StagedFlash::new(&cfg.firmware_dir)),
        editor_page_gz: gzip_page(EDITOR_PAGE)?,
    };
    let app = routes::routes::routes(state, &cfg.edit_path, &cfg.update_path);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// The editor page ships uncompressed in the binary and is gzipped once at
/// startup; its handler serves the compressed bytes directly.
fn gzip_page(page: &str) -> Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(page.as_bytes())?;
    Ok(Bytes::from(encoder.finish()?))
}
