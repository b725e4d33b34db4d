//! src/services/file_store.rs
//!
//! FileStore — thin facade over the external storage collaborator, modeled
//! as a directory on the local filesystem. The namespace is flat: every
//! resource lives directly under the store root and is addressed by a
//! `/`-prefixed name. A device build substitutes the real flash driver
//! behind the same surface.

use crate::models::entry::{DirEntry, EntryKind};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tracing::warn;

/// Default index file appended when a resource path ends in `/`.
pub const INDEX_FILE: &str = "index.htm";

const MAX_RESOURCE_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("invalid resource path `{0}`")]
    InvalidPath(String),
    #[error("resource `{0}` not found")]
    NotFound(String),
    #[error("resource `{0}` already exists")]
    AlreadyExists(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, FileStoreError>;

#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalize a raw resource path.
    ///
    /// The result is never empty and always begins with `/`; a trailing `/`
    /// is rewritten to append the default index name. Rejects traversal
    /// sequences, interior separators (the store is flat), control bytes,
    /// and backslashes.
    pub fn normalize(path: &str) -> StoreResult<String> {
        if path.is_empty() {
            return Err(FileStoreError::InvalidPath(path.to_string()));
        }
        let mut resource = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        if resource.ends_with('/') {
            resource.push_str(INDEX_FILE);
        }
        Self::ensure_safe(&resource)?;
        Ok(resource)
    }

    fn ensure_safe(resource: &str) -> StoreResult<()> {
        let name = &resource[1..];
        if name.is_empty() || resource.len() > MAX_RESOURCE_LEN {
            return Err(FileStoreError::InvalidPath(resource.to_string()));
        }
        if name.contains('/') || name.contains("..") {
            return Err(FileStoreError::InvalidPath(resource.to_string()));
        }
        if name
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(FileStoreError::InvalidPath(resource.to_string()));
        }
        Ok(())
    }

    fn disk_path(&self, resource: &str) -> PathBuf {
        self.root.join(&resource[1..])
    }

    /// Whether a resource is present. Invalid paths report absent rather
    /// than erroring so existence probes stay infallible.
    pub async fn exists(&self, path: &str) -> bool {
        match Self::normalize(path) {
            Ok(resource) => fs::try_exists(self.disk_path(&resource))
                .await
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Open a resource for reading, returning the handle and its length.
    pub async fn open(&self, path: &str) -> StoreResult<(File, u64)> {
        let resource = Self::normalize(path)?;
        match File::open(self.disk_path(&resource)).await {
            Ok(file) => {
                let len = file.metadata().await?.len();
                Ok((file, len))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(FileStoreError::NotFound(resource))
            }
            Err(err) => Err(FileStoreError::Io(err)),
        }
    }

    /// Create an empty resource; fails if the path is already present.
    pub async fn create_empty(&self, path: &str) -> StoreResult<()> {
        let resource = Self::normalize(path)?;
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.disk_path(&resource))
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                Err(FileStoreError::AlreadyExists(resource))
            }
            Err(err) => Err(FileStoreError::Io(err)),
        }
    }

    /// Open a truncating write handle for an upload destination.
    ///
    /// Any existing content is destroyed at open time, not on completion;
    /// an aborted upload leaves the resource truncated.
    pub async fn create_writer(&self, path: &str) -> StoreResult<File> {
        let resource = Self::normalize(path)?;
        Ok(File::create(self.disk_path(&resource)).await?)
    }

    /// Remove a resource unconditionally.
    pub async fn remove(&self, path: &str) -> StoreResult<()> {
        let resource = Self::normalize(path)?;
        match fs::remove_file(self.disk_path(&resource)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(FileStoreError::NotFound(resource))
            }
            Err(err) => Err(FileStoreError::Io(err)),
        }
    }

    /// Enumerate entries under `dir` in store order.
    ///
    /// The store is flat, so `dir` acts as a name prefix the way the
    /// device's flash filesystem treats directory opens. Reported names
    /// carry no leading separator.
    pub async fn list(&self, dir: &str) -> StoreResult<Vec<DirEntry>> {
        let prefix = dir.strip_prefix('/').unwrap_or(dir);
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            // Names are wire-visible as UTF-8; anything undecodable is
            // skipped rather than served mangled.
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(name = %raw.to_string_lossy(), "skipping undecodable store entry");
                    continue;
                }
            };
            if !name.starts_with(prefix) {
                continue;
            }
            entries.push(DirEntry {
                kind: EntryKind::File,
                name,
            });
        }
        Ok(entries)
    }
}
