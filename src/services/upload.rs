//! src/services/upload.rs
//!
//! UploadSession — the streamed-upload state machine backing both ordinary
//! file uploads and the firmware path. The transport delivers a body as a
//! sequence of chunks; the session writes each chunk through immediately and
//! retains nothing, so peak memory is independent of upload size.
//!
//! States run `Receiving → Closed`, with `Aborted` absorbing a session
//! dropped mid-transfer. "Idle" is the absence of a session; starting one
//! requires the single permit held by [`UploadGate`], which makes the
//! device's single-client assumption an explicit precondition instead of an
//! implicit one.

use crate::services::file_store::FileStore;
use crate::services::firmware::{FirmwareCoordinator, FirmwareJob};
use std::{io, sync::Arc};
use thiserror::Error;
use tokio::{
    fs::File,
    io::AsyncWriteExt,
    sync::{OwnedSemaphorePermit, Semaphore},
};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("another upload session is already receiving")]
    Busy,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("firmware coordinator: {0}")]
    Flash(io::Error),
}

/// One-permit guard enforcing at most one `Receiving` session at a time.
/// A second start while a session is receiving fails fast rather than
/// interleaving writes.
#[derive(Clone)]
pub struct UploadGate {
    permits: Arc<Semaphore>,
}

impl UploadGate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn try_begin(&self) -> Result<OwnedSemaphorePermit, UploadError> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| UploadError::Busy)
    }
}

impl Default for UploadGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Transitions run `Receiving → Closed`, or `Receiving → Aborted` when a
/// session drops mid-transfer. Ownership rules out the illegal moves:
/// `append` borrows a `Receiving` session and `finish` consumes it, so no
/// runtime guard is needed beyond the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Receiving,
    Closed,
    Aborted,
}

enum Target {
    Store {
        resource: String,
        file: Option<File>,
    },
    Firmware {
        job: Option<Box<dyn FirmwareJob>>,
    },
}

pub struct UploadSession {
    target: Target,
    bytes_written: u64,
    state: SessionState,
    _permit: OwnedSemaphorePermit,
}

impl UploadSession {
    /// Start a session writing to a store resource.
    ///
    /// The filename is normalized to begin with the path separator, and the
    /// destination is opened truncating any existing content. An open
    /// failure does not fail the session: the transport will deliver the
    /// body regardless, and re-buffering it would exceed available memory,
    /// so the handle stays absent and appends are discarded.
    pub async fn start_file(
        gate: &UploadGate,
        store: &FileStore,
        raw_filename: &str,
    ) -> Result<Self, UploadError> {
        let permit = gate.try_begin()?;
        let resource = if raw_filename.starts_with('/') {
            raw_filename.to_string()
        } else {
            format!("/{raw_filename}")
        };
        let file = match store.create_writer(&resource).await {
            Ok(file) => Some(file),
            Err(err) => {
                warn!(resource, error = %err, "upload destination failed to open; chunks will be discarded");
                None
            }
        };
        Ok(Self {
            target: Target::Store { resource, file },
            bytes_written: 0,
            state: SessionState::Receiving,
            _permit: permit,
        })
    }

    /// Start a session streaming into the flash coordinator.
    ///
    /// The gate is acquired before the coordinator stages anything, so a
    /// busy rejection leaves no staging behind. A coordinator that refuses
    /// to begin fails the session up front.
    pub fn start_firmware(
        gate: &UploadGate,
        coordinator: &dyn FirmwareCoordinator,
    ) -> Result<Self, UploadError> {
        let permit = gate.try_begin()?;
        let job = coordinator.begin().map_err(UploadError::Flash)?;
        Ok(Self {
            target: Target::Firmware { job: Some(job) },
            bytes_written: 0,
            state: SessionState::Receiving,
            _permit: permit,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Write one chunk verbatim.
    pub async fn append(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        match &mut self.target {
            Target::Store { file: Some(file), .. } => {
                file.write_all(chunk).await?;
                self.bytes_written += chunk.len() as u64;
            }
            Target::Store { file: None, .. } => {}
            Target::Firmware { job: Some(job) } => {
                job.write(chunk).map_err(UploadError::Flash)?;
                self.bytes_written += chunk.len() as u64;
            }
            Target::Firmware { job: None } => {}
        }
        Ok(())
    }

    /// Close the destination and report the final byte count.
    ///
    /// A firmware destination is handed to the coordinator for validation
    /// and install instead of a plain close; a coordinator failure surfaces
    /// as an error but the session stays closed either way.
    pub async fn finish(mut self) -> Result<u64, UploadError> {
        self.state = SessionState::Closed;
        match &mut self.target {
            Target::Store { resource, file } => {
                if let Some(mut file) = file.take() {
                    file.flush().await?;
                    file.sync_all().await?;
                }
                debug!(resource, bytes = self.bytes_written, "upload session closed");
            }
            Target::Firmware { job } => {
                if let Some(job) = job.take() {
                    job.install().map_err(UploadError::Flash)?;
                }
            }
        }
        Ok(self.bytes_written)
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        if self.state != SessionState::Receiving {
            return;
        }
        self.state = SessionState::Aborted;
        match &mut self.target {
            Target::Store { resource, file } => {
                if file.take().is_some() {
                    warn!(
                        resource,
                        bytes = self.bytes_written,
                        "upload session aborted; destination left truncated"
                    );
                }
            }
            Target::Firmware { job } => {
                if let Some(job) = job.take() {
                    job.abort();
                    warn!(
                        bytes = self.bytes_written,
                        "firmware upload aborted; staging discarded"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tokio::fs;

    fn make_store() -> (tempfile::TempDir, FileStore) {
        let temp = tempdir().expect("tempdir");
        let store = FileStore::new(temp.path());
        (temp, store)
    }

    #[tokio::test]
    async fn chunks_concatenate_exactly() {
        let (_temp, store) = make_store();
        let gate = UploadGate::new();
        let mut session = UploadSession::start_file(&gate, &store, "data.bin")
            .await
            .expect("start");
        assert_eq!(session.state(), SessionState::Receiving);
        for chunk in [&b"alpha "[..], &b"beta "[..], &b"gamma"[..]] {
            session.append(chunk).await.expect("append");
        }
        assert_eq!(session.state(), SessionState::Receiving);
        assert_eq!(session.bytes_written(), 16);
        let bytes = session.finish().await.expect("finish");
        assert_eq!(bytes, 16);

        let contents = fs::read(store.root().join("data.bin")).await.expect("read");
        assert_eq!(contents, b"alpha beta gamma");
    }

    #[tokio::test]
    async fn second_start_while_receiving_fails_fast() {
        let (_temp, store) = make_store();
        let gate = UploadGate::new();
        let session = UploadSession::start_file(&gate, &store, "/one.bin")
            .await
            .expect("start");
        assert!(matches!(
            UploadSession::start_file(&gate, &store, "/two.bin").await,
            Err(UploadError::Busy)
        ));
        drop(session);
        // Dropping the session releases the permit.
        UploadSession::start_file(&gate, &store, "/two.bin")
            .await
            .expect("start after drop");
    }

    #[tokio::test]
    async fn unopened_destination_discards_chunks() {
        let (_temp, store) = make_store();
        let gate = UploadGate::new();
        // Interior separators are rejected by the flat store, so the write
        // handle never opens.
        let mut session = UploadSession::start_file(&gate, &store, "a/b.txt")
            .await
            .expect("start");
        session.append(b"dropped").await.expect("append");
        let bytes = session.finish().await.expect("finish");
        assert_eq!(bytes, 0);
        assert!(!store.exists("/a/b.txt").await);
    }

    #[tokio::test]
    async fn filename_gains_leading_separator() {
        let (_temp, store) = make_store();
        let gate = UploadGate::new();
        let mut session = UploadSession::start_file(&gate, &store, "plain.txt")
            .await
            .expect("start");
        session.append(b"x").await.expect("append");
        session.finish().await.expect("finish");
        assert!(store.exists("/plain.txt").await);
    }

    #[derive(Default)]
    struct RecordingFlash {
        written: Arc<Mutex<Vec<u8>>>,
        installed: Arc<Mutex<bool>>,
        aborted: Arc<Mutex<bool>>,
    }

    struct RecordingJob {
        written: Arc<Mutex<Vec<u8>>>,
        installed: Arc<Mutex<bool>>,
        aborted: Arc<Mutex<bool>>,
    }

    impl FirmwareCoordinator for RecordingFlash {
        fn begin(&self) -> io::Result<Box<dyn FirmwareJob>> {
            Ok(Box::new(RecordingJob {
                written: Arc::clone(&self.written),
                installed: Arc::clone(&self.installed),
                aborted: Arc::clone(&self.aborted),
            }))
        }
    }

    impl FirmwareJob for RecordingJob {
        fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
            self.written.lock().unwrap().extend_from_slice(chunk);
            Ok(())
        }

        fn install(self: Box<Self>) -> io::Result<()> {
            *self.installed.lock().unwrap() = true;
            Ok(())
        }

        fn abort(self: Box<Self>) {
            *self.aborted.lock().unwrap() = true;
        }
    }

    #[tokio::test]
    async fn firmware_session_hands_stream_to_coordinator() {
        let flash = RecordingFlash::default();
        let gate = UploadGate::new();
        let mut session = UploadSession::start_firmware(&gate, &flash).expect("start");
        session.append(b"image ").await.expect("append");
        session.append(b"bytes").await.expect("append");
        let bytes = session.finish().await.expect("finish");

        assert_eq!(bytes, 11);
        assert_eq!(*flash.written.lock().unwrap(), b"image bytes");
        assert!(*flash.installed.lock().unwrap());
        assert!(!*flash.aborted.lock().unwrap());
    }

    #[tokio::test]
    async fn dropped_firmware_session_aborts_job() {
        let flash = RecordingFlash::default();
        let gate = UploadGate::new();
        let mut session = UploadSession::start_firmware(&gate, &flash).expect("start");
        session.append(b"partial").await.expect("append");
        drop(session);

        assert!(*flash.aborted.lock().unwrap());
        assert!(!*flash.installed.lock().unwrap());
    }
}
