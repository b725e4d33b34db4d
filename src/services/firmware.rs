//! Firmware flash coordination seam.
//!
//! The coordinator is an external collaborator: it validates and installs a
//! completed image or fails atomically. The seam mirrors the begin / write
//! chunk / finish-or-abort shape of device OTA APIs. Writes are synchronous
//! and chunk-sized; flash writes are assumed non-yielding and bounded in
//! latency.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::PathBuf,
};
use tracing::{debug, info};

const STAGING_FILE: &str = "staging.bin";
const IMAGE_FILE: &str = "image.bin";

/// Entry point of the collaborator: hands out one job per image transfer.
pub trait FirmwareCoordinator: Send + Sync {
    fn begin(&self) -> io::Result<Box<dyn FirmwareJob>>;
}

/// One in-flight image transfer.
pub trait FirmwareJob: Send {
    /// Append a chunk of the image verbatim.
    fn write(&mut self, chunk: &[u8]) -> io::Result<()>;
    /// Validate and install the completed image; atomic from the caller's
    /// point of view.
    fn install(self: Box<Self>) -> io::Result<()>;
    /// Discard a partially received image.
    fn abort(self: Box<Self>);
}

/// Default coordinator: stages the image next to the installed one and
/// swaps it in with an atomic rename on install.
#[derive(Clone, Debug)]
pub struct StagedFlash {
    dir: PathBuf,
}

impl StagedFlash {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn image_path(&self) -> PathBuf {
        self.dir.join(IMAGE_FILE)
    }

    fn staging_path(&self) -> PathBuf {
        self.dir.join(STAGING_FILE)
    }
}

impl FirmwareCoordinator for StagedFlash {
    fn begin(&self) -> io::Result<Box<dyn FirmwareJob>> {
        fs::create_dir_all(&self.dir)?;
        let staging = self.staging_path();
        let file = File::create(&staging)?;
        debug!(staging = %staging.display(), "firmware staging started");
        Ok(Box::new(StagedJob {
            file: Some(file),
            staging,
            image: self.image_path(),
            bytes: 0,
        }))
    }
}

struct StagedJob {
    file: Option<File>,
    staging: PathBuf,
    image: PathBuf,
    bytes: u64,
}

impl FirmwareJob for StagedJob {
    fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        if let Some(file) = &mut self.file {
            file.write_all(chunk)?;
            self.bytes += chunk.len() as u64;
        }
        Ok(())
    }

    fn install(mut self: Box<Self>) -> io::Result<()> {
        let file = self.file.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no staged image")
        })?;
        if self.bytes == 0 {
            drop(file);
            let _ = fs::remove_file(&self.staging);
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty firmware image",
            ));
        }
        file.sync_all()?;
        drop(file);
        match fs::rename(&self.staging, &self.image) {
            Ok(()) => {
                info!(bytes = self.bytes, image = %self.image.display(), "firmware image installed");
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_file(&self.staging);
                Err(err)
            }
        }
    }

    fn abort(mut self: Box<Self>) {
        self.file.take();
        let _ = fs::remove_file(&self.staging);
        debug!(staging = %self.staging.display(), "firmware staging discarded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn install_moves_staged_bytes_into_image() {
        let temp = tempdir().expect("tempdir");
        let flash = StagedFlash::new(temp.path());
        let mut job = flash.begin().expect("begin");
        job.write(b"firmware ").expect("write");
        job.write(b"payload").expect("write");
        job.install().expect("install");

        let image = fs::read(flash.image_path()).expect("read image");
        assert_eq!(image, b"firmware payload");
        assert!(!temp.path().join(STAGING_FILE).exists());
    }

    #[test]
    fn empty_image_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let flash = StagedFlash::new(temp.path());
        let job = flash.begin().expect("begin");
        assert!(job.install().is_err());
        assert!(!flash.image_path().exists());
    }

    #[test]
    fn abort_discards_staging() {
        let temp = tempdir().expect("tempdir");
        let flash = StagedFlash::new(temp.path());
        let mut job = flash.begin().expect("begin");
        job.write(b"partial").expect("write");
        job.abort();
        assert!(!temp.path().join(STAGING_FILE).exists());
        assert!(!flash.image_path().exists());
    }

    #[test]
    fn install_overwrites_previous_image() {
        let temp = tempdir().expect("tempdir");
        let flash = StagedFlash::new(temp.path());
        let mut job = flash.begin().expect("begin");
        job.write(b"v1").expect("write");
        job.install().expect("install v1");

        let mut job = flash.begin().expect("begin");
        job.write(b"v2-longer").expect("write");
        job.install().expect("install v2");

        assert_eq!(fs::read(flash.image_path()).expect("read"), b"v2-longer");
    }
}
