//! Spilling a part's body to a temporary file once it crosses a size
//! threshold.

use std::path::PathBuf;

use tempfile::Builder;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::Error;

/// Tunables for [`crate::SpillingMultipart`].
#[derive(Debug, Clone)]
pub struct SpillConfig {
    /// A part's body is written to a temporary file once it has buffered
    /// more than this many bytes in memory.
    pub max_before_write: u64,
    /// The maximum number of parts a single message may contain.
    pub max_parts: usize,
    /// If true, exceeding `max_parts` is an error
    /// ([`Error::PartsLimitExceeded`]); if false, parsing simply stops after
    /// `max_parts`, leaving any further input in the stream undrained.
    pub fail_on_limit: bool,
}

impl Default for SpillConfig {
    fn default() -> Self {
        SpillConfig {
            max_before_write: 52_428_800,
            max_parts: 20,
            fail_on_limit: false,
        }
    }
}

impl SpillConfig {
    /// Set [`SpillConfig::max_before_write`].
    #[must_use]
    pub fn with_max_before_write(mut self, max_before_write: u64) -> Self {
        self.max_before_write = max_before_write;
        self
    }

    /// Set [`SpillConfig::max_parts`].
    #[must_use]
    pub fn with_max_parts(mut self, max_parts: usize) -> Self {
        self.max_parts = max_parts;
        self
    }

    /// Set [`SpillConfig::fail_on_limit`].
    #[must_use]
    pub fn with_fail_on_limit(mut self, fail_on_limit: bool) -> Self {
        self.fail_on_limit = fail_on_limit;
        self
    }
}

fn delete_and_log(path: &std::path::Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %err, "failed to delete spill file");
        }
    }
}

/// Guards a freshly-created temp file up until the part it belongs to has
/// been fully, successfully written: deletes it on drop unless disarmed.
///
/// This is what makes "any error between allocating the file and emitting
/// the finished part deletes it immediately" true without the writer having
/// to remember to clean up on every one of its `?` early returns: the guard
/// does it from `Drop` the moment the write future is abandoned.
struct PendingFile {
    path: PathBuf,
    armed: bool,
}

impl PendingFile {
    fn new(path: PathBuf) -> Self {
        PendingFile { path, armed: true }
    }

    fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if self.armed && !self.path.as_os_str().is_empty() {
            let path = self.path.clone();
            tokio::task::spawn_blocking(move || delete_and_log(&path));
        }
    }
}

/// A part body that spilled to disk.
///
/// The backing file is deleted when this value drops, unless
/// [`SpillFile::do_not_delete_on_drop`] was called first. Deletion happens on
/// a blocking task, mirroring how the file itself was written.
#[derive(Debug)]
pub struct SpillFile {
    path: PathBuf,
    size: u64,
    delete_on_drop: bool,
}

impl SpillFile {
    /// The file's path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// The number of bytes written to the file.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Keep the file on disk after this value drops; it becomes the caller's
    /// responsibility to delete it.
    pub fn do_not_delete_on_drop(&mut self) {
        self.delete_on_drop = false;
    }

    /// Take ownership of the path, disarming the automatic cleanup.
    #[must_use]
    pub fn into_path(mut self) -> PathBuf {
        self.delete_on_drop = false;
        std::mem::take(&mut self.path)
    }

    /// Read the whole file back into memory.
    ///
    /// Convenience only — a spill exists precisely because the body was too
    /// big to want in memory at once; prefer opening [`SpillFile::path`]
    /// yourself with a bounded-size reader for anything large.
    pub async fn read_all(&self) -> Result<bytes::Bytes, Error> {
        let data = tokio::fs::read(&self.path).await?;
        Ok(bytes::Bytes::from(data))
    }
}

impl Drop for SpillFile {
    fn drop(&mut self) {
        if self.delete_on_drop && !self.path.as_os_str().is_empty() {
            let path = self.path.clone();
            tokio::task::spawn_blocking(move || delete_and_log(&path));
        }
    }
}

/// Writer half of a spill-in-progress: starts buffering in memory and
/// transparently switches to a temp file once `max_before_write` is crossed.
pub(crate) enum SpillWriter {
    Memory(bytes::BytesMut),
    File { pending: PendingFile, file: File, written: u64 },
}

impl SpillWriter {
    pub(crate) fn new() -> Self {
        SpillWriter::Memory(bytes::BytesMut::new())
    }

    pub(crate) async fn write(&mut self, chunk: &[u8], max_before_write: u64) -> Result<(), Error> {
        match self {
            SpillWriter::Memory(buf) => {
                if buf.len() as u64 + chunk.len() as u64 > max_before_write {
                    let path = tokio::task::spawn_blocking(|| Builder::new().prefix("multipart-stream").tempfile())
                        .await
                        .expect("spawn_blocking panicked")?
                        .into_temp_path()
                        .keep()
                        .map_err(|e| Error::Io(e.error))?;
                    tracing::debug!(path = %path.display(), threshold = max_before_write, "spilling part body to temp file");
                    let pending = PendingFile::new(path.clone());
                    let mut file = File::create(&path).await?;
                    let written = buf.len() as u64;
                    file.write_all(&buf[..]).await?;
                    file.write_all(chunk).await?;
                    *self = SpillWriter::File { pending, file, written: written + chunk.len() as u64 };
                } else {
                    buf.extend_from_slice(chunk);
                }
            }
            SpillWriter::File { file, written, .. } => {
                file.write_all(chunk).await?;
                *written += chunk.len() as u64;
            }
        }
        Ok(())
    }

    pub(crate) async fn finish(self) -> Result<crate::part::PartBody, Error> {
        match self {
            SpillWriter::Memory(buf) => Ok(crate::part::PartBody::Memory(buf.freeze())),
            SpillWriter::File { pending, mut file, written } => {
                file.sync_all().await?;
                let path = pending.disarm();
                Ok(crate::part::PartBody::Spilled(SpillFile { path, size: written, delete_on_drop: true }))
            }
        }
    }
}
