//! Append-only journal backing the record log

use crate::types::Record;
use crate::Result;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// The shared append-only record log.
///
/// Every mutation and full read is serialized by one lock, and an append
/// paired with its read-back holds that lock across both halves. A client's
/// echo is therefore the journal exactly as of its own submission: it
/// contains the submitted record and nothing committed later.
///
/// The backing file is opened per operation, in append mode for writes and
/// independently for reads. If an open fails the operation degrades to a
/// no-op: the record is dropped, or the read returns empty, and the caller
/// sees no error. Storage faults never take a connection down.
pub struct Journal {
    path: PathBuf,
    guard: Mutex<()>,
}

impl Journal {
    /// Create a journal backed by the file at `path`. The file itself is
    /// opened lazily, once per operation.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record.
    pub async fn append(&self, record: &Record) {
        let _guard = self.guard.lock().await;
        self.append_locked(record).await;
    }

    /// Read the journal's full current contents.
    pub async fn read_all(&self) -> Bytes {
        let _guard = self.guard.lock().await;
        self.read_locked().await
    }

    /// Append one record and read the full contents back under a single
    /// lock acquisition.
    ///
    /// The returned bytes include `record` and nothing appended after it.
    pub async fn append_then_read_all(&self, record: &Record) -> Bytes {
        let _guard = self.guard.lock().await;
        self.append_locked(record).await;
        self.read_locked().await
    }

    async fn append_locked(&self, record: &Record) {
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
        {
            Ok(mut file) => {
                if let Err(e) = file.write_all(record.as_bytes()).await {
                    warn!("Journal append failed, record dropped: {}", e);
                    return;
                }
                if let Err(e) = file.flush().await {
                    warn!("Journal flush failed: {}", e);
                }
            }
            Err(e) => {
                warn!("Journal not writable, record dropped: {}", e);
            }
        }
    }

    async fn read_locked(&self) -> Bytes {
        match fs::read(&self.path).await {
            Ok(contents) => Bytes::from(contents),
            Err(e) => {
                warn!("Journal not readable: {}", e);
                Bytes::new()
            }
        }
    }

    /// Delete the backing file. Called once, on the shutdown path.
    pub async fn remove(&self) -> Result<()> {
        let _guard = self.guard.lock().await;
        fs::remove_file(&self.path).await?;
        Ok(())
    }
}
