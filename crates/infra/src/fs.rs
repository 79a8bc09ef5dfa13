//! Filesystem-backed durable store
//!
//! [`FsStore`] keeps one file per key under a root directory. File names
//! are the hex encoding of the key with a `.bin` suffix, so any byte key
//! maps to a portable name (keys longer than roughly 120 bytes exceed
//! common file name limits and fail with an I/O error).
//!
//! Writes land in a sibling `.tmp` file that is renamed over the target,
//! so a reader never observes a partially written value. Puts and removes
//! are serialized by an async mutex and run on their own task: once
//! started, a mutation finishes together with its byte accounting even if
//! the caller stops waiting. Reads run concurrently.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use stratum_core::{Deadline, DurableStore, StoreError, StoreResult};
use tokio::fs;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ensure_deadline;

const ENTRY_SUFFIX: &str = "bin";
const TEMP_SUFFIX: &str = "tmp";

/// Durable store writing one file per key
#[derive(Debug)]
pub struct FsStore {
    inner: Arc<FsInner>,
}

#[derive(Debug)]
struct FsInner {
    root: PathBuf,
    max_bytes: Option<u64>,
    used_bytes: AtomicU64,
    write_lock: Mutex<()>,
}

impl FsStore {
    /// Open (creating if needed) a store rooted at `root`
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the directory cannot be created or
    /// scanned.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open_inner(root.into(), None).await
    }

    /// Open a store that rejects writes once its values exceed `max_bytes`
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the directory cannot be created or
    /// scanned.
    pub async fn open_with_max_bytes(
        root: impl Into<PathBuf>,
        max_bytes: u64,
    ) -> StoreResult<Self> {
        Self::open_inner(root.into(), Some(max_bytes)).await
    }

    async fn open_inner(root: PathBuf, max_bytes: Option<u64>) -> StoreResult<Self> {
        fs::create_dir_all(&root).await?;
        let used = scan_used_bytes(&root).await?;
        debug!(root = %root.display(), used_bytes = used, ?max_bytes, "opened filesystem store");

        let inner = FsInner {
            root,
            max_bytes,
            used_bytes: AtomicU64::new(used),
            write_lock: Mutex::new(()),
        };
        Ok(Self { inner: Arc::new(inner) })
    }

    /// Directory holding the entry files
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Bytes of stored values accounted against the budget
    pub fn used_bytes(&self) -> u64 {
        self.inner.used_bytes()
    }

    fn entry_path(&self, key: &[u8]) -> PathBuf {
        self.inner.entry_path(key)
    }

    #[cfg(test)]
    fn temp_path(&self, key: &[u8]) -> PathBuf {
        self.inner.temp_path(key)
    }
}

impl FsInner {
    fn used_bytes(&self) -> u64 {
        self.used_bytes.load(Ordering::Acquire)
    }

    fn entry_path(&self, key: &[u8]) -> PathBuf {
        self.root.join(format!("{}.{ENTRY_SUFFIX}", hex::encode(key)))
    }

    fn temp_path(&self, key: &[u8]) -> PathBuf {
        self.root.join(format!("{}.{ENTRY_SUFFIX}.{TEMP_SUFFIX}", hex::encode(key)))
    }

    async fn write_entry(&self, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        let _writing = self.write_lock.lock().await;

        let path = self.entry_path(key);
        let previous = existing_len(&path).await?;
        let requested = value.len() as u64;
        let used = self.used_bytes();
        let next = used.saturating_sub(previous) + requested;
        if let Some(max) = self.max_bytes {
            if next > max {
                return Err(StoreError::Capacity {
                    requested,
                    available: max.saturating_sub(used.saturating_sub(previous)),
                });
            }
        }

        let temp = self.temp_path(key);
        fs::write(&temp, &value).await?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        self.used_bytes.store(next, Ordering::Release);
        Ok(())
    }

    async fn remove_entry(&self, key: &[u8]) -> StoreResult<bool> {
        let _writing = self.write_lock.lock().await;

        let path = self.entry_path(key);
        let previous = existing_len(&path).await?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                self.used_bytes.fetch_sub(previous.min(self.used_bytes()), Ordering::AcqRel);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Wait for a detached mutation. The task keeps running if this future is
/// dropped.
async fn join_mutation<T>(handle: JoinHandle<StoreResult<T>>) -> StoreResult<T> {
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(StoreError::Io(io::Error::other(e))),
    }
}

/// Sum the sizes of every entry file under `root`, ignoring leftovers from
/// interrupted writes
async fn scan_used_bytes(root: &Path) -> io::Result<u64> {
    let mut total = 0;
    let mut dir = fs::read_dir(root).await?;
    while let Some(item) = dir.next_entry().await? {
        let path = item.path();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ENTRY_SUFFIX) => total += item.metadata().await?.len(),
            Some(TEMP_SUFFIX) => {
                warn!(path = %path.display(), "removing incomplete write");
                fs::remove_file(&path).await?;
            }
            _ => {}
        }
    }
    Ok(total)
}

/// Size of the file at `path`, zero when it does not exist
async fn existing_len(path: &Path) -> io::Result<u64> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl DurableStore for FsStore {
    async fn get(&self, key: &[u8], deadline: Deadline) -> StoreResult<Option<Vec<u8>>> {
        ensure_deadline(deadline)?;
        match fs::read(self.entry_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &[u8], value: Vec<u8>, deadline: Deadline) -> StoreResult<()> {
        ensure_deadline(deadline)?;
        let inner = Arc::clone(&self.inner);
        let key = key.to_vec();
        join_mutation(tokio::spawn(async move { inner.write_entry(&key, value).await })).await
    }

    async fn remove(&self, key: &[u8], deadline: Deadline) -> StoreResult<bool> {
        ensure_deadline(deadline)?;
        let inner = Arc::clone(&self.inner);
        let key = key.to_vec();
        join_mutation(tokio::spawn(async move { inner.remove_entry(&key).await })).await
    }
}
