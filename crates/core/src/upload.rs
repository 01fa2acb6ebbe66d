//! Retrying upload worker
//!
//! One worker per file, one task per worker: a burst of filesystem events
//! fans out into independent uploads instead of serializing behind slow
//! network calls. Retry state lives entirely in the worker's own locals.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use humansize::{BINARY, format_size};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WAIT_SECS};
use crate::error::Error;
use crate::store::ObjectStore;

/// How often retry attempts are worth a log line
const WARN_EVERY: u32 = 5;

/// Retry tuning for one upload
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Base wait; attempt N waits `wait * N` before attempt N+1
    pub wait: Duration,

    /// Total attempts before the file is given up on
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(DEFAULT_RETRY_WAIT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Outcome of a single upload attempt
enum Attempt {
    /// Uploaded; carries the byte count for logging
    Done(u64),
    /// The file is gone or no longer a regular file; nothing to do
    Stale,
    /// The file is momentarily unreadable; worth another attempt
    Transient(Error),
    /// Anything else; not worth retrying
    Fatal(Error),
}

/// Uploads one local file under one key, retrying transient access failures
/// with linearly growing backoff.
pub struct UploadWorker {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
    path: PathBuf,
    policy: RetryPolicy,
}

impl UploadWorker {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        key: impl Into<String>,
        path: PathBuf,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            key: key.into(),
            path,
            policy,
        }
    }

    /// Detach the worker onto its own task. The returned handle may be
    /// dropped; the upload keeps running and reports through the log.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drive the upload to its terminal outcome. Never returns an error:
    /// every outcome for a single file is logged, not raised.
    pub async fn run(self) {
        for attempt in 1..=self.policy.max_retries {
            match self.attempt().await {
                Attempt::Done(bytes) => {
                    info!("uploaded {} ({})", self.key, format_size(bytes, BINARY));
                    return;
                }
                Attempt::Stale => {
                    debug!("skipping {}: no longer a regular file", self.key);
                    return;
                }
                Attempt::Transient(e) => {
                    if attempt % WARN_EVERY == 0 {
                        warn!("attempt {attempt}: {} still unreadable: {e}", self.key);
                    }
                    if attempt < self.policy.max_retries {
                        tokio::time::sleep(self.policy.wait * attempt).await;
                    }
                }
                Attempt::Fatal(e) => {
                    error!("upload of {} failed: {e}", self.key);
                    return;
                }
            }
        }
        error!(
            "giving up on {} after {} attempts",
            self.key, self.policy.max_retries
        );
    }

    async fn attempt(&self) -> Attempt {
        // The file may have been deleted or replaced by a directory between
        // the event firing and this worker running.
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Attempt::Stale,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Attempt::Transient(e.into());
            }
            Err(e) => return Attempt::Fatal(e.into()),
        };
        if !meta.is_file() {
            return Attempt::Stale;
        }

        match self.store.put_file(&self.bucket, &self.key, &self.path).await {
            Ok(bytes) => Attempt::Done(bytes),
            Err(e) if e.is_transient_access() => Attempt::Transient(e),
            Err(e) => Attempt::Fatal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockObjectStore;
    use std::io;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            wait: Duration::ZERO,
            max_retries: 15,
        }
    }

    fn denied() -> Error {
        Error::Io(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
    }

    #[tokio::test]
    async fn test_successful_upload_is_one_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"hello").unwrap();

        let mut store = MockObjectStore::new();
        store
            .expect_put_file()
            .withf(|bucket, key, _| bucket == "mirror" && key == "a.txt")
            .times(1)
            .returning(|_, _, _| Ok(5));

        UploadWorker::new(Arc::new(store), "mirror", "a.txt", file, fast_policy())
            .run()
            .await;
    }

    #[tokio::test]
    async fn test_transient_failure_retries_to_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("locked.txt");
        std::fs::write(&file, b"busy").unwrap();

        let mut store = MockObjectStore::new();
        store
            .expect_put_file()
            .times(15)
            .returning(|_, _, _| Err(denied()));

        UploadWorker::new(Arc::new(store), "mirror", "locked.txt", file, fast_policy())
            .run()
            .await;
    }

    #[tokio::test]
    async fn test_fatal_failure_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"hello").unwrap();

        let mut store = MockObjectStore::new();
        store
            .expect_put_file()
            .times(1)
            .returning(|_, _, _| Err(Error::Network("500".into())));

        UploadWorker::new(Arc::new(store), "mirror", "a.txt", file, fast_policy())
            .run()
            .await;
    }

    #[tokio::test]
    async fn test_vanished_file_makes_no_store_calls() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.txt");

        let store = MockObjectStore::new();
        UploadWorker::new(Arc::new(store), "mirror", "gone.txt", missing, fast_policy())
            .run()
            .await;
    }

    #[tokio::test]
    async fn test_directory_at_path_makes_no_store_calls() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let store = MockObjectStore::new();
        UploadWorker::new(Arc::new(store), "mirror", "sub", sub, fast_policy())
            .run()
            .await;
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.wait, Duration::from_secs(30));
        assert_eq!(policy.max_retries, 15);
    }
}
