//! Live event dispatch
//!
//! Translates each filesystem change into bucket operations. Uploads are
//! handed to detached workers so the dispatcher is never stuck behind a slow
//! or retrying transfer; deletes are cheap and run inline. Nothing here may
//! crash the process: a bad event is logged and dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::key::relative_key;
use crate::store::ObjectStore;
use crate::upload::{RetryPolicy, UploadWorker};
use crate::watch::ChangeEvent;

/// Maps change notifications onto the object store.
pub struct EventDispatcher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    root: PathBuf,
    policy: RetryPolicy,
}

impl EventDispatcher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        root: PathBuf,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            root,
            policy,
        }
    }

    /// Process one change. Returns the handle of the background upload task
    /// when one was dispatched; the run loop drops it (uploads are not
    /// tracked), tests join it.
    pub async fn handle(&self, event: ChangeEvent) -> Option<JoinHandle<()>> {
        match self.dispatch(event).await {
            Ok(task) => task,
            Err(e) => {
                error!("failed to process filesystem event: {e}");
                None
            }
        }
    }

    async fn dispatch(&self, event: ChangeEvent) -> Result<Option<JoinHandle<()>>> {
        match event {
            ChangeEvent::Created(path) | ChangeEvent::Modified(path) => {
                if !is_regular_file(&path).await {
                    // Editors churn through temp files that are gone by the
                    // time we look; nothing to mirror.
                    debug!("ignoring event for {}", path.display());
                    return Ok(None);
                }
                Ok(Some(self.worker(&path)?.spawn()))
            }

            ChangeEvent::Removed(path) => {
                // The file is already gone, so there is nothing to check;
                // deleting an absent key succeeds.
                let key = relative_key(&self.root, &path)?;
                self.store.delete_object(&self.bucket, &key).await?;
                info!("deleted {key}");
                Ok(None)
            }

            ChangeEvent::Renamed { from, to } => {
                if !is_regular_file(&to).await {
                    // Destination vanished before we saw the event. The source
                    // key stays in the bucket until the next startup sweep.
                    debug!("ignoring rename to {}", to.display());
                    return Ok(None);
                }
                let from_key = relative_key(&self.root, &from)?;
                let worker = self.worker(&to)?;
                let store = Arc::clone(&self.store);
                let bucket = self.bucket.clone();
                Ok(Some(tokio::spawn(async move {
                    // The destination must land before the source key goes.
                    worker.run().await;
                    match store.delete_object(&bucket, &from_key).await {
                        Ok(()) => info!("deleted {from_key}"),
                        Err(e) => error!("failed to delete {from_key}: {e}"),
                    }
                })))
            }
        }
    }

    fn worker(&self, path: &Path) -> Result<UploadWorker> {
        let key = relative_key(&self.root, path)?;
        Ok(UploadWorker::new(
            Arc::clone(&self.store),
            self.bucket.clone(),
            key,
            path.to_path_buf(),
            self.policy,
        ))
    }
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
