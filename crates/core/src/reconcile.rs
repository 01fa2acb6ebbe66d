//! Startup reconciliation sweep
//!
//! One full diff between the directory tree and the bucket, run once at
//! process start. Whatever exists locally but not remotely is uploaded;
//! whatever exists remotely but not locally is deleted. Keys present on both
//! sides are left untouched — presence is the only signal, not content.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::key::{key_path, relative_key};
use crate::store::ObjectStore;

/// What one sweep did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub uploaded: usize,
    pub deleted: usize,
}

/// Computes and applies the directory/bucket difference.
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    root: PathBuf,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, root: PathBuf) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            root,
        }
    }

    /// Run one full sweep. The first gateway failure aborts the sweep and is
    /// propagated; unlike the live upload path there is no retry here, since
    /// the sweep runs before watching begins and a half-established baseline
    /// would silently diverge.
    pub async fn sweep(&self) -> Result<SweepStats> {
        let local = self.local_files();
        let remote = self.remote_keys().await?;

        let mut stats = SweepStats {
            uploaded: 0,
            deleted: 0,
        };

        for key in local.difference(&remote) {
            let path = key_path(&self.root, key);
            let bytes = self.store.put_file(&self.bucket, key, &path).await?;
            info!("uploaded {key} ({bytes} bytes)");
            stats.uploaded += 1;
        }

        for key in remote.difference(&local) {
            self.store.delete_object(&self.bucket, key).await?;
            info!("deleted {key}");
            stats.deleted += 1;
        }

        Ok(stats)
    }

    /// Every regular file under the root, as keys. Unreadable entries are
    /// logged and skipped rather than failing the whole sweep.
    fn local_files(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry during sweep: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match relative_key(&self.root, entry.path()) {
                Ok(key) => {
                    keys.insert(key);
                }
                Err(e) => warn!("skipping {}: {e}", entry.path().display()),
            }
        }
        keys
    }

    /// Every key in the bucket, following continuation tokens to the end.
    async fn remote_keys(&self) -> Result<BTreeSet<String>> {
        let mut keys = BTreeSet::new();
        let mut token = None;
        loop {
            let page = self.store.list_page(&self.bucket, token).await?;
            keys.extend(page.keys);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(keys)
    }
}
