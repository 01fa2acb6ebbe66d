//! ObjectStore trait definition
//!
//! The interface the mirroring engine needs from an object-storage backend.
//! Keeping it a trait decouples the engine from the S3 SDK and lets the
//! engine be tested against a mock.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// One page of a bucket listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Object keys on this page
    pub keys: Vec<String>,

    /// Token for the next page; `None` when the listing is complete
    pub next_token: Option<String>,
}

/// Operations the mirroring engine requires from a storage backend.
///
/// Calls are stateless; a shared client may serve any number of concurrent
/// callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of the bucket's keys, continuing from `token`.
    async fn list_page(&self, bucket: &str, token: Option<String>) -> Result<ListPage>;

    /// Upload the file at `path` under `key`. Returns the bytes uploaded.
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<u64>;

    /// Delete `key` from the bucket. Deleting an absent key succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}
