//! Multipart upload support
//!
//! Files at or above the threshold are uploaded in ranged parts with bounded
//! concurrency. Nothing is persisted between runs: an interrupted upload is
//! aborted and the file simply uploads again on the next event or sweep.

use std::path::Path;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_smithy_types::byte_stream::Length;
use futures::StreamExt;
use tracing::warn;

use bm_core::{Error, Result};

/// Files at or above this size go through multipart upload: 64 MiB
pub const MULTIPART_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Minimum part size: 5 MiB (S3 requirement)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: u64 = 10_000;

/// Concurrent part uploads per file
const PART_CONCURRENCY: usize = 4;

/// Part size for a file: the threshold-sized default, grown just enough to
/// keep the part count within the S3 limit.
pub fn part_size_for(file_size: u64) -> u64 {
    let parts = file_size.div_ceil(MULTIPART_THRESHOLD);
    if parts <= MAX_PARTS {
        MULTIPART_THRESHOLD
    } else {
        file_size.div_ceil(MAX_PARTS).clamp(MIN_PART_SIZE, MAX_PART_SIZE)
    }
}

/// Number of parts a file splits into
pub fn part_count(file_size: u64, part_size: u64) -> u64 {
    file_size.div_ceil(part_size)
}

/// Byte range `[start, end)` of the given 1-based part
pub fn part_range(part_number: u64, part_size: u64, file_size: u64) -> (u64, u64) {
    let start = (part_number - 1) * part_size;
    let end = (start + part_size).min(file_size);
    (start, end)
}

/// Upload `path` under `key` as a multipart object.
pub(crate) async fn upload_parts(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    path: &Path,
    file_size: u64,
    content_type: Option<&str>,
) -> Result<()> {
    let mut create = client.create_multipart_upload().bucket(bucket).key(key);
    if let Some(ct) = content_type {
        create = create.content_type(ct);
    }
    let created = create
        .send()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;
    let upload_id = created
        .upload_id()
        .ok_or_else(|| Error::Network("multipart upload id missing from response".into()))?
        .to_string();

    match upload_all_parts(client, bucket, key, path, file_size, &upload_id).await {
        Ok(parts) => {
            let completed = CompletedMultipartUpload::builder()
                .set_parts(Some(parts))
                .build();
            client
                .complete_multipart_upload()
                .bucket(bucket)
                .key(key)
                .upload_id(&upload_id)
                .multipart_upload(completed)
                .send()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;
            Ok(())
        }
        Err(e) => {
            // Leave no half-written object behind; the abort itself failing
            // only costs the store some garbage parts.
            if let Err(abort_err) = client
                .abort_multipart_upload()
                .bucket(bucket)
                .key(key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                warn!("failed to abort multipart upload of {key}: {abort_err}");
            }
            Err(e)
        }
    }
}

async fn upload_all_parts(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    path: &Path,
    file_size: u64,
    upload_id: &str,
) -> Result<Vec<CompletedPart>> {
    let part_size = part_size_for(file_size);
    let count = part_count(file_size, part_size);

    let results = futures::stream::iter(1..=count)
        .map(|part_number| {
            let client = client.clone();
            let path = path.to_path_buf();
            let upload_id = upload_id.to_string();
            async move {
                let (start, end) = part_range(part_number, part_size, file_size);
                let body = ByteStream::read_from()
                    .path(&path)
                    .offset(start)
                    .length(Length::Exact(end - start))
                    .build()
                    .await
                    .map_err(|e| Error::Network(e.to_string()))?;

                let response = client
                    .upload_part()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .part_number(part_number as i32)
                    .body(body)
                    .send()
                    .await
                    .map_err(|e| Error::Network(e.to_string()))?;

                Ok::<_, Error>(
                    CompletedPart::builder()
                        .part_number(part_number as i32)
                        .set_e_tag(response.e_tag().map(str::to_owned))
                        .build(),
                )
            }
        })
        .buffer_unordered(PART_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut parts = results.into_iter().collect::<Result<Vec<_>>>()?;
    // buffer_unordered yields completion order; S3 wants ascending parts.
    parts.sort_by_key(|p| p.part_number());
    Ok(parts)
}
