//! bm-s3: aws-sdk-s3 adapter for the bm mirroring engine
//!
//! Implements bm-core's ObjectStore trait against any S3-compatible endpoint,
//! using static credentials and path-style addressing. Large files go through
//! multipart upload.

pub mod client;
pub mod multipart;

pub use client::{Connection, S3Gateway};
