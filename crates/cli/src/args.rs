//! Command-line surface
//!
//! One command, no subcommands: point bm at a directory and a bucket and it
//! runs until interrupted.

use std::path::PathBuf;

use clap::Parser;

use bm_core::Settings;

/// Mirror a local directory into an S3-compatible bucket, live.
///
/// On startup the directory and bucket are brought into parity (missing
/// objects uploaded, orphaned objects deleted), then filesystem changes are
/// applied to the bucket as they happen. Runs until interrupted.
#[derive(Parser, Debug)]
#[command(name = "bm")]
#[command(author, version, about)]
pub struct Cli {
    /// Directory to mirror
    pub directory: PathBuf,

    /// Bucket name
    pub bucket: String,

    /// S3 endpoint URL (S3-compatible stores supported)
    pub endpoint: String,

    /// Access key ID
    #[arg(env = "BM_ACCESS_KEY")]
    pub access_key: String,

    /// Secret access key
    #[arg(env = "BM_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Append log output to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Base seconds between upload retries, grows linearly per attempt
    /// (default: 30)
    #[arg(long, value_name = "SECONDS")]
    pub retry_wait: Option<u64>,

    /// Maximum upload attempts per file (default: 15)
    #[arg(long, value_name = "COUNT")]
    pub max_retries: Option<u32>,

    /// Region identifier (default: us-east-1)
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Settings file (default: the bm/config.toml under the user config dir)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Fold command-line overrides into the loaded settings.
    pub fn apply_to(&self, mut settings: Settings) -> Settings {
        if let Some(region) = &self.region {
            settings.region = region.clone();
        }
        if let Some(wait) = self.retry_wait {
            settings.retry.wait_secs = wait;
        }
        if let Some(max) = self.max_retries {
            settings.retry.max_retries = max;
        }
        settings
    }
}
