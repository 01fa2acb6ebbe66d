//! Log sink configuration
//!
//! Everything the daemon reports goes through tracing; this wires the
//! subscriber to stderr or, with --log-file, to an append-only file.
//! `RUST_LOG` overrides the default `info` filter.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn init(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
                .with(filter)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    }

    Ok(())
}
