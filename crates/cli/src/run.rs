//! Lifecycle controller
//!
//! Wires the gateway, watcher, reconciler, and dispatcher together, then
//! drives them until interrupted. The watcher starts before the sweep so the
//! window in which a change can slip past both is only the watch backend's
//! own establishment latency; a change lost in that window stays lost until
//! the next process start.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use bm_core::{EventDispatcher, FsWatcher, ObjectStore, Reconciler, RetryPolicy, Settings};
use bm_s3::{Connection, S3Gateway};

use crate::args::Cli;
use crate::exit_code::ExitCode;

pub async fn run(cli: Cli) -> ExitCode {
    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e}");
            return ExitCode::from_error(&e);
        }
    };

    // Events arrive with absolute paths; the root must match.
    let root = match std::fs::canonicalize(&cli.directory) {
        Ok(root) if root.is_dir() => root,
        Ok(_) => {
            error!("{} is not a directory", cli.directory.display());
            return ExitCode::UsageError;
        }
        Err(e) => {
            error!("cannot open {}: {e}", cli.directory.display());
            return ExitCode::UsageError;
        }
    };

    let connection = Connection {
        endpoint: cli.endpoint.clone(),
        access_key: cli.access_key.clone(),
        secret_key: cli.secret_key.clone(),
        region: settings.region.clone(),
        path_style: settings.path_style,
    };
    let store: Arc<dyn ObjectStore> = match S3Gateway::connect(&connection).await {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!("failed to create S3 client: {e}");
            return ExitCode::from_error(&e);
        }
    };

    let policy = RetryPolicy {
        wait: Duration::from_secs(settings.retry.wait_secs),
        max_retries: settings.retry.max_retries,
    };

    let (watcher, mut events) = match FsWatcher::start(&root) {
        Ok(started) => started,
        Err(e) => {
            error!("failed to watch {}: {e}", root.display());
            return ExitCode::from_error(&e);
        }
    };

    info!("mirroring {} into {}", root.display(), cli.bucket);

    // The sweep runs concurrently with live watching; events raced against
    // it at worst re-upload a file the sweep already covered.
    let reconciler = Reconciler::new(Arc::clone(&store), cli.bucket.clone(), root.clone());
    let mut sweep = tokio::spawn(async move { reconciler.sweep().await });
    let mut sweep_pending = true;

    let dispatcher = EventDispatcher::new(store, cli.bucket.clone(), root, policy);

    let code = loop {
        tokio::select! {
            outcome = &mut sweep, if sweep_pending => {
                sweep_pending = false;
                match outcome {
                    Ok(Ok(stats)) => {
                        info!(
                            "initial sweep complete: {} uploaded, {} deleted",
                            stats.uploaded, stats.deleted
                        );
                    }
                    Ok(Err(e)) => {
                        error!("initial sweep failed: {e}");
                        break ExitCode::from_error(&e);
                    }
                    Err(e) => {
                        error!("initial sweep aborted: {e}");
                        break ExitCode::GeneralError;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break ExitCode::Success;
            }
            event = events.recv() => {
                match event {
                    // In-flight uploads are deliberately not awaited; the
                    // handle is dropped and they finish or die with us.
                    Some(event) => { let _ = dispatcher.handle(event).await; }
                    None => {
                        error!("change notification stream closed unexpectedly");
                        break ExitCode::GeneralError;
                    }
                }
            }
        }
    };

    watcher.stop();
    code
}

fn load_settings(cli: &Cli) -> bm_core::Result<Settings> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_default()?,
    };
    Ok(cli.apply_to(settings))
}
