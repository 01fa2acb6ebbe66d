//! Filesystem change notifications
//!
//! Wraps a recursive `notify` watch and translates its raw events into the
//! small set of changes the dispatcher acts on. The notify backend runs on
//! its own thread; events cross into the async world over a bounded channel.

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::Result;

const CHANNEL_CAPACITY: usize = 1024;

/// A single filesystem change under the watched root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A file appeared
    Created(PathBuf),
    /// A file's contents changed
    Modified(PathBuf),
    /// A file or directory disappeared
    Removed(PathBuf),
    /// A file moved within the watched tree
    Renamed { from: PathBuf, to: PathBuf },
}

/// Handle to a running recursive watch
pub struct FsWatcher {
    watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FsWatcher {
    /// Start watching `root` recursively. Returns the watch handle and the
    /// receiving end of the change stream.
    pub fn start(root: &Path) -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for change in map_event(event) {
                        // Receiver gone means we are shutting down.
                        let _ = tx.blocking_send(change);
                    }
                }
                Err(e) => tracing::error!("filesystem watch error: {e}"),
            },
            notify::Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        tracing::debug!("watching {} recursively", root.display());
        Ok((
            Self {
                watcher,
                root: root.to_path_buf(),
            },
            rx,
        ))
    }

    /// Stop watching and shut the backend down, joining its thread.
    pub fn stop(mut self) {
        if let Err(e) = self.watcher.unwatch(&self.root) {
            tracing::debug!("unwatch on shutdown: {e}");
        }
        // Dropping the watcher tears down the backend.
    }
}

/// Translate a raw notify event into zero or more changes.
///
/// Renames arrive either as a single two-path event or, on some platforms,
/// as separate from/to halves; the halves degrade to Removed/Created so the
/// mirror still converges.
pub fn map_event(event: notify::Event) -> Vec<ChangeEvent> {
    let mut changes = Vec::new();
    match event.kind {
        EventKind::Create(CreateKind::File) | EventKind::Create(CreateKind::Any) => {
            for p in event.paths {
                changes.push(ChangeEvent::Created(p));
            }
        }
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            for p in event.paths {
                changes.push(ChangeEvent::Modified(p));
            }
        }
        EventKind::Modify(ModifyKind::Name(mode)) => match (mode, event.paths.len()) {
            (RenameMode::Both, 2) | (RenameMode::Any, 2) => {
                let mut paths = event.paths;
                let to = paths.pop().unwrap_or_default();
                let from = paths.pop().unwrap_or_default();
                changes.push(ChangeEvent::Renamed { from, to });
            }
            (RenameMode::From, _) => {
                for p in event.paths {
                    changes.push(ChangeEvent::Removed(p));
                }
            }
            (RenameMode::To, _) => {
                for p in event.paths {
                    changes.push(ChangeEvent::Created(p));
                }
            }
            _ => {}
        },
        EventKind::Remove(RemoveKind::File)
        | EventKind::Remove(RemoveKind::Folder)
        | EventKind::Remove(RemoveKind::Any) => {
            for p in event.paths {
                changes.push(ChangeEvent::Removed(p));
            }
        }
        _ => {}
    }
    changes
}
