// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sentinel file watching.
//!
//! Each backend runs as a background task that emits the complete file
//! content whenever it observes a change. Backends share one pair of
//! channels, so the hybrid mode is simply both backends running at once.

mod events;
mod poll;

use cv_core::WatchMode;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Buffered updates and errors per watcher. Events observed while the
/// supervisor is busy upgrading queue up here.
const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watched file {} has no parent directory", .0.display())]
    NoParent(PathBuf),
    #[error("watched directory {} was removed", .0.display())]
    DirectoryRemoved(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("file notification error: {0}")]
    Notify(#[from] notify::Error),
}

impl WatchError {
    /// Removal of the watched directory ends the watcher; everything else
    /// is reported and watching continues.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WatchError::DirectoryRemoved(_) | WatchError::NoParent(_))
    }
}

/// Handle to a running watcher.
pub struct FileWatcher {
    /// Complete file content at the moment a change was observed.
    pub updates: mpsc::Receiver<Vec<u8>>,
    pub errors: mpsc::Receiver<WatchError>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    mode: WatchMode,
}

impl FileWatcher {
    /// Start watching `path` with the given backend(s).
    ///
    /// Must be called from within a tokio runtime. In hybrid mode a notify
    /// backend that cannot be created is logged and polling carries on alone.
    pub fn start(path: &Path, mode: WatchMode, poll_interval: Duration) -> Result<Self, WatchError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| WatchError::NoParent(path.to_path_buf()))?
            .to_path_buf();

        let (update_tx, updates) = mpsc::channel(CHANNEL_CAPACITY);
        let (error_tx, errors) = mpsc::channel(CHANNEL_CAPACITY);
        let emitter = Emitter {
            file: path.to_path_buf(),
            dir,
            updates: update_tx,
            errors: error_tx,
            cancel: CancellationToken::new(),
            removed: Arc::new(AtomicBool::new(false)),
        };

        let mut tasks = Vec::new();
        let mut effective = mode;
        if matches!(mode, WatchMode::Notify | WatchMode::Hybrid) {
            match events::spawn(emitter.clone()) {
                Ok(task) => tasks.push(task),
                Err(e) if mode == WatchMode::Hybrid => {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "file notifications unavailable, falling back to polling"
                    );
                    effective = WatchMode::Poll;
                }
                Err(e) => return Err(e),
            }
        }
        if matches!(mode, WatchMode::Poll | WatchMode::Hybrid) {
            tasks.push(poll::spawn(emitter.clone(), poll_interval));
        }

        tracing::debug!(path = %path.display(), mode = %effective, "watching for upgrade sentinel");
        Ok(Self {
            updates,
            errors,
            cancel: emitter.cancel.clone(),
            tasks,
            mode: effective,
        })
    }

    /// Backend(s) actually running.
    pub fn mode(&self) -> WatchMode {
        self.mode
    }

    /// Stop the emitter tasks and close both channels.
    ///
    /// Returns once every task has exited. Updates already queued remain
    /// readable.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            let _ = task.await;
        }
        self.updates.close();
        self.errors.close();
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Shared sending half handed to each backend task.
#[derive(Clone)]
struct Emitter {
    file: PathBuf,
    dir: PathBuf,
    updates: mpsc::Sender<Vec<u8>>,
    errors: mpsc::Sender<WatchError>,
    cancel: CancellationToken,
    removed: Arc<AtomicBool>,
}

impl Emitter {
    /// Read the watched file and forward its content. Missing and empty
    /// files are skipped.
    async fn emit_current(&self) {
        match tokio::fs::read(&self.file).await {
            Ok(bytes) if bytes.is_empty() => {}
            Ok(bytes) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = self.updates.send(bytes) => {}
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                self.error(WatchError::Read {
                    path: self.file.clone(),
                    source,
                })
                .await
            }
        }
    }

    async fn error(&self, err: WatchError) {
        tracing::warn!(error = %err, "sentinel watcher error");
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = self.errors.send(err) => {}
        }
    }

    /// Report removal of the watched directory once, then stop every
    /// backend sharing this emitter.
    async fn directory_removed(&self) {
        if !self.removed.swap(true, Ordering::SeqCst) {
            tracing::warn!(dir = %self.dir.display(), "watched directory removed");
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = self.errors.send(WatchError::DirectoryRemoved(self.dir.clone())) => {}
            }
        }
        self.cancel.cancel();
    }

    fn dir_exists(&self) -> bool {
        self.dir.is_dir()
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
