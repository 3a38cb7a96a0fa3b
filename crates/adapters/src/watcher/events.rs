// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-notification backend (inotify, FSEvents, ... via the `notify` crate).

use super::{Emitter, WatchError};
use notify::event::{EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Subscribe to the watched file's directory and spawn the forwarding task.
pub(super) fn spawn(emitter: Emitter) -> Result<JoinHandle<()>, WatchError> {
    let (raw_tx, raw_rx) = mpsc::channel(32);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let _ = raw_tx.blocking_send(res);
    })?;
    watcher.watch(&emitter.dir, RecursiveMode::NonRecursive)?;

    Ok(tokio::spawn(forward(emitter, watcher, raw_rx)))
}

async fn forward(
    emitter: Emitter,
    // Held so the OS subscription lives as long as the task
    _watcher: RecommendedWatcher,
    mut raw_rx: mpsc::Receiver<notify::Result<notify::Event>>,
) {
    loop {
        let res = tokio::select! {
            _ = emitter.cancel.cancelled() => break,
            res = raw_rx.recv() => match res {
                Some(res) => res,
                None => break,
            },
        };

        match res {
            Ok(event) => {
                if !emitter.dir_exists() {
                    emitter.directory_removed().await;
                    break;
                }
                if touches_file(&emitter, &event) {
                    tracing::trace!(kind = ?event.kind, "sentinel change notification");
                    emitter.emit_current().await;
                }
            }
            Err(e) => emitter.error(WatchError::Notify(e)).await,
        }
    }
}

fn touches_file(emitter: &Emitter, event: &notify::Event) -> bool {
    let relevant_kind = match event.kind {
        EventKind::Create(_) | EventKind::Any | EventKind::Other => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        EventKind::Access(_) | EventKind::Remove(_) => false,
    };
    let name = emitter.file.file_name();
    relevant_kind && event.paths.iter().any(|p| p.file_name() == name)
}
