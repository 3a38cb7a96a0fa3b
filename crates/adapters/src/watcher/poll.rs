// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling backend: stat the file every interval and emit on mtime change.

use super::Emitter;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;

pub(super) fn spawn(emitter: Emitter, interval: Duration) -> JoinHandle<()> {
    // Content present before the watcher started is the caller's to read
    let last_seen = stat(&emitter).map(|(mtime, _)| mtime);
    tokio::spawn(run(emitter, interval, last_seen))
}

async fn run(emitter: Emitter, interval: Duration, mut last_seen: Option<SystemTime>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = emitter.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !emitter.dir_exists() {
            emitter.directory_removed().await;
            break;
        }

        let Some((mtime, len)) = stat(&emitter) else {
            continue;
        };
        if len == 0 || last_seen == Some(mtime) {
            continue;
        }
        last_seen = Some(mtime);
        tracing::trace!(len, "sentinel changed on disk");
        emitter.emit_current().await;
    }
}

fn stat(emitter: &Emitter) -> Option<(SystemTime, u64)> {
    let meta = std::fs::metadata(&emitter.file).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}
