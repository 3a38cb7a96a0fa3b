// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

const POLL: Duration = Duration::from_millis(20);
const WAIT: Duration = Duration::from_secs(5);

fn sentinel_in(dir: &TempDir) -> PathBuf {
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    data.join("upgrade-info.json")
}

/// Write through a tmp file so no backend can observe partial content.
fn write_atomic(path: &Path, content: &str) {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content).unwrap();
    std::fs::rename(&tmp, path).unwrap();
}

async fn next_update(watcher: &mut FileWatcher) -> Vec<u8> {
    timeout(WAIT, watcher.updates.recv())
        .await
        .expect("timed out waiting for update")
        .expect("updates channel closed")
}

async fn emits_file_content_on_write(mode: WatchMode) {
    let dir = TempDir::new().unwrap();
    let path = sentinel_in(&dir);
    let mut watcher = FileWatcher::start(&path, mode, POLL).unwrap();

    // Give the notify subscription time to settle
    tokio::time::sleep(Duration::from_millis(50)).await;
    write_atomic(&path, r#"{"name":"v2","height":10}"#);

    let content = next_update(&mut watcher).await;
    assert_eq!(content, br#"{"name":"v2","height":10}"#);
    watcher.shutdown().await;
}

#[tokio::test]
async fn notify_emits_file_content_on_write() {
    emits_file_content_on_write(WatchMode::Notify).await;
}

#[tokio::test]
async fn poll_emits_file_content_on_write() {
    emits_file_content_on_write(WatchMode::Poll).await;
}

#[tokio::test]
async fn hybrid_emits_file_content_on_write() {
    emits_file_content_on_write(WatchMode::Hybrid).await;
}

#[tokio::test]
async fn poll_ignores_content_present_at_start() {
    let dir = TempDir::new().unwrap();
    let path = sentinel_in(&dir);
    std::fs::write(&path, r#"{"name":"old","height":1}"#).unwrap();

    let mut watcher = FileWatcher::start(&path, WatchMode::Poll, POLL).unwrap();
    let early = timeout(Duration::from_millis(150), watcher.updates.recv()).await;
    assert!(early.is_err(), "unexpected update: {early:?}");
    watcher.shutdown().await;
}

#[tokio::test]
async fn poll_skips_empty_file() {
    let dir = TempDir::new().unwrap();
    let path = sentinel_in(&dir);
    let mut watcher = FileWatcher::start(&path, WatchMode::Poll, POLL).unwrap();

    std::fs::write(&path, "").unwrap();
    let early = timeout(Duration::from_millis(150), watcher.updates.recv()).await;
    assert!(early.is_err());

    tokio::time::sleep(Duration::from_millis(20)).await;
    write_atomic(&path, "{}");
    assert_eq!(next_update(&mut watcher).await, b"{}");
    watcher.shutdown().await;
}

async fn directory_removal_is_reported_then_channels_close(mode: WatchMode) {
    let dir = TempDir::new().unwrap();
    let path = sentinel_in(&dir);
    let mut watcher = FileWatcher::start(&path, mode, POLL).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();

    let mut saw_removed = false;
    loop {
        match timeout(WAIT, watcher.errors.recv()).await {
            Ok(Some(WatchError::DirectoryRemoved(_))) => saw_removed = true,
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(_) => panic!("timed out waiting for error channel to close"),
        }
    }
    assert!(saw_removed);
    let closed = timeout(WAIT, watcher.updates.recv()).await.unwrap();
    assert!(closed.is_none());
}

#[tokio::test]
async fn notify_reports_directory_removal() {
    directory_removal_is_reported_then_channels_close(WatchMode::Notify).await;
}

#[tokio::test]
async fn poll_reports_directory_removal() {
    directory_removal_is_reported_then_channels_close(WatchMode::Poll).await;
}

#[tokio::test]
async fn hybrid_reports_directory_removal() {
    directory_removal_is_reported_then_channels_close(WatchMode::Hybrid).await;
}

#[tokio::test]
async fn shutdown_closes_channels() {
    let dir = TempDir::new().unwrap();
    let path = sentinel_in(&dir);
    let mut watcher = FileWatcher::start(&path, WatchMode::Hybrid, POLL).unwrap();

    timeout(WAIT, watcher.shutdown()).await.unwrap();
    assert!(watcher.updates.recv().await.is_none());
    assert!(watcher.errors.recv().await.is_none());
}

#[tokio::test]
async fn updates_queue_while_nobody_reads() {
    let dir = TempDir::new().unwrap();
    let path = sentinel_in(&dir);
    let mut watcher = FileWatcher::start(&path, WatchMode::Poll, POLL).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    write_atomic(&path, r#"{"n":1}"#);
    tokio::time::sleep(Duration::from_millis(200)).await;
    watcher.shutdown().await;

    assert_eq!(watcher.updates.recv().await.as_deref(), Some(&br#"{"n":1}"#[..]));
}

#[test]
fn relative_file_without_parent_is_rejected() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let err = FileWatcher::start(Path::new("upgrade-info.json"), WatchMode::Poll, POLL)
            .err()
            .unwrap();
        assert!(matches!(err, WatchError::NoParent(_)));
        assert!(err.is_fatal());
    });
}
