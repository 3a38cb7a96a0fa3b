// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::RunErrorKind;
use cv_adapters::WatchError;

const LONG_RUNNING: &str = r#"trap 'echo "got $SIG" >> "$LOG"; exit 0' TERM
trap 'echo got quit >> "$LOG"; exit 0' QUIT
SIG=term
echo started >> "$LOG"
while true; do sleep 0.05; done"#;

/// Wait until the daemon has logged its first line.
async fn wait_started(node: &Node) {
    for _ in 0..400 {
        if !node.log().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("daemon never started");
}

#[tokio::test]
async fn cancellation_stops_daemon() {
    let mut node = Node::new();
    node.config.shutdown_grace = Duration::from_secs(10);
    node.genesis(LONG_RUNNING);
    let cancel = CancellationToken::new();
    let runner = node.runner(&["start"]).with_cancel(cancel.clone());

    let handle = tokio::spawn(run_to_end(runner));
    wait_started(&node).await;
    cancel.cancel();

    assert_eq!(handle.await.unwrap().unwrap(), RunOutcome::Stopped);
    assert_eq!(node.log(), ["started", "got term"]);
}

#[tokio::test]
async fn forwards_quit_signal() {
    let mut node = Node::new();
    node.config.shutdown_grace = Duration::from_secs(10);
    node.genesis(LONG_RUNNING);
    let (tx, rx) = mpsc::channel(1);
    let runner = node.runner(&["start"]).with_signals(rx);

    let handle = tokio::spawn(run_to_end(runner));
    wait_started(&node).await;
    tx.send(Signal::SIGQUIT).await.unwrap();

    assert_eq!(handle.await.unwrap().unwrap(), RunOutcome::Stopped);
    assert_eq!(node.log(), ["started", "got quit"]);
}

#[tokio::test]
async fn zero_grace_kills_stubborn_daemon() {
    let node = Node::new();
    node.genesis(
        r#"trap '' TERM
echo started >> "$LOG"
exec sleep 30"#,
    );
    let cancel = CancellationToken::new();
    let runner = node.runner(&["start"]).with_cancel(cancel.clone());

    let handle = tokio::spawn(run_to_end(runner));
    wait_started(&node).await;
    cancel.cancel();

    assert_eq!(handle.await.unwrap().unwrap(), RunOutcome::Stopped);
}

#[tokio::test]
async fn signal_during_restart_delay_stops() {
    let mut node = Node::new();
    node.config.restart_delay = Duration::from_secs(30);
    node.genesis(
        r#"echo crash >> "$LOG"
exit 1"#,
    );
    let (tx, rx) = mpsc::channel(1);
    let runner = node.runner(&["start"]).with_signals(rx);

    let handle = tokio::spawn(run_to_end(runner));
    wait_started(&node).await;
    tx.send(Signal::SIGTERM).await.unwrap();

    assert_eq!(handle.await.unwrap().unwrap(), RunOutcome::Stopped);
    assert_eq!(node.log(), ["crash"]);
}

#[tokio::test]
async fn removed_data_dir_fails() {
    let node = Node::new();
    node.genesis(
        r#"echo started >> "$LOG"
exec sleep 30"#,
    );
    let runner = node.runner(&["start"]);

    let handle = tokio::spawn(run_to_end(runner));
    wait_started(&node).await;
    fs::remove_dir_all(node.layout.data_dir()).unwrap();

    let err = handle.await.unwrap().unwrap_err();
    assert_eq!(err.state, SupervisorState::Running);
    assert!(matches!(
        err.kind,
        RunErrorKind::Watch(WatchError::DirectoryRemoved(_))
    ));
}
