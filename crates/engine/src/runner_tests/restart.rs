// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::RunErrorKind;

#[tokio::test]
async fn clean_exit_stops() {
    let node = Node::new();
    node.genesis(r#"echo "genesis $*" >> "$LOG""#);

    let outcome = node.run(&["start"]).await.unwrap();
    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(node.log(), ["genesis start"]);
    assert!(node.backups().is_empty());
}

#[tokio::test]
async fn crash_loop_gives_up_after_max_restarts() {
    let mut node = Node::new();
    node.config.max_restart_retries = 2;
    node.config.restart_delay = Duration::from_millis(10);
    node.genesis(
        r#"echo crash >> "$LOG"
exit 3"#,
    );

    let err = node.run(&["start"]).await.unwrap_err();

    assert_eq!(err.state, SupervisorState::Backoff);
    assert!(matches!(
        err.kind,
        RunErrorKind::RestartsExhausted {
            attempts: 2,
            last: ChildExit::Code(3)
        }
    ));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(node.log(), ["crash", "crash", "crash"]);
}

#[tokio::test]
async fn recovers_after_transient_crash() {
    let mut node = Node::new();
    node.config.max_restart_retries = 5;
    node.genesis(
        r#"echo run >> "$LOG"
[ "$(wc -l < "$LOG")" -ge 3 ] && exit 0
exit 1"#,
    );

    let outcome = node.run(&["start"]).await.unwrap();
    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(node.log(), ["run", "run", "run"]);
}

#[tokio::test]
async fn upgrade_after_crashes_resets_restart_budget() {
    let mut node = Node::new();
    node.config.max_restart_retries = 1;
    node.genesis(&format!(
        r#"echo crash >> "$LOG"
[ "$(wc -l < "$LOG")" -ge 2 ] && printf '{CHAIN2_SENTINEL}' > "$DATA/upgrade-info.json"
exit 1"#
    ));
    node.upgrade(
        "chain2",
        r#"[ "$1" = pre-upgrade ] && exit 1
echo v2 >> "$LOG"
[ "$(wc -l < "$LOG")" -ge 4 ] && exit 0
exit 1"#,
    );

    let outcome = node.run(&["start"]).await.unwrap();
    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(node.log(), ["crash", "crash", "v2", "v2"]);
}
