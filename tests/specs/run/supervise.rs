//! Supervision specs: argument passthrough, exits and restarts.

use crate::prelude::*;

#[test]
fn clean_exit_passes_args_and_exits_zero() {
    let node = Node::empty();
    node.genesis(r#"echo "genesis $*" >> "$LOG""#);

    node.chainvisor()
        .args(&["run", "start", "--home", "/tmp/x"])
        .passes();

    assert_eq!(node.log(), ["genesis start --home /tmp/x"]);
    assert_eq!(node.current(), Some("genesis".into()));
    assert!(node.backups().is_empty());
}

#[test]
fn daemon_output_is_passed_through() {
    let node = Node::empty();
    node.genesis("echo to-stdout\necho to-stderr >&2");

    node.chainvisor()
        .args(&["run"])
        .env("COSMOVISOR_DISABLE_LOGS", "true")
        .passes()
        .stdout_eq("to-stdout\n")
        .stderr_has("to-stderr");
}

#[test]
fn disabled_logs_keep_stderr_quiet() {
    let node = Node::empty();
    node.genesis("true");

    node.chainvisor()
        .args(&["run"])
        .env("COSMOVISOR_DISABLE_LOGS", "true")
        .passes()
        .stderr_lacks("configuration loaded");
}

#[test]
fn crash_loop_exits_nonzero() {
    let node = Node::empty();
    node.genesis(
        r#"echo crash >> "$LOG"
exit 3"#,
    );

    node.chainvisor()
        .args(&["run", "start"])
        .env("DAEMON_MAX_RESTART_RETRIES", "2")
        .env("DAEMON_RESTART_DELAY", "10ms")
        .exits_with(1)
        .stderr_has("giving up after 2 restarts");

    assert_eq!(node.log(), ["crash", "crash", "crash"]);
}

#[test]
fn missing_genesis_binary_fails() {
    let node = Node::empty();

    node.chainvisor().args(&["run", "start"]).exits_with(1);
}
