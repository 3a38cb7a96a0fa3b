//! Configuration error specs
//!
//! Bad environment is reported before any daemon is started.

use crate::prelude::*;

#[test]
fn missing_home_and_name_are_both_reported() {
    cli()
        .args(&["run", "start"])
        .exits_with(2)
        .stderr_has("DAEMON_HOME is not set")
        .stderr_has("DAEMON_NAME is not set");
}

#[test]
fn relative_home_is_rejected() {
    cli()
        .args(&["run", "start"])
        .env("DAEMON_HOME", "relative/home")
        .env("DAEMON_NAME", "simd")
        .exits_with(2)
        .stderr_has("DAEMON_HOME must be an absolute path");
}

#[test]
fn home_without_root_is_rejected() {
    let node = Node::empty();
    std::fs::remove_dir(node.home().join("cosmovisor")).unwrap();

    node.chainvisor()
        .args(&["run", "start"])
        .exits_with(2)
        .stderr_has("cosmovisor root");
}

#[test]
fn invalid_values_are_reported_together() {
    let node = Node::empty();
    node.genesis(r#"echo genesis >> "$LOG""#);

    node.chainvisor()
        .args(&["run", "start"])
        .env("DAEMON_RESTART_AFTER_UPGRADE", "sometimes")
        .env("DAEMON_POLL_INTERVAL", "soon")
        .exits_with(2)
        .stderr_has("2 configuration errors found")
        .stderr_has("DAEMON_RESTART_AFTER_UPGRADE")
        .stderr_has("DAEMON_POLL_INTERVAL");
    assert!(node.log().is_empty());
}
