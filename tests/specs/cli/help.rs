//! Top-level help and version specs

use crate::prelude::*;

#[test]
fn version_prints_name_and_version() {
    cli()
        .args(&["--version"])
        .passes()
        .stdout_eq(&format!("chainvisor {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn help_lists_run() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("Usage: chainvisor");
}

#[test]
fn run_help_reaches_the_daemon() {
    let node = Node::empty();
    node.genesis(r#"echo "genesis $*" >> "$LOG""#);

    node.chainvisor().args(&["run", "--help"]).passes();
    assert_eq!(node.log(), ["genesis --help"]);
}
