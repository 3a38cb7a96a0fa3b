//! Upgrade specs: sentinel-driven binary swaps end to end.

use crate::prelude::*;

fn halting_genesis(node: &Node) {
    node.genesis(&format!(
        r#"echo "genesis $*" >> "$LOG"
printf '{CHAIN2_SENTINEL}' > "$DATA/upgrade-info.json"
exit 1"#
    ));
}

#[test]
fn halt_for_upgrade_swaps_and_restarts() {
    let node = Node::empty();
    halting_genesis(&node);
    node.upgrade(
        "chain2",
        r#"[ "$1" = pre-upgrade ] && exit 1
echo "v2 $*" >> "$LOG""#,
    );

    node.chainvisor().args(&["run", "start"]).passes();

    assert_eq!(node.log(), ["genesis start", "v2 start"]);
    assert_eq!(node.current(), Some("upgrades/chain2".into()));
    assert_eq!(node.backups().len(), 1);
    assert!(node.home().join("cosmovisor/done-upgrades.json").is_file());
    assert!(node
        .home()
        .join("cosmovisor/upgrades/chain2/upgrade-info.json")
        .is_file());
}

#[test]
fn no_restart_after_upgrade_exits_zero() {
    let node = Node::empty();
    halting_genesis(&node);
    node.upgrade("chain2", r#"echo "v2 $*" >> "$LOG""#);

    node.chainvisor()
        .args(&["run", "start"])
        .env("DAEMON_RESTART_AFTER_UPGRADE", "false")
        .env("UNSAFE_SKIP_BACKUP", "true")
        .passes();

    assert_eq!(node.log(), ["genesis start", "v2 pre-upgrade"]);
    assert_eq!(node.current(), Some("upgrades/chain2".into()));
    assert!(node.backups().is_empty());
}

#[test]
fn missing_upgrade_binary_fails() {
    let node = Node::empty();
    halting_genesis(&node);

    node.chainvisor()
        .args(&["run", "start"])
        .env("UNSAFE_SKIP_BACKUP", "true")
        .exits_with(1)
        .stderr_has("chain2");

    assert_eq!(node.current(), Some("genesis".into()));
}

#[test]
fn fatal_pre_upgrade_exits_30() {
    let node = Node::empty();
    halting_genesis(&node);
    node.upgrade(
        "chain2",
        r#"[ "$1" = pre-upgrade ] && exit 30
echo "v2 $*" >> "$LOG""#,
    );

    node.chainvisor()
        .args(&["run", "start"])
        .env("UNSAFE_SKIP_BACKUP", "true")
        .exits_with(30);

    assert_eq!(node.log(), ["genesis start"]);
}
