// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const V3: &str = r#"[ "$1" = pre-upgrade ] && exit 1
echo "v3 $*" >> "$LOG""#;

impl Node {
    fn write_batch(&self, json: &str) {
        fs::write(self.config.batch_path(), json).unwrap();
    }

    fn write_height(&self, height: i64) {
        fs::write(self.layout.height_file(), format!("{height}\n")).unwrap();
    }
}

#[tokio::test]
async fn applies_batch_entry_when_height_reached() {
    let node = Node::new();
    node.genesis(
        r#"echo genesis >> "$LOG"
echo 120 > "$DATA/.chainvisor-height"
exec sleep 30"#,
    );
    node.upgrade("v3", V3);
    node.write_batch(r#"{"v3": {"height": 100}, "v4": {"height": 500}}"#);

    let outcome = node.run(&["start"]).await.unwrap();

    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(node.log(), ["genesis", "v3 start"]);
    assert_eq!(node.current_upgrade().as_deref(), Some("v3"));
    assert!(node.done().contains("v3"));
}

#[tokio::test]
async fn batch_waits_for_height() {
    let node = Node::new();
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade("v3", V3);
    node.write_batch(r#"{"v3": {"height": 100}}"#);
    node.write_height(99);

    node.run(&["start"]).await.unwrap();
    assert_eq!(node.log(), ["genesis"]);
    assert_eq!(node.current_upgrade(), None);
}

#[tokio::test]
async fn batch_ignored_without_height_file() {
    let node = Node::new();
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade("v3", V3);
    node.write_batch(r#"{"v3": {"height": 1}}"#);

    node.run(&["start"]).await.unwrap();
    assert_eq!(node.log(), ["genesis"]);
}

#[tokio::test]
async fn legacy_batch_is_not_applied() {
    let node = Node::new();
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade("v3", V3);
    node.write_batch(r#"{"name": "v3", "height": 100}"#);
    node.write_height(200);

    node.run(&["start"]).await.unwrap();
    assert_eq!(node.log(), ["genesis"]);
    assert_eq!(node.current_upgrade(), None);
}

#[tokio::test]
async fn batch_entry_at_skip_height_is_passed_over() {
    let node = Node::new();
    node.genesis(r#"echo "genesis $*" >> "$LOG""#);
    node.upgrade("v3", V3);
    node.write_batch(r#"{"v3": {"height": 100}}"#);
    node.write_height(100);

    node.run(&["--unsafe-skip-upgrades=100"]).await.unwrap();
    assert_eq!(node.log(), ["genesis --unsafe-skip-upgrades=100"]);
}

#[tokio::test]
async fn custom_batch_path() {
    let mut node = Node::new();
    node.config.batch_file = Some(node.home().join("staged.json"));
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade("v3", V3);
    node.write_batch(r#"{"v3": {"height": 10}}"#);
    node.write_height(10);

    node.run(&["start"]).await.unwrap();
    assert_eq!(node.log(), ["v3 start"]);
    assert!(node.home().join("staged.json").is_file());
}
