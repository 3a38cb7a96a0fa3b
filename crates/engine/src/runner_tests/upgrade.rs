// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::RunErrorKind;
use crate::swapper::SwapError;
use cv_adapters::HookError;

#[tokio::test]
async fn upgrades_when_daemon_halts_with_sentinel() {
    let node = Node::new();
    node.genesis(
        r#"echo genesis >> "$LOG"
printf '{"name":"Chain2","height":"49"}' > "$DATA/upgrade-info.json"
exit 1"#,
    );
    node.upgrade("chain2", V2);

    let outcome = node.run(&["start", "--home", "x"]).await.unwrap();

    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(node.log(), ["genesis", "pre-upgrade", "v2 start --home x"]);
    assert_eq!(node.current_upgrade().as_deref(), Some("chain2"));
    assert!(node.done().contains("chain2"));
    assert_eq!(node.backups().len(), 1);
    assert!(node.layout.upgrade_plan_file("chain2").is_file());
}

#[tokio::test]
async fn upgrades_when_sentinel_appears_while_running() {
    let node = Node::new();
    node.genesis(&format!(
        r#"echo genesis >> "$LOG"
printf '{CHAIN2_SENTINEL}' > "$DATA/upgrade-info.json"
exec sleep 30"#
    ));
    node.upgrade("chain2", V2);

    let outcome = node.run(&["start"]).await.unwrap();

    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(node.log(), ["genesis", "pre-upgrade", "v2 start"]);
    assert_eq!(node.current_upgrade().as_deref(), Some("chain2"));
}

#[tokio::test]
async fn sentinel_present_at_start_is_applied_first() {
    let node = Node::new();
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade("chain2", V2);
    node.write_sentinel(CHAIN2_SENTINEL);

    node.run(&["start"]).await.unwrap();
    assert_eq!(node.log(), ["pre-upgrade", "v2 start"]);
}

#[tokio::test]
async fn keeps_name_case_when_recase_disabled() {
    let mut node = Node::new();
    node.config.disable_recase = true;
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade("Chain2", V2);
    node.write_sentinel(r#"{"name":"Chain2","height":49}"#);

    node.run(&["start"]).await.unwrap();
    assert_eq!(node.log(), ["pre-upgrade", "v2 start"]);
    assert_eq!(node.current_upgrade().as_deref(), Some("Chain2"));
}

#[tokio::test]
async fn graceful_shutdown_before_upgrade() {
    let mut node = Node::new();
    node.config.shutdown_grace = Duration::from_secs(10);
    node.genesis(&format!(
        r#"trap 'echo sigterm >> "$LOG"; exit 0' TERM
printf '{CHAIN2_SENTINEL}' > "$DATA/upgrade-info.json"
while true; do sleep 0.05; done"#
    ));
    node.upgrade("chain2", V2);

    node.run(&["start"]).await.unwrap();
    assert_eq!(node.log(), ["sigterm", "pre-upgrade", "v2 start"]);
}

#[tokio::test]
async fn downloads_missing_binary() {
    let mut node = Node::new();
    node.config.allow_download_binaries = true;
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.fetcher
        .serve("https://dl.example/simd-v2", node.script(V2));
    let info = r#"{"binaries":{"any":"https://dl.example/simd-v2"}}"#;
    node.write_sentinel(&serde_json::json!({"name": "chain2", "height": 49, "info": info}).to_string());

    node.run(&["start"]).await.unwrap();

    assert_eq!(node.fetcher.calls(), ["https://dl.example/simd-v2"]);
    assert_eq!(node.log(), ["pre-upgrade", "v2 start"]);
    assert!(node.layout.upgrade_bin("chain2").is_file());
}

#[tokio::test]
async fn missing_binary_fails_upgrade() {
    let node = Node::new();
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.write_sentinel(CHAIN2_SENTINEL);

    let err = node.run(&["start"]).await.unwrap_err();

    assert_eq!(err.state, SupervisorState::Upgrading);
    assert_eq!(err.plan.as_ref().map(|p| p.name.as_str()), Some("chain2"));
    assert!(matches!(
        err.kind,
        RunErrorKind::Swap(SwapError::BinaryMissing { .. })
    ));
    assert_eq!(err.exit_code(), 1);
    assert!(node.log().is_empty());
}

#[tokio::test]
async fn preupgrade_fatal_exits_30() {
    let node = Node::new();
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade(
        "chain2",
        r#"[ "$1" = pre-upgrade ] && exit 30
echo "v2 $*" >> "$LOG""#,
    );
    node.write_sentinel(CHAIN2_SENTINEL);

    let err = node.run(&["start"]).await.unwrap_err();
    assert!(matches!(
        err.kind,
        RunErrorKind::Hook(HookError::PreUpgradeFatal)
    ));
    assert_eq!(err.exit_code(), 30);
    assert!(node.log().is_empty());
}

#[tokio::test]
async fn custom_preupgrade_runs_before_daemon_hook() {
    let mut node = Node::new();
    node.config.custom_preupgrade = Some("pre.sh".into());
    node.install(
        &node.layout.root().join("pre.sh"),
        r#"echo "custom $1 $2" >> "$LOG""#,
    );
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade("chain2", V2);
    node.write_sentinel(CHAIN2_SENTINEL);

    node.run(&["start"]).await.unwrap();
    assert_eq!(
        node.log(),
        ["custom chain2 49", "pre-upgrade", "v2 start"]
    );
}

#[tokio::test]
async fn skip_backup_leaves_no_backup() {
    let mut node = Node::new();
    node.config.unsafe_skip_backup = true;
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade("chain2", V2);
    node.write_sentinel(CHAIN2_SENTINEL);

    node.run(&["start"]).await.unwrap();
    assert!(node.backups().is_empty());
}

#[tokio::test]
async fn no_restart_after_upgrade_when_disabled() {
    let mut node = Node::new();
    node.config.restart_after_upgrade = false;
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade("chain2", V2);
    node.write_sentinel(CHAIN2_SENTINEL);

    let outcome = node.run(&["start"]).await.unwrap();
    assert_eq!(outcome, RunOutcome::UpgradedNoRestart);
    assert_eq!(node.log(), ["pre-upgrade"]);
    assert_eq!(node.current_upgrade().as_deref(), Some("chain2"));
}

#[tokio::test]
async fn skip_height_clears_sentinel() {
    let node = Node::new();
    node.genesis(r#"echo "genesis $*" >> "$LOG""#);
    node.upgrade("chain2", V2);
    node.write_sentinel(CHAIN2_SENTINEL);

    node.run(&["start", "--unsafe-skip-upgrades", "49"])
        .await
        .unwrap();

    assert_eq!(node.log(), ["genesis start --unsafe-skip-upgrades 49"]);
    assert_eq!(node.current_upgrade(), None);
    assert_eq!(fs::metadata(node.layout.sentinel_path()).unwrap().len(), 0);
}

#[tokio::test]
async fn done_upgrade_is_not_reapplied() {
    let node = Node::new();
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade("chain2", V2);
    fs::write(
        node.layout.done_file(),
        r#"[{"name":"chain2","height":49}]"#,
    )
    .unwrap();
    node.write_sentinel(CHAIN2_SENTINEL);

    node.run(&["start"]).await.unwrap();
    assert_eq!(node.log(), ["genesis"]);
    assert_eq!(node.current_upgrade(), None);
}

#[tokio::test]
async fn lower_height_than_applied_is_ignored() {
    let node = Node::new();
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.upgrade("chain3", r#"echo "v3 $*" >> "$LOG""#);
    node.upgrade("chain2", V2);
    cv_core::write_plan_atomic(
        &node.layout.upgrade_plan_file("chain3"),
        &UpgradePlan::new("chain3", 90, ""),
    )
    .unwrap();
    node.layout.link_upgrade("chain3").unwrap();
    node.write_sentinel(CHAIN2_SENTINEL);

    node.run(&["start"]).await.unwrap();
    assert_eq!(node.log(), ["v3 start"]);
    assert_eq!(node.current_upgrade().as_deref(), Some("chain3"));
}

#[tokio::test]
async fn malformed_sentinel_fails() {
    let node = Node::new();
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.write_sentinel(r#"{"name":"chain2","height":0}"#);

    let err = node.run(&["start"]).await.unwrap_err();
    assert_eq!(err.state, SupervisorState::Starting);
    assert!(matches!(err.kind, RunErrorKind::Plan(_)));
    assert!(node.log().is_empty());
}

#[tokio::test]
async fn heals_dangling_current() {
    let node = Node::new();
    node.genesis(r#"echo genesis >> "$LOG""#);
    node.layout.link_upgrade("gone").unwrap();

    node.run(&["start"]).await.unwrap();
    assert_eq!(node.log(), ["genesis"]);
    assert_eq!(
        fs::read_link(node.layout.current_link()).unwrap(),
        Path::new("genesis")
    );
}

#[tokio::test]
async fn applies_successive_upgrades_in_order() {
    let node = Node::new();
    node.genesis(&format!(
        r#"echo genesis >> "$LOG"
printf '{CHAIN2_SENTINEL}' > "$DATA/upgrade-info.json"
exit 1"#
    ));
    node.upgrade(
        "chain2",
        r#"[ "$1" = pre-upgrade ] && exit 1
echo "v2 $*" >> "$LOG"
printf '{"name":"chain3","height":"90"}' > "$DATA/upgrade-info.json"
exit 1"#,
    );
    node.upgrade(
        "chain3",
        r#"[ "$1" = pre-upgrade ] && exit 1
echo "v3 $*" >> "$LOG""#,
    );

    let outcome = node.run(&["start"]).await.unwrap();

    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(node.log(), ["genesis", "v2 start", "v3 start"]);
    assert_eq!(node.current_upgrade().as_deref(), Some("chain3"));
    let applied: Vec<(String, i64)> = node
        .done()
        .entries()
        .iter()
        .map(|e| (e.name.clone(), e.height))
        .collect();
    assert_eq!(
        applied,
        [("chain2".to_string(), 49), ("chain3".to_string(), 90)]
    );
}
