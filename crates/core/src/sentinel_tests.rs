// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn missing_sentinel_is_none() {
    let dir = TempDir::new().unwrap();
    assert!(read_sentinel(&dir.path().join("upgrade-info.json"), true)
        .unwrap()
        .is_none());
}

#[yare::parameterized(
    empty      = { "" },
    whitespace = { " \n" },
)]
fn blank_sentinel_is_none(content: &str) {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "upgrade-info.json", content);
    assert!(read_sentinel(&path, true).unwrap().is_none());
}

#[yare::parameterized(
    recase_on  = { true,  "chain2" },
    recase_off = { false, "Chain2" },
)]
fn sentinel_name_case(recase: bool, expected: &str) {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "upgrade-info.json",
        r#"{"name":"Chain2","height":"49","info":"{}"}"#,
    );
    let plan = read_sentinel(&path, recase).unwrap().unwrap();
    assert_eq!(plan.name, expected);
    assert_eq!(plan.height, 49);
    assert_eq!(plan.info, "{}");
}

#[yare::parameterized(
    not_json       = { "{nope" },
    empty_name     = { r#"{"name":"","height":5}"# },
    zero_height    = { r#"{"name":"v2","height":0}"# },
    missing_height = { r#"{"name":"v2"}"# },
    array          = { "[]" },
)]
fn malformed_sentinel_is_error(content: &str) {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "upgrade-info.json", content);
    let err = read_sentinel(&path, true).unwrap_err();
    assert!(err.to_string().contains("upgrade-info.json"), "{err}");
}

#[test]
fn parse_plan_reports_origin() {
    let err = parse_plan(b"{}", true, Path::new("/x/upgrade-info.json")).unwrap_err();
    assert!(err.to_string().contains("/x/upgrade-info.json"));
}

#[test]
fn missing_batch_is_empty() {
    let dir = TempDir::new().unwrap();
    assert!(read_batch(&dir.path().join("batch"), true)
        .unwrap()
        .is_empty());
}

#[test]
fn batch_map_form() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "batch",
        r#"{
            "V2": {"name": "V2", "height": 100},
            "v3": {"height": "200", "info": "x"}
        }"#,
    );
    let batch = read_batch(&path, true).unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.get("v2").map(|p| p.height), Some(100));
    let v3 = batch.get("v3").unwrap();
    assert_eq!(v3.height, 200);
    assert_eq!(v3.info, "x");
}

#[test]
fn batch_legacy_single_plan_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "batch", r#"{"name": "v2", "height": 100}"#);
    let err = read_batch(&path, true).unwrap_err();
    assert!(matches!(err, PlanError::LegacyBatch { .. }), "{err}");
}

#[test]
fn batch_must_be_object() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "batch", r#"[{"name": "v2", "height": 100}]"#);
    assert!(matches!(
        read_batch(&path, true),
        Err(PlanError::BatchNotObject { .. })
    ));
}

#[test]
fn batch_entry_is_validated() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "batch", r#"{"v2": {"height": -1}}"#);
    assert!(matches!(
        read_batch(&path, true),
        Err(PlanError::NonPositiveHeight { .. })
    ));
}

#[test]
fn write_plan_atomic_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("upgrades/v2/upgrade-info.json");
    let plan = UpgradePlan::new("v2", 49, "meta");
    write_plan_atomic(&path, &plan).unwrap();

    assert_eq!(read_sentinel(&path, false).unwrap(), Some(plan));
    assert!(!crate::files::tmp_path(&path).exists());
}

#[test]
fn clear_sentinel_truncates() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "upgrade-info.json", r#"{"name":"v2","height":5}"#);
    clear_sentinel(&path).unwrap();
    assert!(path.exists());
    assert!(read_sentinel(&path, true).unwrap().is_none());
}

#[test]
fn clear_missing_sentinel_is_ok() {
    let dir = TempDir::new().unwrap();
    clear_sentinel(&dir.path().join("upgrade-info.json")).unwrap();
}

#[yare::parameterized(
    plain    = { "120",     Some(120) },
    newline  = { "120\n",   Some(120) },
    empty    = { "",        None },
)]
fn height_file(content: &str, expected: Option<i64>) {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, ".chainvisor-height", content);
    assert_eq!(read_height(&path).unwrap(), expected);
}

#[test]
fn height_file_missing_or_garbage() {
    let dir = TempDir::new().unwrap();
    assert_eq!(read_height(&dir.path().join("h")).unwrap(), None);
    let path = write(&dir, "h", "tall");
    assert!(matches!(
        read_height(&path),
        Err(PlanError::HeightFile { .. })
    ));
}
