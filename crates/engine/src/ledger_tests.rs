// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let ledger = DoneLedger::load(&dir.path().join("done-upgrades.json")).unwrap();
    assert!(ledger.entries().is_empty());
    assert!(!ledger.contains("v2"));
}

#[test]
fn record_persists_and_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("done-upgrades.json");
    let mut ledger = DoneLedger::load(&path).unwrap();
    ledger.record(&UpgradePlan::new("v2", 49, "")).unwrap();
    ledger.record(&UpgradePlan::new("v3", 90, "")).unwrap();

    let reloaded = DoneLedger::load(&path).unwrap();
    assert_eq!(
        reloaded.entries(),
        &[
            DoneEntry {
                name: "v2".into(),
                height: 49
            },
            DoneEntry {
                name: "v3".into(),
                height: 90
            },
        ]
    );
    assert!(!dir.path().join("done-upgrades.json.tmp").exists());
}

#[test]
fn recording_twice_keeps_first_entry() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("done-upgrades.json");
    let mut ledger = DoneLedger::load(&path).unwrap();
    ledger.record(&UpgradePlan::new("v2", 49, "")).unwrap();
    ledger.record(&UpgradePlan::new("v2", 80, "")).unwrap();
    assert_eq!(ledger.entries().len(), 1);
    assert_eq!(ledger.entries()[0].height, 49);
}

#[test]
fn corrupt_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("done-upgrades.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(
        DoneLedger::load(&path),
        Err(LedgerError::Json { .. })
    ));
}
