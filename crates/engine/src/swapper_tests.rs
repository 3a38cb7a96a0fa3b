// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cv_adapters::FakeFetcher;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

fn install(path: &Path, mode: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "#!/bin/sh\n").unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

fn setup(policy: DownloadPolicy) -> (TempDir, Swapper<FakeFetcher>, FakeFetcher) {
    let home = TempDir::new().unwrap();
    let layout = Layout::new(home.path(), "simd");
    install(&layout.genesis_bin(), 0o755);
    layout.heal_current().unwrap();
    let fetcher = FakeFetcher::new();
    let swapper = Swapper::new(layout, fetcher.clone(), policy, true).unwrap();
    (home, swapper, fetcher)
}

#[tokio::test]
async fn swaps_to_installed_binary() {
    let (_home, mut swapper, fetcher) = setup(DownloadPolicy::default());
    let layout = swapper.layout().clone();
    install(&layout.upgrade_bin("v2"), 0o644);

    let plan = UpgradePlan::new("v2", 49, "");
    let bin = swapper.apply(&plan).await.unwrap();

    assert_eq!(bin, layout.upgrade_bin("v2"));
    let mode = fs::metadata(&bin).unwrap().permissions().mode();
    assert_ne!(mode & 0o100, 0);
    assert_eq!(layout.current_bin().path, layout.upgrade_bin("v2"));
    assert_eq!(
        fs::read_link(layout.current_link()).unwrap(),
        Path::new("upgrades/v2")
    );
    assert_eq!(swapper.current_plan().unwrap(), Some(plan));
    assert!(swapper.is_done("v2"));
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn missing_binary_without_downloads_fails() {
    let (_home, mut swapper, _) = setup(DownloadPolicy::default());
    let layout = swapper.layout().clone();

    let err = swapper
        .apply(&UpgradePlan::new("v2", 49, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, SwapError::BinaryMissing { name, .. } if name == "v2"));
    assert_eq!(layout.current_bin().path, layout.genesis_bin());
    assert!(!swapper.is_done("v2"));
}

#[tokio::test]
async fn downloads_missing_binary() {
    let (_home, mut swapper, fetcher) = setup(DownloadPolicy {
        allow: true,
        require_checksum: false,
    });
    let layout = swapper.layout().clone();
    fetcher.serve("https://dl.example/simd", "#!/bin/sh\necho v2\n");

    let info = r#"{"binaries": {"any": "https://dl.example/simd"}}"#;
    let plan = UpgradePlan::new("v2", 49, info);
    swapper.apply(&plan).await.unwrap();

    assert_eq!(
        fs::read_to_string(layout.upgrade_bin("v2")).unwrap(),
        "#!/bin/sh\necho v2\n"
    );
    assert_eq!(layout.current_upgrade_name().as_deref(), Some("v2"));
    let persisted: UpgradePlan =
        serde_json::from_slice(&fs::read(layout.upgrade_plan_file("v2")).unwrap()).unwrap();
    assert_eq!(persisted, plan);
}

#[tokio::test]
async fn download_failure_leaves_current_alone() {
    let (_home, mut swapper, _) = setup(DownloadPolicy {
        allow: true,
        require_checksum: true,
    });
    let layout = swapper.layout().clone();

    let info = r#"{"binaries": {"any": "https://dl.example/simd"}}"#;
    let err = swapper
        .apply(&UpgradePlan::new("v2", 49, info))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SwapError::Download {
            source: DownloadError::ChecksumMissing { .. },
            ..
        }
    ));
    assert_eq!(layout.current_bin().path, layout.genesis_bin());
}

#[tokio::test]
async fn apply_is_idempotent() {
    let (_home, mut swapper, _) = setup(DownloadPolicy::default());
    let layout = swapper.layout().clone();
    install(&layout.upgrade_bin("v2"), 0o755);

    let plan = UpgradePlan::new("v2", 49, "");
    swapper.apply(&plan).await.unwrap();
    swapper.apply(&plan).await.unwrap();
    assert_eq!(swapper.ledger().entries().len(), 1);
    assert_eq!(layout.current_upgrade_name().as_deref(), Some("v2"));
}

#[tokio::test]
async fn escapes_names_with_slashes() {
    let (_home, mut swapper, _) = setup(DownloadPolicy::default());
    let layout = swapper.layout().clone();
    install(&layout.upgrade_bin("v2/rc1"), 0o755);

    swapper
        .apply(&UpgradePlan::new("v2/rc1", 10, ""))
        .await
        .unwrap();
    assert!(layout.upgrades_dir().join("v2%2Frc1/bin/simd").is_file());
    assert_eq!(layout.current_upgrade_name().as_deref(), Some("v2/rc1"));
}

#[test]
fn genesis_has_no_current_plan() {
    let (_home, swapper, _) = setup(DownloadPolicy::default());
    assert_eq!(swapper.current_plan().unwrap(), None);
}

#[test]
fn hand_installed_upgrade_reports_height_zero() {
    let (_home, swapper, _) = setup(DownloadPolicy::default());
    let layout = swapper.layout();
    install(&layout.upgrade_bin("manual"), 0o755);
    layout.link_upgrade("manual").unwrap();

    let plan = swapper.current_plan().unwrap().unwrap();
    assert_eq!(plan, UpgradePlan::new("manual", 0, ""));
}
