// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O

pub mod archive;
pub mod backup;
pub mod download;
pub mod fetch;
pub mod hooks;
pub mod process;
pub mod watcher;

pub use archive::{ArchiveError, ArchiveKind};
pub use backup::{backup_data, BackupError, BackupReport};
pub use download::{download_binary, DownloadError, DownloadRequest};
pub use fetch::{DefaultFetcher, FetchError, Fetcher};
pub use hooks::{run_custom_preupgrade, run_daemon_preupgrade, HookError, PreUpgradeOutcome};
pub use process::{ChildExit, Process, ProcessError, ProcessIo, StdioSpec};
pub use watcher::{FileWatcher, WatchError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fetch::FakeFetcher;
