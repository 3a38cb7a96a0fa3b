// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable names and access.

pub const DAEMON_HOME: &str = "DAEMON_HOME";
pub const DAEMON_NAME: &str = "DAEMON_NAME";
pub const DAEMON_ALLOW_DOWNLOAD_BINARIES: &str = "DAEMON_ALLOW_DOWNLOAD_BINARIES";
pub const DAEMON_DOWNLOAD_MUST_HAVE_CHECKSUM: &str = "DAEMON_DOWNLOAD_MUST_HAVE_CHECKSUM";
pub const DAEMON_RESTART_AFTER_UPGRADE: &str = "DAEMON_RESTART_AFTER_UPGRADE";
pub const DAEMON_RESTART_DELAY: &str = "DAEMON_RESTART_DELAY";
pub const DAEMON_POLL_INTERVAL: &str = "DAEMON_POLL_INTERVAL";
pub const DAEMON_SHUTDOWN_GRACE: &str = "DAEMON_SHUTDOWN_GRACE";
pub const UNSAFE_SKIP_BACKUP: &str = "UNSAFE_SKIP_BACKUP";
pub const DAEMON_DATA_BACKUP_DIR: &str = "DAEMON_DATA_BACKUP_DIR";
pub const DAEMON_PREUPGRADE_MAX_RETRIES: &str = "DAEMON_PREUPGRADE_MAX_RETRIES";
pub const DAEMON_MAX_RESTART_RETRIES: &str = "DAEMON_MAX_RESTART_RETRIES";
pub const COSMOVISOR_DISABLE_LOGS: &str = "COSMOVISOR_DISABLE_LOGS";
pub const COSMOVISOR_DISABLE_RECASE: &str = "COSMOVISOR_DISABLE_RECASE";
pub const COSMOVISOR_CUSTOM_PREUPGRADE: &str = "COSMOVISOR_CUSTOM_PREUPGRADE";
pub const DAEMON_WATCHER_MODE: &str = "DAEMON_WATCHER_MODE";
pub const DAEMON_UPGRADE_BATCH_FILE: &str = "DAEMON_UPGRADE_BATCH_FILE";

/// Every variable read into [`crate::Config`], in report order.
pub const ALL: &[&str] = &[
    DAEMON_HOME,
    DAEMON_NAME,
    DAEMON_ALLOW_DOWNLOAD_BINARIES,
    DAEMON_DOWNLOAD_MUST_HAVE_CHECKSUM,
    DAEMON_RESTART_AFTER_UPGRADE,
    DAEMON_RESTART_DELAY,
    DAEMON_POLL_INTERVAL,
    DAEMON_SHUTDOWN_GRACE,
    UNSAFE_SKIP_BACKUP,
    DAEMON_DATA_BACKUP_DIR,
    DAEMON_PREUPGRADE_MAX_RETRIES,
    DAEMON_MAX_RESTART_RETRIES,
    COSMOVISOR_DISABLE_LOGS,
    COSMOVISOR_DISABLE_RECASE,
    COSMOVISOR_CUSTOM_PREUPGRADE,
    DAEMON_WATCHER_MODE,
    DAEMON_UPGRADE_BATCH_FILE,
];

/// Trimmed value of `name`; unset and blank are both `None`.
pub fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Log filter directive for the binary (`RUST_LOG`).
pub fn log_filter() -> Option<String> {
    var("RUST_LOG")
}
