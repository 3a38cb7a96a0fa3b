// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem layout of the supervisor's directory tree.
//!
//! ```text
//! $HOME/cosmovisor/genesis/bin/<daemon>
//! $HOME/cosmovisor/upgrades/<escaped-name>/bin/<daemon>
//! $HOME/cosmovisor/upgrades/<escaped-name>/upgrade-info.json
//! $HOME/cosmovisor/current -> genesis | upgrades/<escaped-name>
//! $HOME/data/upgrade-info.json
//! <backup root>/data-backup-YYYY-M-D/
//! ```
//!
//! Path helpers are pure. Only [`Layout::current_bin`], [`Layout::heal_current`]
//! and [`Layout::link_current`] touch the disk.

use chrono::{Datelike, NaiveDate};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ROOT_DIR: &str = "cosmovisor";
pub const GENESIS_DIR: &str = "genesis";
pub const UPGRADES_DIR: &str = "upgrades";
pub const CURRENT_LINK: &str = "current";
pub const BIN_DIR: &str = "bin";
pub const UPGRADE_INFO_FILE: &str = "upgrade-info.json";
pub const BATCH_FILE: &str = "upgrade-info.json.batch";
pub const DONE_FILE: &str = "done-upgrades.json";
pub const HEIGHT_FILE: &str = ".chainvisor-height";

/// Characters kept verbatim in an upgrade directory name. Mirrors URL
/// path-segment escaping, so `/` is always escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("genesis binary not found at {}", .path.display())]
    GenesisMissing { path: PathBuf },
    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

/// Escape an upgrade name into a single path segment.
///
/// Names made only of dots would otherwise resolve to `.` or `..`, so their
/// dots are escaped too.
pub fn escape_name(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c == '.') {
        return "%2E".repeat(name.len());
    }
    utf8_percent_encode(name, PATH_SEGMENT).to_string()
}

/// Inverse of [`escape_name`].
pub fn unescape_name(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// What `current` looked like when it was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentStatus {
    /// Symlink to a directory holding `bin/<daemon>`.
    Linked,
    /// No `current` entry at all.
    Missing,
    /// `current` exists but is a plain file or directory.
    NotSymlink,
    /// Symlink whose target has no `bin/<daemon>`.
    Dangling,
}

/// Resolution of the `current` pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentBin {
    /// Executable to launch: the linked binary when `Linked`, otherwise the
    /// genesis binary `current` should be healed to.
    pub path: PathBuf,
    /// Directory `current` resolves to (genesis when not linked).
    pub dir: PathBuf,
    pub status: CurrentStatus,
}

impl CurrentBin {
    pub fn needs_heal(&self) -> bool {
        self.status != CurrentStatus::Linked
    }
}

/// Paths of one supervisor installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    home: PathBuf,
    daemon: String,
    backup_root: PathBuf,
}

impl Layout {
    pub fn new(home: impl Into<PathBuf>, daemon: impl Into<String>) -> Self {
        let home = home.into();
        Self {
            backup_root: home.clone(),
            home,
            daemon: daemon.into(),
        }
    }

    /// Put data backups under `root` instead of `$HOME`.
    pub fn with_backup_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.backup_root = root.into();
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn daemon(&self) -> &str {
        &self.daemon
    }

    pub fn root(&self) -> PathBuf {
        self.home.join(ROOT_DIR)
    }

    pub fn genesis_dir(&self) -> PathBuf {
        self.root().join(GENESIS_DIR)
    }

    pub fn genesis_bin(&self) -> PathBuf {
        self.genesis_dir().join(BIN_DIR).join(&self.daemon)
    }

    pub fn upgrades_dir(&self) -> PathBuf {
        self.root().join(UPGRADES_DIR)
    }

    pub fn upgrade_dir(&self, name: &str) -> PathBuf {
        self.upgrades_dir().join(escape_name(name))
    }

    pub fn upgrade_bin(&self, name: &str) -> PathBuf {
        self.upgrade_dir(name).join(BIN_DIR).join(&self.daemon)
    }

    /// Persisted copy of the plan that produced `upgrades/<name>`.
    pub fn upgrade_plan_file(&self, name: &str) -> PathBuf {
        self.upgrade_dir(name).join(UPGRADE_INFO_FILE)
    }

    pub fn current_link(&self) -> PathBuf {
        self.root().join(CURRENT_LINK)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.home.join("data")
    }

    /// Sentinel written by the daemon when it halts for an upgrade.
    pub fn sentinel_path(&self) -> PathBuf {
        self.data_dir().join(UPGRADE_INFO_FILE)
    }

    /// Last committed height, as a decimal, maintained by the node.
    pub fn height_file(&self) -> PathBuf {
        self.data_dir().join(HEIGHT_FILE)
    }

    pub fn batch_file(&self) -> PathBuf {
        self.root().join(BATCH_FILE)
    }

    pub fn done_file(&self) -> PathBuf {
        self.root().join(DONE_FILE)
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn backup_dir(&self, day: NaiveDate) -> PathBuf {
        self.backup_root.join(format!(
            "data-backup-{}-{}-{}",
            day.year(),
            day.month(),
            day.day()
        ))
    }

    /// Resolve `current` without modifying anything.
    pub fn current_bin(&self) -> CurrentBin {
        let link = self.current_link();
        let genesis = CurrentBin {
            path: self.genesis_bin(),
            dir: self.genesis_dir(),
            status: CurrentStatus::Missing,
        };

        let meta = match std::fs::symlink_metadata(&link) {
            Ok(meta) => meta,
            Err(_) => return genesis,
        };
        if !meta.file_type().is_symlink() {
            return CurrentBin {
                status: CurrentStatus::NotSymlink,
                ..genesis
            };
        }

        let target = match std::fs::read_link(&link) {
            Ok(target) => target,
            Err(_) => {
                return CurrentBin {
                    status: CurrentStatus::Dangling,
                    ..genesis
                }
            }
        };
        // Relative targets are relative to the directory holding the link
        let dir = if target.is_absolute() {
            target
        } else {
            self.root().join(target)
        };
        let bin = dir.join(BIN_DIR).join(&self.daemon);
        if bin.is_file() {
            CurrentBin {
                path: bin,
                dir,
                status: CurrentStatus::Linked,
            }
        } else {
            CurrentBin {
                status: CurrentStatus::Dangling,
                ..genesis
            }
        }
    }

    /// Name of the upgrade `current` points at, or `None` for genesis.
    pub fn current_upgrade_name(&self) -> Option<String> {
        let current = self.current_bin();
        if current.status != CurrentStatus::Linked {
            return None;
        }
        if current.dir.parent() != Some(self.upgrades_dir().as_path()) {
            return None;
        }
        current
            .dir
            .file_name()
            .map(|segment| unescape_name(&segment.to_string_lossy()))
    }

    /// Repoint `current` at genesis unless it already resolves to a binary.
    ///
    /// A `current` left behind as a regular file is removed; a regular
    /// directory is moved aside to `current.orphaned` so nothing is lost.
    pub fn heal_current(&self) -> Result<CurrentBin, LayoutError> {
        let current = self.current_bin();
        if !current.needs_heal() {
            return Ok(current);
        }

        let genesis_bin = self.genesis_bin();
        if !genesis_bin.is_file() {
            return Err(LayoutError::GenesisMissing { path: genesis_bin });
        }

        let link = self.current_link();
        if current.status == CurrentStatus::NotSymlink && link.is_dir() {
            let aside = self.root().join(format!("{CURRENT_LINK}.orphaned"));
            tracing::warn!(
                path = %link.display(),
                moved_to = %aside.display(),
                "current is a directory, moving it aside"
            );
            if aside.exists() {
                std::fs::remove_dir_all(&aside).map_err(|source| LayoutError::Io {
                    op: "remove",
                    path: aside.clone(),
                    source,
                })?;
            }
            std::fs::rename(&link, &aside).map_err(|source| LayoutError::Io {
                op: "rename",
                path: link.clone(),
                source,
            })?;
        }

        tracing::info!(status = ?current.status, "pointing current at genesis");
        self.link_current(Path::new(GENESIS_DIR))?;
        Ok(self.current_bin())
    }

    /// Replace `current` with a symlink to `target` (relative to the root).
    ///
    /// Unlink then symlink: there is no portable atomic symlink swap, and a
    /// crash in between leaves `current` missing, which `heal_current` repairs.
    pub fn link_current(&self, target: &Path) -> Result<(), LayoutError> {
        let link = self.current_link();
        match std::fs::remove_file(&link) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(LayoutError::Io {
                    op: "remove",
                    path: link,
                    source,
                })
            }
        }
        std::os::unix::fs::symlink(target, &link).map_err(|source| LayoutError::Io {
            op: "symlink",
            path: link,
            source,
        })
    }

    /// Point `current` at `upgrades/<name>`.
    pub fn link_upgrade(&self, name: &str) -> Result<(), LayoutError> {
        self.link_current(&Path::new(UPGRADES_DIR).join(escape_name(name)))
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
