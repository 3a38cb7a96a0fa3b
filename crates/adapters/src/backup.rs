// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup of the daemon's data directory before an upgrade.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("data directory {} does not exist", .0.display())]
    SourceMissing(PathBuf),
    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("backup task failed: {0}")]
    Task(String),
}

/// What a completed backup copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupReport {
    pub files: u64,
    pub bytes: u64,
}

/// Recursively copy `src` into `dest`. Symlinks are recreated rather than
/// followed; existing files in `dest` are overwritten.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<BackupReport, BackupError> {
    if !src.is_dir() {
        return Err(BackupError::SourceMissing(src.to_path_buf()));
    }

    let mut report = BackupReport::default();
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|source| BackupError::Walk {
            path: src.to_path_buf(),
            source,
        })?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(rel);
        let copy_err = |source| BackupError::Copy {
            from: entry.path().to_path_buf(),
            to: target.clone(),
            source,
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(copy_err)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path()).map_err(copy_err)?;
            let _ = fs::remove_file(&target);
            std::os::unix::fs::symlink(&link, &target).map_err(copy_err)?;
        } else {
            report.bytes += fs::copy(entry.path(), &target).map_err(copy_err)?;
            report.files += 1;
        }
    }
    Ok(report)
}

/// Back up `data_dir` to `dest` on a blocking thread.
///
/// The copy runs to completion even if the caller stops awaiting.
pub async fn backup_data(data_dir: &Path, dest: &Path) -> Result<BackupReport, BackupError> {
    tracing::info!(
        from = %data_dir.display(),
        to = %dest.display(),
        "backing up data directory, this may take a while"
    );
    let started = Instant::now();
    let (src, dst) = (data_dir.to_path_buf(), dest.to_path_buf());
    let report = tokio::task::spawn_blocking(move || copy_tree(&src, &dst))
        .await
        .map_err(|e| BackupError::Task(e.to_string()))??;
    tracing::info!(
        files = report.files,
        bytes = report.bytes,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "data backup complete"
    );
    Ok(report)
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
