// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small filesystem helpers shared by the plan writers and the swapper.

use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// `<path>.tmp`, keeping the original extension.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Serialize `value` to `path` atomically (write to .tmp, then rename).
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = tmp_path(path);
    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }

    fs::rename(&tmp, path)
}

/// Add execute bits matching the read bits. Returns whether the mode changed.
pub fn ensure_executable(path: &Path) -> io::Result<bool> {
    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    let wanted = mode | ((mode & 0o444) >> 2) | 0o100;
    if wanted == mode {
        return Ok(false);
    }
    perms.set_mode(wanted);
    fs::set_permissions(path, perms)?;
    Ok(true)
}

/// Regular file (following symlinks).
pub fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
#[path = "files_tests.rs"]
mod tests;
