// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archive extraction for downloaded upgrade artifacts.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    Tar,
}

impl ArchiveKind {
    /// Archive kind implied by a file name or URL path, if any.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else {
            None
        }
    }
}

/// Unpack `archive` into `dest`, creating `dest` if needed. Entries that
/// would escape `dest` are skipped by the underlying readers.
pub fn extract(kind: ArchiveKind, archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    std::fs::create_dir_all(dest)?;
    let file = BufReader::new(File::open(archive)?);
    match kind {
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(file)?;
            zip.extract(dest)?;
        }
        ArchiveKind::TarGz => unpack_tar(tar::Archive::new(GzDecoder::new(file)), dest)?,
        ArchiveKind::Tar => unpack_tar(tar::Archive::new(file), dest)?,
    }
    tracing::debug!(archive = %archive.display(), dest = %dest.display(), ?kind, "extracted");
    Ok(())
}

fn unpack_tar<R: std::io::Read>(mut archive: tar::Archive<R>, dest: &Path) -> std::io::Result<()> {
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);
    archive.unpack(dest)
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
