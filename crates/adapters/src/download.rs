// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Download, verify and place an upgrade binary described by a plan's
//! manifest.
//!
//! Artifacts are fetched, verified and extracted in a staging directory
//! next to the upgrade directory (`upgrades/<name>.download`). Nothing is
//! moved into the upgrade directory until every step has succeeded.

use crate::archive::{self, ArchiveError, ArchiveKind};
use crate::fetch::{FetchError, Fetcher};
use cv_core::files::ensure_executable;
use cv_core::layout::BIN_DIR;
use cv_core::manifest::{checksum_from_url, parse_url};
use cv_core::{BinaryManifest, Checksum, ChecksumAlgo, ManifestError, ManifestSource};
use sha2::Digest;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

const STAGING_SUFFIX: &str = ".download";
const EXTRACT_DIR: &str = "extract";

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("no binary for platform {platform} in manifest")]
    NoArtifactForPlatform { platform: String },
    #[error("{url} has no checksum and downloads must have one")]
    ChecksumMissing { url: Url },
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: Url,
        expected: Checksum,
        actual: String,
    },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to extract {url}: {source}")]
    Archive { url: Url, source: ArchiveError },
    #[error("archive from {url} contains neither bin/{daemon} nor {daemon}")]
    ArchiveMissingBinary { url: Url, daemon: String },
    #[error("download i/o error at {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("download task failed: {0}")]
    Task(String),
}

impl DownloadError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| DownloadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Everything needed to materialise `<upgrade_dir>/bin/<daemon>` from a
/// plan's `info` field.
#[derive(Debug, Clone)]
pub struct DownloadRequest<'a> {
    pub info: &'a str,
    pub upgrade_dir: &'a Path,
    pub daemon: &'a str,
    /// `<os>/<arch>` key to select from the manifest.
    pub platform: &'a str,
    pub require_checksum: bool,
}

/// Resolve the manifest, fetch the artifact for `platform`, verify it and
/// place the executable. Returns the path of the placed binary.
pub async fn download_binary<F: Fetcher>(
    fetcher: &F,
    req: &DownloadRequest<'_>,
) -> Result<PathBuf, DownloadError> {
    let staging = staging_dir(req.upgrade_dir);
    reset_dir(&staging)?;
    let result = download_staged(fetcher, req, &staging).await;
    if let Err(e) = fs::remove_dir_all(&staging) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %staging.display(), error = %e, "failed to clean staging dir");
        }
    }
    result
}

async fn download_staged<F: Fetcher>(
    fetcher: &F,
    req: &DownloadRequest<'_>,
    staging: &Path,
) -> Result<PathBuf, DownloadError> {
    let manifest = match ManifestSource::from_info(req.info)? {
        ManifestSource::Inline(manifest) => manifest,
        ManifestSource::Remote(url) => {
            tracing::info!(%url, "fetching binary manifest");
            let path = staging.join("manifest.json");
            fetch_verified(fetcher, &url, &path, req.require_checksum).await?;
            let body = fs::read_to_string(&path).map_err(DownloadError::io(&path))?;
            BinaryManifest::parse(&body)?
        }
    };

    let raw = manifest
        .url_for(req.platform)
        .ok_or_else(|| DownloadError::NoArtifactForPlatform {
            platform: req.platform.to_string(),
        })?;
    let url = parse_url(raw)?;
    tracing::info!(%url, platform = req.platform, "downloading upgrade binary");

    let artifact = staging.join(artifact_name(&url));
    fetch_verified(fetcher, &url, &artifact, req.require_checksum).await?;

    let archive_kind = ArchiveKind::from_name(url.path());
    let extracted = staging.join(EXTRACT_DIR);
    let staged_bin = match archive_kind {
        Some(kind) => {
            let (src, dest) = (artifact.clone(), extracted.clone());
            tokio::task::spawn_blocking(move || archive::extract(kind, &src, &dest))
                .await
                .map_err(|e| DownloadError::Task(e.to_string()))?
                .map_err(|source| DownloadError::Archive {
                    url: url.clone(),
                    source,
                })?;
            let nested = extracted.join(BIN_DIR).join(req.daemon);
            if !nested.is_file() {
                let top = extracted.join(req.daemon);
                if !top.is_file() {
                    return Err(DownloadError::ArchiveMissingBinary {
                        url,
                        daemon: req.daemon.to_string(),
                    });
                }
                let nested_dir = extracted.join(BIN_DIR);
                fs::create_dir_all(&nested_dir).map_err(DownloadError::io(&nested_dir))?;
                fs::rename(&top, &nested).map_err(DownloadError::io(&nested))?;
            }
            nested
        }
        None => artifact,
    };
    ensure_executable(&staged_bin).map_err(DownloadError::io(&staged_bin))?;

    let bin_dir = req.upgrade_dir.join(BIN_DIR);
    let bin = bin_dir.join(req.daemon);
    if archive_kind.is_some() {
        install_tree(&extracted, req.upgrade_dir)?;
    } else {
        fs::create_dir_all(&bin_dir).map_err(DownloadError::io(&bin_dir))?;
        fs::rename(&staged_bin, &bin).map_err(DownloadError::io(&bin))?;
    }
    tracing::info!(bin = %bin.display(), "upgrade binary in place");
    Ok(bin)
}

/// Move every top-level entry of `src` into `dest`, replacing what is there.
/// `bin/` goes last so the binary only appears once the rest is in place.
fn install_tree(src: &Path, dest: &Path) -> Result<(), DownloadError> {
    fs::create_dir_all(dest).map_err(DownloadError::io(dest))?;
    let mut names = Vec::new();
    for entry in fs::read_dir(src).map_err(DownloadError::io(src))? {
        names.push(entry.map_err(DownloadError::io(src))?.file_name());
    }
    names.sort_by_key(|name| name == BIN_DIR);

    for name in names {
        let (from, to) = (src.join(&name), dest.join(&name));
        remove_any(&to)?;
        fs::rename(&from, &to).map_err(DownloadError::io(&to))?;
    }
    Ok(())
}

fn remove_any(path: &Path) -> Result<(), DownloadError> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(DownloadError::io(path))
}

/// Fetch `url` to `dest` and check it against the URL's `checksum` query
/// parameter.
async fn fetch_verified<F: Fetcher>(
    fetcher: &F,
    url: &Url,
    dest: &Path,
    require_checksum: bool,
) -> Result<(), DownloadError> {
    let expected = checksum_from_url(url)?;
    if expected.is_none() && require_checksum {
        return Err(DownloadError::ChecksumMissing { url: url.clone() });
    }
    fetcher.fetch(url, dest).await?;

    let Some(expected) = expected else {
        tracing::warn!(%url, "no checksum given, skipping verification");
        return Ok(());
    };
    let path = dest.to_path_buf();
    let algo = expected.algo;
    let actual = tokio::task::spawn_blocking(move || digest_file(algo, &path))
        .await
        .map_err(|e| DownloadError::Task(e.to_string()))?
        .map_err(DownloadError::io(dest))?;
    if actual != expected.hex {
        return Err(DownloadError::ChecksumMismatch {
            url: url.clone(),
            expected,
            actual,
        });
    }
    tracing::debug!(%url, checksum = %expected, "checksum verified");
    Ok(())
}

/// Lowercase hex digest of the file at `path`.
pub fn digest_file(algo: ChecksumAlgo, path: &Path) -> io::Result<String> {
    match algo {
        ChecksumAlgo::Md5 => digest_with::<md5::Md5>(path),
        ChecksumAlgo::Sha256 => digest_with::<sha2::Sha256>(path),
        ChecksumAlgo::Sha512 => digest_with::<sha2::Sha512>(path),
    }
}

fn digest_with<D: Digest + io::Write>(path: &Path) -> io::Result<String> {
    let mut hasher = D::new();
    io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn staging_dir(upgrade_dir: &Path) -> PathBuf {
    let mut name = upgrade_dir.as_os_str().to_owned();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

fn reset_dir(dir: &Path) -> Result<(), DownloadError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(DownloadError::io(dir)(e)),
    }
    fs::create_dir_all(dir).map_err(DownloadError::io(dir))
}

/// Last path segment of `url`, which keeps the extension used to detect
/// archives.
fn artifact_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or("artifact")
        .to_string()
}

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;
