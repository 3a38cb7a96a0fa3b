// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binary manifests carried in an upgrade plan's `info` field.
//!
//! ```json
//! {"binaries": {"linux/amd64": "https://host/simd?checksum=sha256:ab12…", "any": "…"}}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Platform key matching every platform.
pub const ANY_PLATFORM: &str = "any";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("upgrade info is empty")]
    Empty,
    #[error("invalid binary manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("binary manifest lists no binaries")]
    NoBinaries,
    #[error("invalid url {url:?}: {source}")]
    Url {
        url: String,
        source: url::ParseError,
    },
    #[error("url {0:?} has no checksum query parameter")]
    MissingChecksum(String),
    #[error("invalid checksum {0:?}, expected <algo>:<hex>")]
    InvalidChecksum(String),
    #[error("unsupported checksum algorithm {0:?}")]
    UnsupportedAlgo(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgo {
    Md5,
    Sha256,
    Sha512,
}

impl ChecksumAlgo {
    pub fn as_str(self) -> &'static str {
        match self {
            ChecksumAlgo::Md5 => "md5",
            ChecksumAlgo::Sha256 => "sha256",
            ChecksumAlgo::Sha512 => "sha512",
        }
    }

    /// Length of the hex-encoded digest.
    pub fn hex_len(self) -> usize {
        match self {
            ChecksumAlgo::Md5 => 32,
            ChecksumAlgo::Sha256 => 64,
            ChecksumAlgo::Sha512 => 128,
        }
    }
}

impl fmt::Display for ChecksumAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgo {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(ChecksumAlgo::Md5),
            "sha256" => Ok(ChecksumAlgo::Sha256),
            "sha512" => Ok(ChecksumAlgo::Sha512),
            _ => Err(ManifestError::UnsupportedAlgo(s.to_string())),
        }
    }
}

/// Expected digest of a downloaded artifact, written `<algo>:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algo: ChecksumAlgo,
    /// Lowercase hex digest.
    pub hex: String,
}

impl FromStr for Checksum {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algo, hex) = s
            .split_once(':')
            .ok_or_else(|| ManifestError::InvalidChecksum(s.to_string()))?;
        let algo: ChecksumAlgo = algo.parse()?;
        let hex = hex.to_ascii_lowercase();
        if hex.len() != algo.hex_len() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ManifestError::InvalidChecksum(s.to_string()));
        }
        Ok(Self { algo, hex })
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algo, self.hex)
    }
}

/// Parse an absolute artifact URL.
pub fn parse_url(raw: &str) -> Result<Url, ManifestError> {
    Url::parse(raw.trim()).map_err(|source| ManifestError::Url {
        url: raw.to_string(),
        source,
    })
}

/// The `checksum=<algo>:<hex>` query parameter of `url`, if present.
pub fn checksum_from_url(url: &Url) -> Result<Option<Checksum>, ManifestError> {
    url.query_pairs()
        .find(|(key, _)| key == "checksum")
        .map(|(_, value)| value.parse())
        .transpose()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryManifest {
    #[serde(default)]
    pub binaries: BTreeMap<String, String>,
}

impl BinaryManifest {
    pub fn parse(json: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(json)?;
        if manifest.binaries.is_empty() {
            return Err(ManifestError::NoBinaries);
        }
        Ok(manifest)
    }

    /// URL for `platform`, falling back to the `any` entry.
    pub fn url_for(&self, platform: &str) -> Option<&str> {
        self.binaries
            .get(platform)
            .or_else(|| self.binaries.get(ANY_PLATFORM))
            .map(String::as_str)
    }
}

/// Where the manifest for a plan comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Inline(BinaryManifest),
    /// The response body at this URL is the manifest.
    Remote(Url),
}

impl ManifestSource {
    /// Interpret a plan's `info`: a JSON object is an inline manifest,
    /// anything else must be a URL pointing at one.
    pub fn from_info(info: &str) -> Result<Self, ManifestError> {
        let info = info.trim();
        if info.is_empty() {
            return Err(ManifestError::Empty);
        }
        if info.starts_with('{') {
            return BinaryManifest::parse(info).map(ManifestSource::Inline);
        }
        parse_url(info).map(ManifestSource::Remote)
    }
}

/// `<os>/<arch>` of the running host using Go naming (`linux/amd64`).
pub fn current_platform() -> String {
    platform_key(std::env::consts::OS, std::env::consts::ARCH)
}

pub fn platform_key(os: &str, arch: &str) -> String {
    let os = match os {
        "macos" => "darwin",
        other => other,
    };
    let arch = match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    };
    format!("{os}/{arch}")
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
