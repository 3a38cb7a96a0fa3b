// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact fetchers

mod default;

pub use default::DefaultFetcher;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeFetcher;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Errors from fetch operations
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported url scheme {scheme:?} in {url}")]
    UnsupportedScheme { scheme: String, url: Url },
    #[error("{url} is not a valid file url")]
    BadFileUrl { url: Url },
    #[error("request to {url} failed: {source}")]
    Http { url: Url, source: reqwest::Error },
    #[error("{url} returned status {status}")]
    Status { url: Url, status: u16 },
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Retrieves the bytes behind a URL into a local file
#[async_trait]
pub trait Fetcher: Clone + Send + Sync + 'static {
    /// Fetch `url` and write its content to `dest`, replacing any existing
    /// file.
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<(), FetchError>;
}
