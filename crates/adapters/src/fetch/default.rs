// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `file://` and `http(s)://` fetcher

use super::{FetchError, Fetcher};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use url::Url;

#[derive(Clone, Default)]
pub struct DefaultFetcher {
    client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_file(&self, url: &Url, dest: &Path) -> Result<(), FetchError> {
        let src = url
            .to_file_path()
            .map_err(|()| FetchError::BadFileUrl { url: url.clone() })?;
        tokio::fs::copy(&src, dest)
            .await
            .map(|_| ())
            .map_err(|source| FetchError::Io {
                path: src,
                source,
            })
    }

    async fn fetch_http(&self, url: &Url, dest: &Path) -> Result<(), FetchError> {
        let http_err = |source| FetchError::Http {
            url: url.clone(),
            source,
        };
        let io_err = |source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        };

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(http_err)? {
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        tracing::debug!(%url, bytes = written, "downloaded");
        Ok(())
    }
}

#[async_trait]
impl Fetcher for DefaultFetcher {
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<(), FetchError> {
        match url.scheme() {
            "file" => self.fetch_file(url, dest).await,
            "http" | "https" => self.fetch_http(url, dest).await,
            scheme => Err(FetchError::UnsupportedScheme {
                scheme: scheme.to_string(),
                url: url.clone(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "default_tests.rs"]
mod tests;
