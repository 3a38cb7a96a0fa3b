// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake fetcher for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{FetchError, Fetcher};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use url::Url;

#[derive(Default)]
struct FakeFetcherState {
    responses: HashMap<String, Vec<u8>>,
    calls: Vec<String>,
}

/// Serves canned bodies keyed by URL; anything else is a 404
#[derive(Clone, Default)]
pub struct FakeFetcher {
    inner: Arc<Mutex<FakeFetcherState>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`
    pub fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.inner
            .lock()
            .responses
            .insert(url.to_string(), body.into());
    }

    /// URLs requested so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<(), FetchError> {
        let body = {
            let mut state = self.inner.lock();
            state.calls.push(url.to_string());
            state.responses.get(url.as_str()).cloned()
        };
        let Some(body) = body else {
            return Err(FetchError::Status {
                url: url.clone(),
                status: 404,
            });
        };
        tokio::fs::write(dest, body)
            .await
            .map_err(|source| FetchError::Io {
                path: dest.to_path_buf(),
                source,
            })
    }
}
