// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor logging. Everything goes to stderr so the daemon keeps
//! stdout to itself.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info";

pub fn init() {
    tracing_subscriber::registry()
        .with(filter(cv_core::env::log_filter().as_deref()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// `RUST_LOG` directives, falling back to `info` when unset or invalid.
fn filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
