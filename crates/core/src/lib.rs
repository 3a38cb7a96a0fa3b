// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cv-core: data model, layout and configuration for the chainvisor supervisor

pub mod args;
pub mod config;
pub mod env;
pub mod files;
pub mod layout;
pub mod manifest;
pub mod plan;
pub mod sentinel;
pub mod state;

pub use args::skip_upgrade_heights;
pub use config::{Config, ConfigError, WatchMode};
pub use layout::{CurrentBin, CurrentStatus, Layout, LayoutError};
pub use manifest::{BinaryManifest, Checksum, ChecksumAlgo, ManifestError, ManifestSource};
pub use plan::{ManualUpgradeBatch, PlanError, UpgradePlan};
pub use sentinel::{clear_sentinel, parse_plan, read_batch, read_height, read_sentinel, write_plan_atomic};
pub use state::SupervisorState;
