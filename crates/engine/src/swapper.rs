// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binary swap: make `upgrades/<name>/bin/<daemon>` available and point
//! `current` at it.

use crate::ledger::{DoneLedger, LedgerError};
use cv_adapters::download::{download_binary, DownloadError, DownloadRequest};
use cv_adapters::Fetcher;
use cv_core::files::{ensure_executable, is_regular_file};
use cv_core::manifest::current_platform;
use cv_core::{read_sentinel, write_plan_atomic, Layout, LayoutError, PlanError, UpgradePlan};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error(
        "binary for upgrade {name} not found at {} and downloads are disabled",
        .path.display()
    )]
    BinaryMissing { name: String, path: PathBuf },
    #[error("failed to download binary for upgrade {name}: {source}")]
    Download {
        name: String,
        source: DownloadError,
    },
    #[error("failed to prepare {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to persist upgrade plan: {0}")]
    PersistPlan(#[from] PlanError),
    #[error("failed to point current at upgrade {name}: {source}")]
    SwapFailed { name: String, source: LayoutError },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Download policy for missing upgrade binaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadPolicy {
    pub allow: bool,
    pub require_checksum: bool,
}

pub struct Swapper<F> {
    layout: Layout,
    fetcher: F,
    policy: DownloadPolicy,
    recase: bool,
    ledger: DoneLedger,
}

impl<F: Fetcher> Swapper<F> {
    pub fn new(
        layout: Layout,
        fetcher: F,
        policy: DownloadPolicy,
        recase: bool,
    ) -> Result<Self, SwapError> {
        let ledger = DoneLedger::load(&layout.done_file())?;
        Ok(Self {
            layout,
            fetcher,
            policy,
            recase,
            ledger,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Whether `name` has already been applied.
    pub fn is_done(&self, name: &str) -> bool {
        self.ledger.contains(name)
    }

    pub fn ledger(&self) -> &DoneLedger {
        &self.ledger
    }

    /// Plan persisted alongside the upgrade `current` points at, or `None`
    /// when running genesis.
    ///
    /// An upgrade directory installed by hand has no persisted plan; it is
    /// reported with height 0.
    pub fn current_plan(&self) -> Result<Option<UpgradePlan>, PlanError> {
        let Some(name) = self.layout.current_upgrade_name() else {
            return Ok(None);
        };
        let plan = read_sentinel(&self.layout.upgrade_plan_file(&name), self.recase)?;
        Ok(Some(plan.unwrap_or_else(|| UpgradePlan::new(name, 0, ""))))
    }

    /// Install the binary for `plan`, persist the plan, repoint `current`
    /// and record the plan as done. Returns the new binary's path.
    ///
    /// Safe to call again after a partial failure.
    pub async fn apply(&mut self, plan: &UpgradePlan) -> Result<PathBuf, SwapError> {
        let target = self.layout.upgrade_bin(&plan.name);
        if is_regular_file(&target) {
            if ensure_executable(&target).map_err(|source| SwapError::Io {
                path: target.clone(),
                source,
            })? {
                tracing::info!(bin = %target.display(), "made upgrade binary executable");
            }
        } else if !self.policy.allow {
            return Err(SwapError::BinaryMissing {
                name: plan.name.clone(),
                path: target,
            });
        } else {
            let upgrade_dir = self.layout.upgrade_dir(&plan.name);
            let platform = current_platform();
            let request = DownloadRequest {
                info: &plan.info,
                upgrade_dir: &upgrade_dir,
                daemon: self.layout.daemon(),
                platform: &platform,
                require_checksum: self.policy.require_checksum,
            };
            download_binary(&self.fetcher, &request)
                .await
                .map_err(|source| SwapError::Download {
                    name: plan.name.clone(),
                    source,
                })?;
        }

        let upgrade_dir = self.layout.upgrade_dir(&plan.name);
        fs::create_dir_all(&upgrade_dir).map_err(|source| SwapError::Io {
            path: upgrade_dir.clone(),
            source,
        })?;
        write_plan_atomic(&self.layout.upgrade_plan_file(&plan.name), plan)?;

        self.layout
            .link_upgrade(&plan.name)
            .map_err(|source| SwapError::SwapFailed {
                name: plan.name.clone(),
                source,
            })?;
        self.ledger.record(plan)?;

        tracing::info!(plan = %plan, bin = %target.display(), "current now points at upgrade");
        Ok(target)
    }
}

#[cfg(test)]
#[path = "swapper_tests.rs"]
mod tests;
