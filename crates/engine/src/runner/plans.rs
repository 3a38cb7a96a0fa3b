// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deciding which plan, if any, to apply next.

use super::Runner;
use crate::error::RunError;
use cv_adapters::Fetcher;
use cv_core::{clear_sentinel, parse_plan, read_batch, read_height, read_sentinel, UpgradePlan};

/// Result of looking for a plan on disk.
pub(super) enum Pending {
    Nothing,
    /// The sentinel named a skipped height and was cleared.
    Skipped,
    Plan(UpgradePlan),
}

enum Verdict {
    Apply,
    Ignore,
    Skip,
}

impl<F: Fetcher> Runner<F> {
    /// Check the sentinel, then the manual batch.
    pub(super) fn pending_plan(&mut self) -> Result<Pending, RunError> {
        let sentinel = self.layout.sentinel_path();
        let found = read_sentinel(&sentinel, self.config.recase()).map_err(|e| self.fail(e))?;
        if let Some(plan) = found {
            match self.verdict(&plan) {
                Verdict::Apply => return Ok(Pending::Plan(plan)),
                Verdict::Skip => {
                    self.skip_sentinel(&plan)?;
                    return Ok(Pending::Skipped);
                }
                Verdict::Ignore => {}
            }
        }
        Ok(match self.due_batch_plan() {
            Some(plan) => Pending::Plan(plan),
            None => Pending::Nothing,
        })
    }

    /// Plan carried by a watcher update. Content that does not parse is
    /// re-read from disk in case the watcher caught a partial write.
    pub(super) fn plan_from_update(&self, bytes: &[u8]) -> Result<Option<UpgradePlan>, RunError> {
        let sentinel = self.layout.sentinel_path();
        let recase = self.config.recase();
        let plan = match parse_plan(bytes, recase, &sentinel) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::debug!(error = %e, "sentinel update unreadable, re-reading");
                match read_sentinel(&sentinel, recase).map_err(|e| self.fail(e))? {
                    Some(plan) => plan,
                    None => return Ok(None),
                }
            }
        };

        match self.verdict(&plan) {
            Verdict::Apply => {
                tracing::info!(plan = %plan, "upgrade plan detected");
                Ok(Some(plan))
            }
            Verdict::Skip => {
                self.skip_sentinel(&plan)?;
                Ok(None)
            }
            Verdict::Ignore => Ok(None),
        }
    }

    /// Lowest manual batch entry whose height the node has reached.
    ///
    /// Needs the height file; without it the batch never triggers. Read
    /// errors are logged once per distinct message.
    pub(super) fn due_batch_plan(&mut self) -> Option<UpgradePlan> {
        let recase = self.config.recase();
        let loaded = read_height(&self.layout.height_file()).and_then(|height| match height {
            Some(height) => read_batch(&self.config.batch_path(), recase).map(|b| Some((height, b))),
            None => Ok(None),
        });
        let (height, batch) = match loaded {
            Ok(Some(found)) => {
                self.last_batch_error = None;
                found
            }
            Ok(None) => return None,
            Err(e) => {
                let message = e.to_string();
                if self.last_batch_error.as_deref() != Some(message.as_str()) {
                    tracing::warn!(error = %message, "cannot evaluate manual upgrade batch");
                    self.last_batch_error = Some(message);
                }
                return None;
            }
        };

        loop {
            let plan = batch
                .due_at(height, |p| self.passed_over.contains(&p.name))
                .cloned()?;
            match self.verdict(&plan) {
                Verdict::Apply => return Some(plan),
                Verdict::Skip => {
                    tracing::warn!(plan = %plan, "manual upgrade at a skipped height, not applying");
                    self.passed_over.insert(plan.name);
                }
                Verdict::Ignore => {
                    self.passed_over.insert(plan.name);
                }
            }
        }
    }

    fn verdict(&self, plan: &UpgradePlan) -> Verdict {
        if let Some(applied) = &self.applied {
            if applied.name == plan.name {
                tracing::debug!(plan = %plan, "plan already applied");
                return Verdict::Ignore;
            }
        }
        if self.swapper.is_done(&plan.name) {
            tracing::warn!(plan = %plan, "upgrade was applied before, ignoring");
            return Verdict::Ignore;
        }
        if let Some(applied) = &self.applied {
            if plan.height <= applied.height {
                tracing::warn!(
                    plan = %plan,
                    applied = %applied,
                    "plan height is not above the applied upgrade, ignoring"
                );
                return Verdict::Ignore;
            }
        }
        if self.skip_heights.contains(&plan.height) {
            return Verdict::Skip;
        }
        Verdict::Apply
    }

    fn skip_sentinel(&self, plan: &UpgradePlan) -> Result<(), RunError> {
        tracing::warn!(plan = %plan, "upgrade height is marked to skip, clearing sentinel");
        clear_sentinel(&self.layout.sentinel_path()).map_err(|e| self.fail(e))
    }
}
