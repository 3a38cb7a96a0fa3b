// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the supervisor

use crate::swapper::SwapError;
use cv_adapters::{BackupError, ChildExit, HookError, ProcessError, WatchError};
use cv_core::{LayoutError, PlanError, SupervisorState, UpgradePlan};
use std::fmt;
use thiserror::Error;

/// Exit code used when the daemon's `pre-upgrade` command aborts the upgrade.
pub const EXIT_PREUPGRADE_FATAL: i32 = 30;

/// Why the supervisor ended up in `Failed`.
#[derive(Debug, Error)]
pub enum RunErrorKind {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("data backup failed: {0}")]
    Backup(#[from] BackupError),
    #[error(transparent)]
    Swap(#[from] SwapError),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error("daemon kept failing, giving up after {attempts} restarts (last: {last})")]
    RestartsExhausted { attempts: u32, last: ChildExit },
}

/// Terminal failure of a supervisor run.
#[derive(Debug, Error)]
pub struct RunError {
    /// State the supervisor was in when it failed.
    pub state: SupervisorState,
    /// Plan being processed, if any.
    pub plan: Option<UpgradePlan>,
    #[source]
    pub kind: RunErrorKind,
}

impl RunError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            RunErrorKind::Hook(HookError::PreUpgradeFatal) => EXIT_PREUPGRADE_FATAL,
            _ => 1,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (while {}", self.kind, self.state)?;
        if let Some(plan) = &self.plan {
            write!(f, ", upgrade {plan}")?;
        }
        f.write_str(")")
    }
}
