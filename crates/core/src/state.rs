// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor lifecycle states.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    /// Resolving `current` and launching the daemon.
    Starting,
    /// Daemon running, watching for upgrade plans.
    Running,
    /// Stopping the daemon, for an upgrade or for good.
    ShuttingDown,
    /// Backup, swap and pre-upgrade hooks in progress.
    Upgrading,
    /// Waiting before a restart after a crash.
    Backoff,
    Failed,
    Stopped,
}

impl SupervisorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SupervisorState::Failed | SupervisorState::Stopped)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::ShuttingDown => "shutting_down",
            SupervisorState::Upgrading => "upgrading",
            SupervisorState::Backoff => "backoff",
            SupervisorState::Failed => "failed",
            SupervisorState::Stopped => "stopped",
        })
    }
}
