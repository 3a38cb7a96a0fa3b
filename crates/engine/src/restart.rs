// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restart delays for a daemon that keeps crashing.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest delay as a multiple of the base delay.
const MAX_MULTIPLE: u32 = 32;

#[derive(Debug)]
pub struct RestartBackoff {
    policy: ExponentialBackoff,
    /// Zero means unlimited.
    max_retries: u32,
    attempts: u32,
    command: Option<(PathBuf, Vec<String>)>,
}

impl RestartBackoff {
    pub fn new(base: Duration, max_retries: u32) -> Self {
        let policy = ExponentialBackoff {
            initial_interval: base,
            current_interval: base,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: base.saturating_mul(MAX_MULTIPLE),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        Self {
            policy,
            max_retries,
            attempts: 0,
            command: None,
        }
    }

    /// Delay before restarting `bin args`, or `None` once the retry budget
    /// is spent. A different command than last time starts from scratch.
    pub fn next_delay(&mut self, bin: &Path, args: &[String]) -> Option<Duration> {
        let same = self
            .command
            .as_ref()
            .is_some_and(|(b, a)| b == bin && a.as_slice() == args);
        if !same {
            self.reset();
            self.command = Some((bin.to_path_buf(), args.to_vec()));
        }

        if self.max_retries != 0 && self.attempts >= self.max_retries {
            return None;
        }
        self.attempts += 1;
        Some(
            self.policy
                .next_backoff()
                .unwrap_or(self.policy.max_interval),
        )
    }

    pub fn reset(&mut self) {
        self.policy.reset();
        self.attempts = 0;
        self.command = None;
    }

    /// Restarts handed out since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
#[path = "restart_tests.rs"]
mod tests;
