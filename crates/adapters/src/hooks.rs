// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-upgrade hooks run between the swap and the relaunch.

use crate::process::ChildExit;
use cv_core::files::ensure_executable;
use cv_core::UpgradePlan;
use std::path::{Path, PathBuf};
use std::process::Output;
use thiserror::Error;
use tokio::process::Command;

/// Daemon `pre-upgrade` exit code: not implemented, carry on.
pub const PREUPGRADE_UNSUPPORTED: i32 = 1;
/// Daemon `pre-upgrade` exit code: abort the upgrade.
pub const PREUPGRADE_FATAL: i32 = 30;
/// Daemon `pre-upgrade` exit code: try again.
pub const PREUPGRADE_RETRY: i32 = 31;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("custom pre-upgrade script {} not found", .0.display())]
    ScriptNotFound(PathBuf),
    #[error("failed to run {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("custom pre-upgrade script {} failed with {exit}", .path.display())]
    ScriptFailed { path: PathBuf, exit: ChildExit },
    #[error("pre-upgrade command reported a fatal error (exit code 30)")]
    PreUpgradeFatal,
    #[error("pre-upgrade command still failing after {attempts} attempts")]
    PreUpgradeRetriesExhausted { attempts: u32 },
    #[error("pre-upgrade command failed with {0}")]
    PreUpgradeFailed(ChildExit),
}

/// Result of the daemon's `pre-upgrade` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreUpgradeOutcome {
    Completed,
    /// The daemon does not implement `pre-upgrade`.
    Unsupported,
}

/// Run `<root>/<script> <name> <height>` with `home` as working directory.
///
/// A script without the owner execute bit gets it added.
pub async fn run_custom_preupgrade(
    root: &Path,
    script: &str,
    home: &Path,
    plan: &UpgradePlan,
) -> Result<(), HookError> {
    let path = root.join(script);
    if !path.is_file() {
        return Err(HookError::ScriptNotFound(path));
    }
    match ensure_executable(&path) {
        Ok(true) => tracing::info!(script = %path.display(), "made pre-upgrade script executable"),
        Ok(false) => {}
        Err(source) => return Err(HookError::Spawn { path, source }),
    }

    tracing::info!(script = %path.display(), plan = %plan, "running custom pre-upgrade script");
    let mut cmd = Command::new(&path);
    cmd.arg(&plan.name)
        .arg(plan.height.to_string())
        .current_dir(home);
    let output = run(&mut cmd, &path).await?;
    let exit = ChildExit::from(output.status);
    if !exit.success() {
        return Err(HookError::ScriptFailed { path, exit });
    }
    Ok(())
}

/// Run `<bin> pre-upgrade`, retrying on exit code 31 up to `max_retries`
/// extra times.
pub async fn run_daemon_preupgrade(
    bin: &Path,
    home: &Path,
    max_retries: u32,
) -> Result<PreUpgradeOutcome, HookError> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if attempt > 1 {
            tracing::info!(attempt, "retrying pre-upgrade command");
        } else {
            tracing::info!(bin = %bin.display(), "running pre-upgrade command");
        }

        let mut cmd = Command::new(bin);
        cmd.arg("pre-upgrade").current_dir(home);
        let output = run(&mut cmd, bin).await?;
        match ChildExit::from(output.status) {
            ChildExit::Code(0) => return Ok(PreUpgradeOutcome::Completed),
            ChildExit::Code(PREUPGRADE_UNSUPPORTED) => {
                tracing::info!("pre-upgrade command not supported by daemon, continuing");
                return Ok(PreUpgradeOutcome::Unsupported);
            }
            ChildExit::Code(PREUPGRADE_FATAL) => return Err(HookError::PreUpgradeFatal),
            ChildExit::Code(PREUPGRADE_RETRY) => {
                if attempt > max_retries {
                    return Err(HookError::PreUpgradeRetriesExhausted { attempts: attempt });
                }
                tracing::warn!(attempt, max_retries, "pre-upgrade command asked for a retry");
            }
            other => return Err(HookError::PreUpgradeFailed(other)),
        }
    }
}

async fn run(cmd: &mut Command, path: &Path) -> Result<Output, HookError> {
    let output = cmd.output().await.map_err(|source| HookError::Spawn {
        path: path.to_path_buf(),
        source,
    })?;
    log_output(path, &output);
    Ok(output)
}

fn log_output(path: &Path, output: &Output) {
    for (stream, bytes) in [("stdout", &output.stdout), ("stderr", &output.stderr)] {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim();
        if !text.is_empty() {
            tracing::info!(hook = %path.display(), stream, "{text}");
        }
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
