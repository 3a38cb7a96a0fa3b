// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervised daemon as a child process.
//!
//! A reaper task owns the OS child and publishes its exit status on a
//! `watch` channel, so any number of callers can wait for it while others
//! send signals by pid.

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fmt;
use std::fs::File;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::{watch, Mutex};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {}: {source}", .bin.display())]
    Spawn {
        bin: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to prepare child stdio: {0}")]
    Stdio(#[source] std::io::Error),
    #[error("failed to send {signal} to pid {pid}: {source}")]
    Signal {
        pid: u32,
        signal: Signal,
        source: Errno,
    },
}

/// How the child exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Code(i32),
    /// Terminated by this signal number.
    Signal(i32),
    /// The reaper went away without observing an exit.
    Unknown,
}

impl ChildExit {
    pub fn success(self) -> bool {
        self == ChildExit::Code(0)
    }
}

impl From<ExitStatus> for ChildExit {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => ChildExit::Code(code),
            (None, Some(sig)) => ChildExit::Signal(sig),
            (None, None) => ChildExit::Unknown,
        }
    }
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildExit::Code(code) => write!(f, "exit code {code}"),
            ChildExit::Signal(sig) => match Signal::try_from(*sig) {
                Ok(signal) => write!(f, "killed by {signal}"),
                Err(_) => write!(f, "killed by signal {sig}"),
            },
            ChildExit::Unknown => f.write_str("unknown exit"),
        }
    }
}

/// Source for one of the child's standard streams.
#[derive(Debug, Clone, Default)]
pub enum StdioSpec {
    #[default]
    Inherit,
    Null,
    /// Shared handle, duplicated for every spawn.
    File(Arc<File>),
}

impl StdioSpec {
    fn to_stdio(&self) -> std::io::Result<Stdio> {
        Ok(match self {
            StdioSpec::Inherit => Stdio::inherit(),
            StdioSpec::Null => Stdio::null(),
            StdioSpec::File(file) => Stdio::from(file.try_clone()?),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessIo {
    pub stdin: StdioSpec,
    pub stdout: StdioSpec,
    pub stderr: StdioSpec,
}

impl ProcessIo {
    /// Everything inherited from the supervisor.
    pub fn inherit() -> Self {
        Self::default()
    }
}

pub struct Process {
    bin: PathBuf,
    pid: Option<u32>,
    exit: watch::Receiver<Option<ChildExit>>,
    stopping: Mutex<()>,
}

impl Process {
    /// Spawn `bin` with `args`. Fails only if the program cannot be started.
    pub fn start(bin: &Path, args: &[String], io: &ProcessIo) -> Result<Self, ProcessError> {
        let mut cmd = Command::new(bin);
        cmd.args(args)
            .stdin(io.stdin.to_stdio().map_err(ProcessError::Stdio)?)
            .stdout(io.stdout.to_stdio().map_err(ProcessError::Stdio)?)
            .stderr(io.stderr.to_stdio().map_err(ProcessError::Stdio)?)
            .kill_on_drop(true);

        let mut child = spawn_retrying(&mut cmd).map_err(|source| ProcessError::Spawn {
            bin: bin.to_path_buf(),
            source,
        })?;
        let pid = child.id();
        tracing::info!(bin = %bin.display(), pid, "started daemon");

        let (tx, exit) = watch::channel(None);
        tokio::spawn(async move {
            let status = match child.wait().await {
                Ok(status) => ChildExit::from(status),
                Err(e) => {
                    tracing::warn!(error = %e, pid, "failed to wait for daemon");
                    ChildExit::Unknown
                }
            };
            let _ = tx.send(Some(status));
        });

        Ok(Self {
            bin: bin.to_path_buf(),
            pid,
            exit,
            stopping: Mutex::new(()),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    /// Exit status if the child has already exited.
    pub fn try_exit(&self) -> Option<ChildExit> {
        *self.exit.borrow()
    }

    /// Resolves once the child has exited. Safe to await from many places.
    pub async fn done(&self) -> ChildExit {
        let mut rx = self.exit.clone();
        let exit = match rx.wait_for(Option::is_some).await {
            Ok(exit) => *exit,
            // Reaper dropped without publishing
            Err(_) => None,
        };
        exit.unwrap_or(ChildExit::Unknown)
    }

    /// Deliver `sig` to the child. A child that already exited is not an
    /// error.
    pub fn signal(&self, sig: Signal) -> Result<(), ProcessError> {
        let Some(pid) = self.pid else {
            return Ok(());
        };
        if self.try_exit().is_some() {
            return Ok(());
        }
        match signal::kill(Pid::from_raw(pid as i32), sig) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(source) => Err(ProcessError::Signal {
                pid,
                signal: sig,
                source,
            }),
        }
    }

    /// SIGTERM, wait up to `grace`, then SIGKILL and wait.
    ///
    /// A no-op once the child has exited. Concurrent callers serialize; all
    /// of them return the same exit status.
    pub async fn shutdown(&self, grace: Duration) -> ChildExit {
        let _guard = self.stopping.lock().await;
        if let Some(exit) = self.try_exit() {
            return exit;
        }

        tracing::info!(pid = self.pid, grace = ?grace, "stopping daemon");
        if let Err(e) = self.signal(Signal::SIGTERM) {
            tracing::warn!(error = %e, "failed to send SIGTERM");
        }
        if !grace.is_zero() {
            if let Ok(exit) = tokio::time::timeout(grace, self.done()).await {
                return exit;
            }
            tracing::warn!(pid = self.pid, "daemon did not stop within grace period, killing");
        }
        if let Err(e) = self.signal(Signal::SIGKILL) {
            tracing::warn!(error = %e, "failed to send SIGKILL");
        }
        self.done().await
    }
}

/// Spawn, retrying briefly on ETXTBSY: a binary written moments ago can
/// still be held open for writing by a concurrently forked process.
///
/// The retry sleeps on the calling thread, blocking it for at most 40ms.
/// `block_in_place` is not an option here since it panics on the
/// current-thread runtime.
fn spawn_retrying(cmd: &mut Command) -> std::io::Result<tokio::process::Child> {
    const ATTEMPTS: u32 = 5;
    let mut attempt = 1;
    loop {
        match cmd.spawn() {
            Err(e) if e.raw_os_error() == Some(Errno::ETXTBSY as i32) && attempt < ATTEMPTS => {
                attempt += 1;
                std::thread::sleep(Duration::from_millis(10));
            }
            other => return other,
        }
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("bin", &self.bin)
            .field("pid", &self.pid)
            .field("exit", &self.try_exit())
            .finish()
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
