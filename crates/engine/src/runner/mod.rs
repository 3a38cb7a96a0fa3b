// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor: runs the daemon, watches for upgrade plans and applies
//! them between daemon runs.
//!
//! ```text
//! Starting ──► Running ──► ShuttingDown ──► Upgrading ──► Starting
//!                 │  └──► Backoff ──► Starting
//!                 └──► Stopped
//! ```

mod plans;

use crate::error::{RunError, RunErrorKind};
use crate::restart::RestartBackoff;
use crate::swapper::{DownloadPolicy, Swapper};
use chrono::Local;
use cv_adapters::{
    backup_data, run_custom_preupgrade, run_daemon_preupgrade, ChildExit, Fetcher, FileWatcher,
    Process, ProcessIo,
};
use cv_core::{skip_upgrade_heights, Config, Layout, LayoutError, SupervisorState, UpgradePlan};
use nix::sys::signal::Signal;
use plans::Pending;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// How a supervisor run ended without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The daemon exited cleanly or was stopped on request.
    Stopped,
    /// An upgrade was applied and restarting after upgrades is disabled.
    UpgradedNoRestart,
}

/// What ended a daemon run.
enum ChildEvent {
    Exited(ChildExit),
    Upgrade(UpgradePlan),
    Stop(Signal),
}

pub struct Runner<F> {
    config: Config,
    layout: Layout,
    args: Vec<String>,
    skip_heights: BTreeSet<i64>,
    io: ProcessIo,
    swapper: Swapper<F>,
    backoff: RestartBackoff,
    cancel: CancellationToken,
    signals: Option<mpsc::Receiver<Signal>>,
    state: SupervisorState,
    /// Plan currently being processed.
    plan: Option<UpgradePlan>,
    /// Plan `current` points at.
    applied: Option<UpgradePlan>,
    /// Batch entries already reported as not applicable.
    passed_over: HashSet<String>,
    last_batch_error: Option<String>,
}

impl<F: Fetcher> Runner<F> {
    /// Supervisor for `config`, passing `args` to every daemon launch.
    pub fn new(config: Config, args: Vec<String>, fetcher: F) -> Result<Self, RunError> {
        let layout = config.layout();
        let policy = DownloadPolicy {
            allow: config.allow_download_binaries,
            require_checksum: config.download_must_have_checksum,
        };
        let swapper =
            Swapper::new(layout.clone(), fetcher, policy, config.recase()).map_err(|e| RunError {
                state: SupervisorState::Starting,
                plan: None,
                kind: e.into(),
            })?;
        Ok(Self {
            skip_heights: skip_upgrade_heights(&args),
            backoff: RestartBackoff::new(config.restart_delay, config.max_restart_retries),
            layout,
            args,
            io: ProcessIo::inherit(),
            swapper,
            cancel: CancellationToken::new(),
            signals: None,
            state: SupervisorState::Starting,
            plan: None,
            applied: None,
            passed_over: HashSet::new(),
            last_batch_error: None,
            config,
        })
    }

    /// Stdio handed to the daemon.
    pub fn with_io(mut self, io: ProcessIo) -> Self {
        self.io = io;
        self
    }

    /// Stop the daemon and return [`RunOutcome::Stopped`] once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Signals to forward to the daemon before stopping.
    pub fn with_signals(mut self, signals: mpsc::Receiver<Signal>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Supervise until the daemon stops for good or something fails.
    pub async fn run(mut self) -> Result<RunOutcome, RunError> {
        let data_dir = self.layout.data_dir();
        std::fs::create_dir_all(&data_dir).map_err(|source| {
            self.fail(LayoutError::Io {
                op: "create",
                path: data_dir.clone(),
                source,
            })
        })?;
        self.applied = self.swapper.current_plan().map_err(|e| self.fail(e))?;
        if let Some(applied) = &self.applied {
            tracing::info!(plan = %applied, "current upgrade");
        }

        let mut watcher = FileWatcher::start(
            &self.layout.sentinel_path(),
            self.config.watcher_mode,
            self.config.poll_interval,
        )
        .map_err(|e| self.fail(e))?;
        let mut batch_tick = tokio::time::interval(self.config.poll_interval);
        batch_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = self.supervise(&mut watcher, &mut batch_tick).await;
        watcher.shutdown().await;

        match &result {
            Ok(outcome) => {
                self.set_state(SupervisorState::Stopped);
                tracing::info!(?outcome, "supervisor finished");
            }
            Err(e) => {
                self.set_state(SupervisorState::Failed);
                tracing::error!(error = %e, "supervisor failed");
            }
        }
        result
    }

    async fn supervise(
        &mut self,
        watcher: &mut FileWatcher,
        batch_tick: &mut Interval,
    ) -> Result<RunOutcome, RunError> {
        loop {
            self.set_state(SupervisorState::Starting);
            self.plan = None;
            if self.stop_requested() {
                return Ok(RunOutcome::Stopped);
            }

            if let Pending::Plan(plan) = self.pending_plan()? {
                if let Some(outcome) = self.upgrade(plan).await? {
                    return Ok(outcome);
                }
                continue;
            }

            let current = self.layout.heal_current().map_err(|e| self.fail(e))?;
            let process =
                Process::start(&current.path, &self.args, &self.io).map_err(|e| self.fail(e))?;
            self.set_state(SupervisorState::Running);

            let event = match self.watch_child(&process, watcher, batch_tick).await {
                Ok(event) => event,
                Err(e) => {
                    process.shutdown(self.config.shutdown_grace).await;
                    return Err(e);
                }
            };

            match event {
                ChildEvent::Upgrade(plan) => {
                    self.plan = Some(plan.clone());
                    self.set_state(SupervisorState::ShuttingDown);
                    let exit = process.shutdown(self.config.shutdown_grace).await;
                    tracing::info!(%exit, plan = %plan, "daemon stopped for upgrade");
                    if let Some(outcome) = self.upgrade(plan).await? {
                        return Ok(outcome);
                    }
                }
                ChildEvent::Stop(sig) => {
                    self.set_state(SupervisorState::ShuttingDown);
                    let exit = self.stop_child(&process, sig).await;
                    tracing::info!(%exit, "daemon stopped");
                    return Ok(RunOutcome::Stopped);
                }
                ChildEvent::Exited(exit) => match self.pending_plan()? {
                    Pending::Plan(plan) => {
                        tracing::info!(%exit, plan = %plan, "daemon exited with upgrade pending");
                        if let Some(outcome) = self.upgrade(plan).await? {
                            return Ok(outcome);
                        }
                    }
                    Pending::Skipped => {
                        tracing::info!(%exit, "restarting daemon after skipped upgrade");
                    }
                    Pending::Nothing if exit.success() => {
                        tracing::info!("daemon exited cleanly");
                        return Ok(RunOutcome::Stopped);
                    }
                    Pending::Nothing => {
                        self.set_state(SupervisorState::Backoff);
                        let Some(delay) = self.backoff.next_delay(&current.path, &self.args)
                        else {
                            return Err(self.fail(RunErrorKind::RestartsExhausted {
                                attempts: self.backoff.attempts(),
                                last: exit,
                            }));
                        };
                        tracing::warn!(
                            %exit,
                            attempt = self.backoff.attempts(),
                            delay = ?delay,
                            "daemon failed, restarting"
                        );
                        if !self.sleep_or_stop(delay).await {
                            return Ok(RunOutcome::Stopped);
                        }
                    }
                },
            }
        }
    }

    /// Wait for whatever ends the current daemon run.
    async fn watch_child(
        &mut self,
        process: &Process,
        watcher: &mut FileWatcher,
        batch_tick: &mut Interval,
    ) -> Result<ChildEvent, RunError> {
        loop {
            tokio::select! {
                exit = process.done() => return Ok(ChildEvent::Exited(exit)),
                Some(bytes) = watcher.updates.recv() => {
                    if let Some(plan) = self.plan_from_update(&bytes)? {
                        return Ok(ChildEvent::Upgrade(plan));
                    }
                }
                Some(err) = watcher.errors.recv() => {
                    if err.is_fatal() {
                        return Err(self.fail(err));
                    }
                    tracing::warn!(error = %err, "sentinel watcher error");
                }
                sig = next_signal(&mut self.signals) => {
                    tracing::info!(signal = ?sig, "received signal, stopping daemon");
                    return Ok(ChildEvent::Stop(sig));
                }
                _ = self.cancel.cancelled() => {
                    tracing::info!("shutdown requested, stopping daemon");
                    return Ok(ChildEvent::Stop(Signal::SIGTERM));
                }
                _ = batch_tick.tick() => {
                    if let Some(plan) = self.due_batch_plan() {
                        tracing::info!(plan = %plan, "manual upgrade height reached");
                        return Ok(ChildEvent::Upgrade(plan));
                    }
                }
            }
        }
    }

    /// Backup, swap, then pre-upgrade hooks. `Some` ends the run.
    async fn upgrade(&mut self, plan: UpgradePlan) -> Result<Option<RunOutcome>, RunError> {
        self.plan = Some(plan.clone());
        self.set_state(SupervisorState::Upgrading);
        tracing::info!(plan = %plan, "applying upgrade");

        if self.config.unsafe_skip_backup {
            tracing::warn!("skipping data backup");
        } else {
            let dest = self.layout.backup_dir(Local::now().date_naive());
            backup_data(&self.layout.data_dir(), &dest)
                .await
                .map_err(|e| self.fail(e))?;
        }

        let bin = self.swapper.apply(&plan).await.map_err(|e| self.fail(e))?;
        self.applied = Some(plan.clone());

        if let Some(script) = &self.config.custom_preupgrade {
            run_custom_preupgrade(&self.layout.root(), script, self.layout.home(), &plan)
                .await
                .map_err(|e| self.fail(e))?;
        }
        run_daemon_preupgrade(&bin, self.layout.home(), self.config.preupgrade_max_retries)
            .await
            .map_err(|e| self.fail(e))?;

        self.backoff.reset();
        tracing::info!(plan = %plan, "upgrade complete");
        if !self.config.restart_after_upgrade {
            tracing::info!("restart after upgrade disabled, exiting");
            return Ok(Some(RunOutcome::UpgradedNoRestart));
        }
        Ok(None)
    }

    /// Forward `sig` and give the daemon the grace period before killing it.
    async fn stop_child(&self, process: &Process, sig: Signal) -> ChildExit {
        let grace = self.config.shutdown_grace;
        if sig == Signal::SIGTERM {
            return process.shutdown(grace).await;
        }
        if let Err(e) = process.signal(sig) {
            tracing::warn!(error = %e, "failed to forward signal");
        }
        match tokio::time::timeout(grace, process.done()).await {
            Ok(exit) => exit,
            Err(_) => process.shutdown(Duration::ZERO).await,
        }
    }

    /// Sleep for a restart delay. False if a stop was requested meanwhile.
    async fn sleep_or_stop(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.cancel.cancelled() => false,
            sig = next_signal(&mut self.signals) => {
                tracing::info!(signal = ?sig, "received signal during restart delay");
                false
            }
        }
    }

    fn stop_requested(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            return true;
        }
        match self.signals.as_mut().map(|rx| rx.try_recv()) {
            Some(Ok(sig)) => {
                tracing::info!(signal = ?sig, "received signal, not restarting daemon");
                true
            }
            _ => false,
        }
    }

    fn set_state(&mut self, state: SupervisorState) {
        if self.state != state {
            tracing::debug!(from = %self.state, to = %state, "supervisor state");
            self.state = state;
        }
    }

    fn fail(&self, kind: impl Into<RunErrorKind>) -> RunError {
        RunError {
            state: self.state,
            plan: self.plan.clone(),
            kind: kind.into(),
        }
    }
}

/// Next forwarded signal; pends forever without a signal source.
async fn next_signal(signals: &mut Option<mpsc::Receiver<Signal>>) -> Signal {
    if let Some(rx) = signals {
        if let Some(sig) = rx.recv().await {
            return sig;
        }
        *signals = None;
    }
    std::future::pending().await
}

#[cfg(test)]
#[path = "../runner_tests/mod.rs"]
mod tests;
