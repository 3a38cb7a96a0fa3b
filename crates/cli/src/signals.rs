// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forward termination signals received by the supervisor to the runner.

use nix::sys::signal::Signal;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Relay SIGTERM, SIGQUIT and SIGINT into `tx` until `cancel` fires or the
/// runner goes away.
pub async fn forward(tx: mpsc::Sender<Signal>, cancel: CancellationToken) -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        let sig = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = sigterm.recv() => Signal::SIGTERM,
            _ = sigquit.recv() => Signal::SIGQUIT,
            _ = sigint.recv() => Signal::SIGINT,
        };
        tracing::debug!(signal = ?sig, "forwarding signal");
        if tx.send(sig).await.is_err() {
            return Ok(());
        }
    }
}
