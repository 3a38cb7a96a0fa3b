// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! chainvisor supervisor engine

mod error;
pub mod ledger;
pub mod restart;
mod runner;
pub mod swapper;

pub use error::{RunError, RunErrorKind, EXIT_PREUPGRADE_FATAL};
pub use ledger::{DoneEntry, DoneLedger, LedgerError};
pub use restart::RestartBackoff;
pub use runner::{RunOutcome, Runner};
pub use swapper::{DownloadPolicy, SwapError, Swapper};
