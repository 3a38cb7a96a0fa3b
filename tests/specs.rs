//! Behavioral specifications for the chainvisor binary.
//!
//! These tests are black-box: they invoke the binary against a scratch
//! node home populated with shell-script daemons and verify exit codes,
//! stderr, and the resulting on-disk layout.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/config.rs"]
mod cli_config;
#[path = "specs/cli/help.rs"]
mod cli_help;

// run/
#[path = "specs/run/supervise.rs"]
mod run_supervise;
#[path = "specs/run/upgrade.rs"]
mod run_upgrade;
