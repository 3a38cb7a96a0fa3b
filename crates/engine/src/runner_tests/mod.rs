// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor scenarios driven by shell-script daemons.

mod batch;
mod restart;
mod stop;
mod upgrade;

use super::*;
use crate::ledger::DoneLedger;
use cv_adapters::{FakeFetcher, StdioSpec};
use cv_core::WatchMode;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RUN_TIMEOUT: Duration = Duration::from_secs(20);

/// Upgrade binary: answers `pre-upgrade`, otherwise logs its args and exits 0.
const V2: &str = r#"if [ "$1" = pre-upgrade ]; then echo pre-upgrade >> "$LOG"; exit 0; fi
echo "v2 $*" >> "$LOG""#;

const CHAIN2_SENTINEL: &str = r#"{"name":"chain2","height":"49"}"#;

/// A daemon home with an empty `cosmovisor/` and `data/`.
struct Node {
    dir: TempDir,
    layout: Layout,
    config: Config,
    fetcher: FakeFetcher,
}

impl Node {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("cosmovisor")).unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        let mut config = Config::new(dir.path(), "simd");
        config.watcher_mode = WatchMode::Poll;
        config.poll_interval = Duration::from_millis(20);
        Self {
            layout: config.layout(),
            dir,
            config,
            fetcher: FakeFetcher::new(),
        }
    }

    fn home(&self) -> &Path {
        self.dir.path()
    }

    fn log_path(&self) -> PathBuf {
        self.home().join("daemon.log")
    }

    /// Shell script with `$LOG` and `$DATA` preset.
    fn script(&self, body: &str) -> String {
        format!(
            "#!/bin/sh\nLOG='{}'\nDATA='{}'\n{body}\n",
            self.log_path().display(),
            self.layout.data_dir().display()
        )
    }

    fn install(&self, path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, self.script(body)).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn genesis(&self, body: &str) {
        self.install(&self.layout.genesis_bin(), body);
    }

    fn upgrade(&self, name: &str, body: &str) {
        self.install(&self.layout.upgrade_bin(name), body);
    }

    fn write_sentinel(&self, json: &str) {
        fs::write(self.layout.sentinel_path(), json).unwrap();
    }

    /// Lines the daemons appended to the shared log.
    fn log(&self) -> Vec<String> {
        match fs::read_to_string(self.log_path()) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn runner(&self, args: &[&str]) -> Runner<FakeFetcher> {
        let args = args.iter().map(|a| a.to_string()).collect();
        let io = ProcessIo {
            stdin: StdioSpec::Null,
            ..ProcessIo::inherit()
        };
        Runner::new(self.config.clone(), args, self.fetcher.clone())
            .unwrap()
            .with_io(io)
    }

    async fn run(&self, args: &[&str]) -> Result<RunOutcome, RunError> {
        run_to_end(self.runner(args)).await
    }

    fn current_upgrade(&self) -> Option<String> {
        self.layout.current_upgrade_name()
    }

    fn done(&self) -> DoneLedger {
        DoneLedger::load(&self.layout.done_file()).unwrap()
    }

    fn backups(&self) -> Vec<String> {
        fs::read_dir(self.home())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("data-backup-"))
            .collect()
    }
}

async fn run_to_end(runner: Runner<FakeFetcher>) -> Result<RunOutcome, RunError> {
    tokio::time::timeout(RUN_TIMEOUT, runner.run())
        .await
        .expect("supervisor did not finish")
}
