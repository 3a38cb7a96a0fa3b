//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for building a node home and running chainvisor
//! against it.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Sentinel a halting daemon writes for upgrade `chain2` at height 49.
pub const CHAIN2_SENTINEL: &str = r#"{"name":"chain2","height":"49"}"#;

/// Returns the path to a binary, checking llvm-cov target directory first.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // Shared or relocated target directory: resolve next to the test binary.
    assert_cmd::cargo::cargo_bin(name)
}

/// Create a CLI builder for chainvisor commands
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(binary_path("chainvisor"));
        cmd.args(&self.args);

        // Keep the caller's node configuration out of the test.
        for (key, _) in std::env::vars() {
            if key.starts_with("DAEMON_")
                || key.starts_with("COSMOVISOR_")
                || key == "UNSAFE_SKIP_BACKUP"
            {
                cmd.env_remove(key);
            }
        }

        for (key, value) in self.envs {
            cmd.env(key, value);
        }

        cmd
    }

    /// Run and return the raw result
    pub fn runs(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        RunAssert { output }
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let run = self.runs();
        assert!(
            run.output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            run.output.status.code(),
            run.stdout(),
            run.stderr()
        );
        run
    }

    /// Run and expect the given exit code
    pub fn exits_with(self, code: i32) -> RunAssert {
        let run = self.runs();
        assert_eq!(
            run.output.status.code(),
            Some(code),
            "unexpected exit code\nstdout: {}\nstderr: {}",
            run.stdout(),
            run.stderr()
        );
        run
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    /// Get stdout as string
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    /// Get stderr as string
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Assert stdout equals expected exactly (with diff on failure).
    pub fn stdout_eq(self, expected: &str) -> Self {
        let stdout = self.stdout();
        similar_asserts::assert_eq!(stdout, expected);
        self
    }

    /// Assert stdout contains substring.
    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    /// Assert stderr contains substring.
    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }

    /// Assert stderr does not contain substring.
    pub fn stderr_lacks(self, unexpected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            !stderr.contains(unexpected),
            "stderr should not contain '{}'\nstderr: {}",
            unexpected,
            stderr
        );
        self
    }
}

// =============================================================================
// Node home
// =============================================================================

/// Scratch node home with a `cosmovisor/` tree and a `data/` directory.
pub struct Node {
    dir: tempfile::TempDir,
}

impl Node {
    /// Home with an empty `cosmovisor/` root and `data/`.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cosmovisor")).unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        Self { dir }
    }

    pub fn home(&self) -> &Path {
        self.dir.path()
    }

    /// File the daemon scripts append to.
    pub fn log_path(&self) -> PathBuf {
        self.home().join("daemon.log")
    }

    /// Install `body` as `cosmovisor/<dir>/bin/simd`.
    fn script(&self, dir: &str, body: &str) {
        let path = self.home().join("cosmovisor").join(dir).join("bin/simd");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let script = format!(
            "#!/bin/sh\nLOG='{}'\nDATA='{}'\n{}\n",
            self.log_path().display(),
            self.home().join("data").display(),
            body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn genesis(&self, body: &str) {
        self.script("genesis", body);
    }

    pub fn upgrade(&self, name: &str, body: &str) {
        self.script(&format!("upgrades/{name}"), body);
    }

    /// Lines the daemon scripts logged.
    pub fn log(&self) -> Vec<String> {
        std::fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Target of the `current` link, relative to the root.
    pub fn current(&self) -> Option<PathBuf> {
        std::fs::read_link(self.home().join("cosmovisor/current")).ok()
    }

    /// Names of `data-backup-*` directories in the home.
    pub fn backups(&self) -> Vec<String> {
        std::fs::read_dir(self.home())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("data-backup-"))
            .collect()
    }

    /// Run chainvisor against this home with the minimal configuration.
    pub fn chainvisor(&self) -> CliBuilder {
        cli()
            .env("DAEMON_HOME", self.home())
            .env("DAEMON_NAME", "simd")
            .env("DAEMON_POLL_INTERVAL", "20ms")
            .env("DAEMON_WATCHER_MODE", "poll")
    }
}
