// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor configuration loaded from the environment.

use crate::env;
use crate::layout::Layout;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not set")]
    Missing { var: &'static str },
    #[error("{var}={value:?} is not a boolean, expected true or false")]
    InvalidBool { var: &'static str, value: String },
    #[error("{var}={value:?} is not a duration: {reason}")]
    InvalidDuration {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("{var}={value:?} must be greater than zero")]
    NonPositiveDuration { var: &'static str, value: String },
    #[error("{var}={value:?} is not a non-negative integer")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var}={value:?} is not a watcher mode, expected notify, poll or hybrid")]
    InvalidWatchMode { var: &'static str, value: String },
    #[error("{var} must be an absolute path, got {}", .path.display())]
    NotAbsolute { var: &'static str, path: PathBuf },
    #[error("{var} {} does not exist or is not a directory", .path.display())]
    NotADirectory { var: &'static str, path: PathBuf },
    #[error("cosmovisor root {} does not exist or is not a directory", .path.display())]
    MissingRoot { path: PathBuf },
    #[error("{} configuration errors found:\n{}", .0.len(), join_errors(.0))]
    Multiple(Vec<ConfigError>),
}

impl ConfigError {
    /// Number of individual problems.
    pub fn count(&self) -> usize {
        match self {
            ConfigError::Multiple(errors) => errors.len(),
            _ => 1,
        }
    }

    fn from_list(mut errors: Vec<ConfigError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(ConfigError::Multiple(errors)),
        }
    }
}

/// A bare integer is milliseconds; anything else goes through humantime.
fn parse_duration(value: &str) -> Result<Duration, humantime::DurationError> {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(ms) = value.parse::<u64>() {
            return Ok(Duration::from_millis(ms));
        }
    }
    humantime::parse_duration(value)
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// How the sentinel file is watched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchMode {
    Notify,
    Poll,
    #[default]
    Hybrid,
}

impl FromStr for WatchMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "notify" => Ok(WatchMode::Notify),
            "poll" => Ok(WatchMode::Poll),
            "hybrid" => Ok(WatchMode::Hybrid),
            _ => Err(()),
        }
    }
}

impl fmt::Display for WatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WatchMode::Notify => "notify",
            WatchMode::Poll => "poll",
            WatchMode::Hybrid => "hybrid",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub home: PathBuf,
    pub name: String,
    pub allow_download_binaries: bool,
    pub download_must_have_checksum: bool,
    pub restart_after_upgrade: bool,
    pub restart_delay: Duration,
    pub poll_interval: Duration,
    pub shutdown_grace: Duration,
    pub unsafe_skip_backup: bool,
    pub data_backup_path: PathBuf,
    pub preupgrade_max_retries: u32,
    /// Zero means unlimited.
    pub max_restart_retries: u32,
    pub disable_logs: bool,
    pub disable_recase: bool,
    /// Script name relative to the cosmovisor root.
    pub custom_preupgrade: Option<String>,
    pub watcher_mode: WatchMode,
    pub batch_file: Option<PathBuf>,
}

impl Config {
    /// Config with defaults for everything except home and daemon name.
    pub fn new(home: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let home = home.into();
        Self {
            data_backup_path: home.clone(),
            home,
            name: name.into(),
            allow_download_binaries: false,
            download_must_have_checksum: false,
            restart_after_upgrade: true,
            restart_delay: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown_grace: Duration::ZERO,
            unsafe_skip_backup: false,
            preupgrade_max_retries: 0,
            max_restart_retries: 0,
            disable_logs: false,
            disable_recase: false,
            custom_preupgrade: None,
            watcher_mode: WatchMode::default(),
            batch_file: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env::var)
    }

    /// Parse and validate using `lookup` for variable values. Every problem
    /// is collected before returning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut errors = Vec::new();
        let mut cfg = Config::new(
            lookup(env::DAEMON_HOME).unwrap_or_default(),
            lookup(env::DAEMON_NAME).unwrap_or_default(),
        );

        let mut boolean = |var: &'static str, default: bool| match lookup(var) {
            None => default,
            Some(value) => match parse_bool(&value) {
                Some(b) => b,
                None => {
                    errors.push(ConfigError::InvalidBool { var, value });
                    default
                }
            },
        };
        cfg.allow_download_binaries = boolean(env::DAEMON_ALLOW_DOWNLOAD_BINARIES, false);
        cfg.download_must_have_checksum = boolean(env::DAEMON_DOWNLOAD_MUST_HAVE_CHECKSUM, false);
        cfg.restart_after_upgrade = boolean(env::DAEMON_RESTART_AFTER_UPGRADE, true);
        cfg.unsafe_skip_backup = boolean(env::UNSAFE_SKIP_BACKUP, false);
        cfg.disable_logs = boolean(env::COSMOVISOR_DISABLE_LOGS, false);
        cfg.disable_recase = boolean(env::COSMOVISOR_DISABLE_RECASE, false);

        let mut duration = |var: &'static str, default: Duration, positive: bool| {
            let Some(value) = lookup(var) else {
                return default;
            };
            match parse_duration(&value) {
                Ok(d) if positive && d.is_zero() => {
                    errors.push(ConfigError::NonPositiveDuration { var, value });
                    default
                }
                Ok(d) => d,
                Err(e) => {
                    errors.push(ConfigError::InvalidDuration {
                        var,
                        value,
                        reason: e.to_string(),
                    });
                    default
                }
            }
        };
        cfg.restart_delay = duration(env::DAEMON_RESTART_DELAY, Duration::ZERO, true);
        cfg.poll_interval = duration(env::DAEMON_POLL_INTERVAL, DEFAULT_POLL_INTERVAL, true);
        cfg.shutdown_grace = duration(env::DAEMON_SHUTDOWN_GRACE, Duration::ZERO, false);

        let mut number = |var: &'static str| match lookup(var) {
            None => 0,
            Some(value) => value.parse::<u32>().unwrap_or_else(|_| {
                errors.push(ConfigError::InvalidNumber { var, value });
                0
            }),
        };
        cfg.preupgrade_max_retries = number(env::DAEMON_PREUPGRADE_MAX_RETRIES);
        cfg.max_restart_retries = number(env::DAEMON_MAX_RESTART_RETRIES);

        if let Some(value) = lookup(env::DAEMON_WATCHER_MODE) {
            match value.parse() {
                Ok(mode) => cfg.watcher_mode = mode,
                Err(()) => errors.push(ConfigError::InvalidWatchMode {
                    var: env::DAEMON_WATCHER_MODE,
                    value,
                }),
            }
        }

        if let Some(path) = lookup(env::DAEMON_DATA_BACKUP_DIR) {
            cfg.data_backup_path = PathBuf::from(path);
        }
        cfg.custom_preupgrade = lookup(env::COSMOVISOR_CUSTOM_PREUPGRADE);
        cfg.batch_file = lookup(env::DAEMON_UPGRADE_BATCH_FILE).map(PathBuf::from);

        if let Err(e) = cfg.validate() {
            match e {
                ConfigError::Multiple(list) => errors.extend(list),
                other => errors.push(other),
            }
        }

        match ConfigError::from_list(errors) {
            Some(e) => Err(e),
            None => Ok(cfg),
        }
    }

    /// Check paths and required fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.name.is_empty() {
            errors.push(ConfigError::Missing {
                var: env::DAEMON_NAME,
            });
        }

        if self.home.as_os_str().is_empty() {
            errors.push(ConfigError::Missing {
                var: env::DAEMON_HOME,
            });
        } else if !self.home.is_absolute() {
            errors.push(ConfigError::NotAbsolute {
                var: env::DAEMON_HOME,
                path: self.home.clone(),
            });
        } else if !self.home.is_dir() {
            errors.push(ConfigError::NotADirectory {
                var: env::DAEMON_HOME,
                path: self.home.clone(),
            });
        } else if !self.layout().root().is_dir() {
            errors.push(ConfigError::MissingRoot {
                path: self.layout().root(),
            });
        }

        if !self.unsafe_skip_backup {
            check_dir(env::DAEMON_DATA_BACKUP_DIR, &self.data_backup_path, &mut errors);
        }

        match ConfigError::from_list(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.home, &self.name).with_backup_root(&self.data_backup_path)
    }

    /// Manual upgrade batch location, honouring the override.
    pub fn batch_path(&self) -> PathBuf {
        self.batch_file
            .clone()
            .unwrap_or_else(|| self.layout().batch_file())
    }

    /// Names are lowercased unless recasing is disabled.
    pub fn recase(&self) -> bool {
        !self.disable_recase
    }

    /// Human-readable report of the configuration and the paths derived
    /// from it.
    pub fn detail_string(&self) -> String {
        let layout = self.layout();
        let configurable = [
            (env::DAEMON_HOME, self.home.display().to_string()),
            (env::DAEMON_NAME, self.name.clone()),
            (
                env::DAEMON_ALLOW_DOWNLOAD_BINARIES,
                self.allow_download_binaries.to_string(),
            ),
            (
                env::DAEMON_DOWNLOAD_MUST_HAVE_CHECKSUM,
                self.download_must_have_checksum.to_string(),
            ),
            (
                env::DAEMON_RESTART_AFTER_UPGRADE,
                self.restart_after_upgrade.to_string(),
            ),
            (env::DAEMON_RESTART_DELAY, fmt_duration(self.restart_delay)),
            (env::DAEMON_POLL_INTERVAL, fmt_duration(self.poll_interval)),
            (env::DAEMON_SHUTDOWN_GRACE, fmt_duration(self.shutdown_grace)),
            (env::UNSAFE_SKIP_BACKUP, self.unsafe_skip_backup.to_string()),
            (
                env::DAEMON_DATA_BACKUP_DIR,
                self.data_backup_path.display().to_string(),
            ),
            (
                env::DAEMON_PREUPGRADE_MAX_RETRIES,
                self.preupgrade_max_retries.to_string(),
            ),
            (
                env::DAEMON_MAX_RESTART_RETRIES,
                self.max_restart_retries.to_string(),
            ),
            (env::COSMOVISOR_DISABLE_LOGS, self.disable_logs.to_string()),
            (env::COSMOVISOR_DISABLE_RECASE, self.disable_recase.to_string()),
            (
                env::COSMOVISOR_CUSTOM_PREUPGRADE,
                self.custom_preupgrade.clone().unwrap_or_default(),
            ),
            (env::DAEMON_WATCHER_MODE, self.watcher_mode.to_string()),
            (
                env::DAEMON_UPGRADE_BATCH_FILE,
                self.batch_path().display().to_string(),
            ),
        ];
        let derived = [
            ("Root Dir", layout.root()),
            ("Upgrade Dir", layout.upgrades_dir()),
            ("Genesis Bin", layout.genesis_bin()),
            ("Monitored File", layout.sentinel_path()),
            ("Data Backup Dir", self.data_backup_path.clone()),
        ];

        let mut out = String::from("Configurable Values:\n");
        for (var, value) in configurable {
            out.push_str(&format!("  {var}: {value}\n"));
        }
        out.push_str("Derived Values:\n");
        for (label, path) in derived {
            out.push_str(&format!("  {label:>15}: {}\n", path.display()));
        }
        out
    }
}

/// `true`/`false`, any case.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn fmt_duration(d: Duration) -> String {
    humantime::format_duration(d).to_string()
}

fn check_dir(var: &'static str, path: &Path, errors: &mut Vec<ConfigError>) {
    if path.as_os_str().is_empty() {
        errors.push(ConfigError::Missing { var });
    } else if !path.is_absolute() {
        errors.push(ConfigError::NotAbsolute {
            var,
            path: path.to_path_buf(),
        });
    } else if !path.is_dir() {
        errors.push(ConfigError::NotADirectory {
            var,
            path: path.to_path_buf(),
        });
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
