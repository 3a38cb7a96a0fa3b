// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record of applied upgrades.
//!
//! A plan whose name appears here is never applied again, even if the
//! sentinel or the manual batch still mentions it.

use cv_core::files::write_json_atomic;
use cv_core::UpgradePlan;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read done ledger {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("corrupt done ledger {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write done ledger {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// One applied upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoneEntry {
    pub name: String,
    pub height: i64,
}

#[derive(Debug, Clone)]
pub struct DoneLedger {
    path: PathBuf,
    entries: Vec<DoneEntry>,
}

impl DoneLedger {
    /// Load the ledger at `path`. A missing or empty file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let entries = match fs::read(path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| LedgerError::Json {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(LedgerError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn entries(&self) -> &[DoneEntry] {
        &self.entries
    }

    /// Append `plan` and persist. Recording a name twice is a no-op.
    pub fn record(&mut self, plan: &UpgradePlan) -> Result<(), LedgerError> {
        if self.contains(&plan.name) {
            return Ok(());
        }
        self.entries.push(DoneEntry {
            name: plan.name.clone(),
            height: plan.height,
        });
        write_json_atomic(&self.path, &self.entries).map_err(|source| {
            self.entries.pop();
            LedgerError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
