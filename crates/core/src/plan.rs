// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upgrade plans and operator-authored upgrade batches.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading or validating upgrade plans
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid upgrade plan in {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid upgrade plan in {}: name is empty", .path.display())]
    EmptyName { path: PathBuf },
    #[error("invalid upgrade plan {name:?} in {}: height must be positive, got {height}", .path.display())]
    NonPositiveHeight {
        path: PathBuf,
        name: String,
        height: i64,
    },
    #[error(
        "{} holds a single upgrade plan; a manual upgrade batch must map upgrade names to plans",
        .path.display()
    )]
    LegacyBatch { path: PathBuf },
    #[error("manual upgrade batch {} must be a JSON object", .path.display())]
    BatchNotObject { path: PathBuf },
    #[error("invalid height {value:?} in {}", .path.display())]
    HeightFile { path: PathBuf, value: String },
}

/// A scheduled upgrade: the daemon halts at `height` and expects the binary
/// for `name` to take over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePlan {
    pub name: String,
    #[serde(deserialize_with = "deserialize_height")]
    pub height: i64,
    #[serde(default)]
    pub info: String,
}

impl UpgradePlan {
    pub fn new(name: impl Into<String>, height: i64, info: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            height,
            info: info.into(),
        }
    }

    /// Check required fields. `origin` names the file the plan came from.
    pub fn validate(&self, origin: impl Into<PathBuf>) -> Result<(), PlanError> {
        if self.name.trim().is_empty() {
            return Err(PlanError::EmptyName {
                path: origin.into(),
            });
        }
        if self.height <= 0 {
            return Err(PlanError::NonPositiveHeight {
                path: origin.into(),
                name: self.name.clone(),
                height: self.height,
            });
        }
        Ok(())
    }

    /// Lowercase the name when `recase` is enabled.
    pub fn normalized(mut self, recase: bool) -> Self {
        if recase {
            self.name = self.name.to_lowercase();
        }
        self
    }
}

impl fmt::Display for UpgradePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.height)
    }
}

/// The daemon's JSON encoder writes 64-bit integers as strings, so accept both.
fn deserialize_height<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawHeight {
        Number(i64),
        Text(String),
    }

    match RawHeight::deserialize(deserializer)? {
        RawHeight::Number(n) => Ok(n),
        RawHeight::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid height {s:?}: {e}"))),
    }
}

/// Operator-staged upgrades keyed by upgrade name.
///
/// Read by the supervisor, never written by it. Applied entries are tracked
/// in the done ledger rather than removed from the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ManualUpgradeBatch {
    plans: BTreeMap<String, UpgradePlan>,
}

impl ManualUpgradeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, plan: UpgradePlan) {
        self.plans.insert(plan.name.clone(), plan);
    }

    pub fn get(&self, name: &str) -> Option<&UpgradePlan> {
        self.plans.get(name)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UpgradePlan> {
        self.plans.values()
    }

    /// The pending plan with the lowest height strictly above `height`.
    pub fn next_after(&self, height: i64) -> Option<&UpgradePlan> {
        self.plans
            .values()
            .filter(|p| p.height > height)
            .min_by_key(|p| p.height)
    }

    /// The lowest plan whose height has been reached, ignoring names that
    /// `skip` reports as already handled.
    pub fn due_at(&self, height: i64, skip: impl Fn(&UpgradePlan) -> bool) -> Option<&UpgradePlan> {
        self.plans
            .values()
            .filter(|p| p.height <= height && !skip(p))
            .min_by_key(|p| p.height)
    }
}

impl FromIterator<UpgradePlan> for ManualUpgradeBatch {
    fn from_iter<T: IntoIterator<Item = UpgradePlan>>(iter: T) -> Self {
        let mut batch = Self::new();
        for plan in iter {
            batch.insert(plan);
        }
        batch
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
