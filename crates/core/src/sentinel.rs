// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Readers for the daemon's upgrade sentinel, the manual batch and the
//! height file, plus the atomic plan writer.

use crate::files::write_json_atomic;
use crate::plan::{ManualUpgradeBatch, PlanError, UpgradePlan};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;

/// Read the sentinel file.
///
/// `Ok(None)` when the file does not exist or is empty; the supervisor
/// truncates the sentinel to clear it.
pub fn read_sentinel(path: &Path, recase: bool) -> Result<Option<UpgradePlan>, PlanError> {
    let bytes = match read_optional(path)? {
        Some(bytes) => bytes,
        None => return Ok(None),
    };
    if is_blank(&bytes) {
        return Ok(None);
    }
    parse_plan(&bytes, recase, path).map(Some)
}

/// Decode and validate a plan from raw sentinel content.
pub fn parse_plan(bytes: &[u8], recase: bool, origin: &Path) -> Result<UpgradePlan, PlanError> {
    let plan: UpgradePlan = serde_json::from_slice(bytes).map_err(|source| PlanError::Decode {
        path: origin.to_path_buf(),
        source,
    })?;
    plan.validate(origin)?;
    Ok(plan.normalized(recase))
}

/// Read the manual upgrade batch. Absent or empty files yield an empty batch.
///
/// Entries may omit `name`, in which case the map key is used.
pub fn read_batch(path: &Path, recase: bool) -> Result<ManualUpgradeBatch, PlanError> {
    let bytes = match read_optional(path)? {
        Some(bytes) if !is_blank(&bytes) => bytes,
        _ => return Ok(ManualUpgradeBatch::new()),
    };

    let value: Value = serde_json::from_slice(&bytes).map_err(|source| PlanError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(entries) = value else {
        return Err(PlanError::BatchNotObject {
            path: path.to_path_buf(),
        });
    };
    if entries.get("name").is_some_and(Value::is_string) {
        return Err(PlanError::LegacyBatch {
            path: path.to_path_buf(),
        });
    }

    let mut batch = ManualUpgradeBatch::new();
    for (key, mut entry) in entries {
        if let Value::Object(fields) = &mut entry {
            fields
                .entry("name")
                .or_insert_with(|| Value::String(key.clone()));
        }
        let plan: UpgradePlan =
            serde_json::from_value(entry).map_err(|source| PlanError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        plan.validate(path)?;
        batch.insert(plan.normalized(recase));
    }
    Ok(batch)
}

/// Write `plan` as JSON to `path` via a `.tmp` sibling and rename.
pub fn write_plan_atomic(path: &Path, plan: &UpgradePlan) -> Result<(), PlanError> {
    write_json_atomic(path, plan).map_err(|source| PlanError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Truncate the sentinel so it reads as "no upgrade pending".
pub fn clear_sentinel(path: &Path) -> Result<(), PlanError> {
    match fs::OpenOptions::new().write(true).truncate(true).open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PlanError::Write {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Last committed height, if the node has published one.
pub fn read_height(path: &Path) -> Result<Option<i64>, PlanError> {
    let Some(bytes) = read_optional(path)? else {
        return Ok(None);
    };
    let text = String::from_utf8_lossy(&bytes);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<i64>()
        .map(Some)
        .map_err(|_| PlanError::HeightFile {
            path: path.to_path_buf(),
            value: text.to_string(),
        })
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, PlanError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PlanError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
#[path = "sentinel_tests.rs"]
mod tests;
