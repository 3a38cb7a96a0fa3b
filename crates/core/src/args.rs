// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inspection of the arguments forwarded to the daemon.

use std::collections::BTreeSet;

pub const SKIP_UPGRADES_FLAG: &str = "--unsafe-skip-upgrades";

/// Heights listed after `--unsafe-skip-upgrades`.
///
/// Collection stops at the next `--`-prefixed token; tokens that are not
/// positive integers are ignored. `--unsafe-skip-upgrades=10` is accepted
/// as a first value.
pub fn skip_upgrade_heights<S: AsRef<str>>(args: &[S]) -> BTreeSet<i64> {
    let mut heights = BTreeSet::new();
    let mut collecting = false;
    for arg in args {
        let arg = arg.as_ref();
        if let Some(rest) = arg.strip_prefix(SKIP_UPGRADES_FLAG) {
            if rest.is_empty() {
                collecting = true;
                continue;
            }
            if let Some(value) = rest.strip_prefix('=') {
                collecting = true;
                push_height(&mut heights, value);
                continue;
            }
        }
        if !collecting {
            continue;
        }
        if arg.starts_with("--") {
            break;
        }
        push_height(&mut heights, arg);
    }
    heights
}

fn push_height(heights: &mut BTreeSet<i64>, token: &str) {
    if let Ok(h) = token.parse::<i64>() {
        if h > 0 {
            heights.insert(h);
        }
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
