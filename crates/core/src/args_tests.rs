// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    none             = { &["start", "--home", "/h"],                                   &[] },
    two_heights      = { &["start", "--unsafe-skip-upgrades", "10", "20"],             &[10, 20] },
    non_numeric      = { &["--unsafe-skip-upgrades", "10", "as", "20", "--abcd", "34"], &[10, 20] },
    stops_at_flag    = { &["--unsafe-skip-upgrades", "5", "--home", "7"],              &[5] },
    equals_form      = { &["--unsafe-skip-upgrades=12", "13"],                         &[12, 13] },
    flag_only        = { &["start", "--unsafe-skip-upgrades"],                         &[] },
    negative_ignored = { &["--unsafe-skip-upgrades", "-3", "4"],                       &[4] },
    duplicates       = { &["--unsafe-skip-upgrades", "4", "4"],                        &[4] },
)]
fn skip_heights(args: &[&str], expected: &[i64]) {
    let heights: Vec<i64> = skip_upgrade_heights(args).into_iter().collect();
    assert_eq!(heights, expected);
}

#[test]
fn accepts_owned_strings() {
    let args = vec![SKIP_UPGRADES_FLAG.to_string(), "99".to_string()];
    assert!(skip_upgrade_heights(&args).contains(&99));
}
