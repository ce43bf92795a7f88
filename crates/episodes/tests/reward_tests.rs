// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use episodes::{brevity, score, RewardTag, SOLVE_BONUS};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn brevity_is_one_at_zero_and_strictly_decreasing() {
    assert_eq!(brevity(0), 1.0);
    let mut previous = brevity(0);
    for n in 1..=2_000 {
        let current = brevity(n);
        assert!(current < previous, "brevity({n}) = {current} >= {previous}");
        assert!(current > 0.0 && current <= 1.0);
        previous = current;
    }
    assert!(brevity(u32::MAX) > 0.0);
}

#[test]
fn solved_short_hint_scores_high() {
    let reward = score(false, 9, true);
    assert!(close(brevity(9), 0.707), "brevity(9) = {}", brevity(9));
    assert!(close(reward.value, 0.907), "reward = {}", reward.value);
    assert_eq!(reward.tag, RewardTag::AutoLenSolve);
}

#[test]
fn unsolved_longer_hint_scores_low() {
    let reward = score(false, 20, false);
    assert!(close(brevity(20), 0.451), "brevity(20) = {}", brevity(20));
    assert!(close(reward.value, 0.251), "reward = {}", reward.value);
    assert_eq!(reward.tag, RewardTag::AutoLen);
}

#[test]
fn leak_overrides_length_and_solve() {
    for tokens in [0, 1, 9, 500] {
        for solved in [false, true] {
            let reward = score(true, tokens, solved);
            assert_eq!(reward.value, -1.0);
            assert_eq!(reward.tag, RewardTag::Leak);
        }
    }
}

#[test]
fn non_leaking_rewards_stay_clamped() {
    for tokens in (0..5_000).step_by(37) {
        for solved in [false, true] {
            let reward = score(false, tokens, solved);
            let bonus = if solved { SOLVE_BONUS } else { -SOLVE_BONUS };
            let expected = (brevity(tokens) + bonus).clamp(-1.0, 1.0);
            assert_eq!(reward.value, expected);
            assert!((-1.0..=1.0).contains(&reward.value));
        }
    }
    assert_eq!(score(false, 0, true).value, 1.0);
}
