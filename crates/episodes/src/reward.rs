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

use crate::model::RewardTag;

/// Added for a solved hint, subtracted for an unsolved one.
pub const SOLVE_BONUS: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reward {
    pub value: f64,
    pub tag: RewardTag,
}

/// `1 / (1 + (n/50) * ln(1+n))`: 1 at zero tokens, strictly decreasing, never
/// reaching zero.
pub fn brevity(tokens: u32) -> f64 {
    let n = f64::from(tokens);
    1.0 / (1.0 + (n / 50.0) * n.ln_1p())
}

/// A leak always scores -1. Otherwise brevity is nudged by the solve outcome
/// and clamped into [-1, 1].
pub fn score(did_leak: bool, tokens: u32, solved: bool) -> Reward {
    if did_leak {
        return Reward {
            value: -1.0,
            tag: RewardTag::Leak,
        };
    }

    let (bonus, tag) = if solved {
        (SOLVE_BONUS, RewardTag::AutoLenSolve)
    } else {
        (-SOLVE_BONUS, RewardTag::AutoLen)
    };
    Reward {
        value: (brevity(tokens) + bonus).clamp(-1.0, 1.0),
        tag,
    }
}
