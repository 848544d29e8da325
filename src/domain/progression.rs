//! XP -> level mapping.
//!
//! Level caps are `500 + 600 * i` for `i` in `0..20`. A learner sits at level `i + 1`
//! while below cap `i`; at or above the last cap the level clamps to 20 at 100%.

use serde::Serialize;

const FIRST_CAP: u64 = 500;
const CAP_STEP: u64 = 600;
const CAP_COUNT: u64 = 20;

pub const MAX_LEVEL: u32 = 20;

/// Where a learner stands within their current level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progression {
    pub level: u32,
    /// XP earned since the start of the current level.
    pub current_xp: u64,
    /// Width of the current level band (0 once clamped at the top).
    pub required_xp: u64,
    pub percent: f64,
}

impl Progression {
    /// XP still missing before the next level.
    pub fn remaining_xp(&self) -> u64 {
        self.required_xp.saturating_sub(self.current_xp)
    }
}

fn level_cap(i: u64) -> u64 {
    FIRST_CAP + CAP_STEP * i
}

/// Pure and deterministic; negative XP is unrepresentable.
pub fn progression_for(xp: u64) -> Progression {
    let mut previous = 0;
    for i in 0..CAP_COUNT {
        let cap = level_cap(i);
        if xp < cap {
            let current_xp = xp - previous;
            let required_xp = cap - previous;
            return Progression {
                level: i as u32 + 1,
                current_xp,
                required_xp,
                percent: current_xp as f64 / required_xp as f64 * 100.0,
            };
        }
        previous = cap;
    }
    Progression {
        level: MAX_LEVEL,
        current_xp: 0,
        required_xp: 0,
        percent: 100.0,
    }
}

/// Shorthand for the level only.
pub fn level_for(xp: u64) -> u32 {
    progression_for(xp).level
}
