//! Matcher - decides whether a motion spec is satisfied by a window
//!
//! Only adjacent pairs are compared: sample `i` against sample `i - 1`,
//! once each. A pair counts when the summed movement is above the noise
//! floor and every axis moved at least the motion spec's delta.

use crate::sample::{MotionSpec, Sample};

/// Whether the adjacent pair `(prev, cur)` counts toward `spec`.
#[inline]
pub fn pair_matches(prev: &Sample, cur: &Sample, spec: &MotionSpec, noise: u32) -> bool {
    let delta = cur.delta(prev);
    delta.total() > noise && spec.accepts(&delta)
}

/// Number of matching adjacent pairs in `window`.
pub fn count_matches(window: &[Sample], spec: &MotionSpec, noise: u32) -> usize {
    window
        .windows(2)
        .filter(|pair| pair_matches(&pair[0], &pair[1], spec, noise))
        .count()
}

/// Whether `window` holds at least `spec.required_matches` matching pairs.
///
/// Stops scanning as soon as the count is reached. A window with fewer
/// than two samples is never satisfied.
pub fn satisfied(window: &[Sample], spec: &MotionSpec, noise: u32) -> bool {
    if window.len() < 2 {
        return false;
    }
    let required = spec.required_matches as usize;
    if required == 0 {
        return true;
    }
    let mut matches = 0;
    for pair in window.windows(2) {
        if pair_matches(&pair[0], &pair[1], spec, noise) {
            matches += 1;
            if matches >= required {
                return true;
            }
        }
    }
    false
}
