//! Samples and motion specs - the values that flow through the core
//!
//! A sample is one fixed-point acceleration reading. Raw sensor values are
//! floats in m/s²; they are scaled (default ×100) and truncated toward zero
//! before entering the window, so `981` means 9.81 m/s².

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Three-axis acceleration in scaled fixed-point units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Raw floating-point reading as produced by a sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Absolute per-axis change between two samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AxisDelta {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl AxisDelta {
    /// Sum of the three axes, saturating.
    #[inline]
    pub fn total(&self) -> u32 {
        self.x.saturating_add(self.y).saturating_add(self.z)
    }
}

impl Sample {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Scale a raw reading into fixed-point units, truncating toward zero.
    ///
    /// Non-finite readings, or ones that do not fit in `i32` once scaled,
    /// are rejected.
    pub fn from_reading(reading: Reading, scale: f32) -> Result<Self> {
        Ok(Self {
            x: scale_axis(reading.x, scale)?,
            y: scale_axis(reading.y, scale)?,
            z: scale_axis(reading.z, scale)?,
        })
    }

    /// Absolute change from `prev` to `self` on every axis.
    #[inline]
    pub fn delta(&self, prev: &Sample) -> AxisDelta {
        AxisDelta {
            x: self.x.abs_diff(prev.x),
            y: self.y.abs_diff(prev.y),
            z: self.z.abs_diff(prev.z),
        }
    }
}

impl Reading {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Exclusive upper bound of `i32` as an `f32` (2^31).
const I32_LIMIT: f32 = 2_147_483_648.0;

// Scaling stays in single precision: 0.29 * 100 must land on 29, not 28.
fn scale_axis(value: f32, scale: f32) -> Result<i32> {
    let scaled = (value * scale).trunc();
    if !scaled.is_finite() {
        return Err(Error::InvalidArgument("reading is not finite"));
    }
    if scaled < -I32_LIMIT || scaled >= I32_LIMIT {
        return Err(Error::InvalidArgument("reading out of range"));
    }
    Ok(scaled as i32)
}

/// A motion pattern to detect.
///
/// A pair of adjacent samples matches when every axis moved at least its
/// delta and the summed movement clears the noise floor. The motion spec is
/// satisfied once `required_matches` pairs in the window match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionSpec {
    pub delta_x: u32,
    pub delta_y: u32,
    pub delta_z: u32,
    pub required_matches: u32,
}

impl MotionSpec {
    pub const fn new(delta_x: u32, delta_y: u32, delta_z: u32, required_matches: u32) -> Self {
        Self {
            delta_x,
            delta_y,
            delta_z,
            required_matches,
        }
    }

    /// Cap `required_matches` at `window`.
    pub fn clamped(mut self, window: usize) -> Self {
        let cap = u32::try_from(window).unwrap_or(u32::MAX);
        self.required_matches = self.required_matches.min(cap);
        self
    }

    /// Whether a delta meets every per-axis threshold.
    #[inline]
    pub fn accepts(&self, delta: &AxisDelta) -> bool {
        delta.x >= self.delta_x && delta.y >= self.delta_y && delta.z >= self.delta_z
    }
}
