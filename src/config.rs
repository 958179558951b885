//! Core configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of adjacent-sample comparisons the window supports.
pub const DEFAULT_WINDOW: usize = 20;

/// Largest accepted window.
pub const MAX_WINDOW: usize = 4096;

/// Default noise floor for the summed per-axis delta of a sample pair.
pub const DEFAULT_NOISE: u32 = 10;

/// When a subscription is notified relative to its matcher result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TriggerMode {
    /// Notify when the result flips from unsatisfied to satisfied.
    #[default]
    Edge,
    /// Notify on every signal whose window satisfies the motion spec.
    Level,
}

/// Configuration for an event registry.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventConfig {
    /// Maximum required match count; the window holds `window + 1` samples.
    pub window: usize,

    /// A sample pair only counts when its summed delta exceeds this.
    pub noise: u32,

    /// Maximum number of live subscriptions.
    pub max_subscriptions: usize,

    /// Edge or level notification.
    pub trigger: TriggerMode,

    /// Feeder poll interval in milliseconds.
    pub feed_interval_ms: u64,

    /// Factor applied to raw float readings before truncation.
    pub scale: f32,
}

impl EventConfig {
    /// Create a configuration with the given window and noise floor.
    pub fn new(window: usize, noise: u32) -> Self {
        Self {
            window,
            noise,
            ..Self::default()
        }
    }

    pub fn with_trigger(mut self, trigger: TriggerMode) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_max_subscriptions(mut self, max: usize) -> Self {
        self.max_subscriptions = max;
        self
    }

    /// Number of samples the window retains.
    pub fn window_capacity(&self) -> usize {
        self.window.checked_add(1).unwrap_or(usize::MAX)
    }

    /// Time span covered by a full window at the feeder cadence.
    pub fn window_ms(&self) -> u64 {
        u64::try_from(self.window_capacity())
            .ok()
            .and_then(|frames| frames.checked_mul(self.feed_interval_ms))
            .unwrap_or(u64::MAX)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.window == 0 {
            return Err("window must be > 0");
        }
        if self.window > MAX_WINDOW {
            return Err("window must be <= MAX_WINDOW");
        }
        if self.max_subscriptions == 0 {
            return Err("max_subscriptions must be > 0");
        }
        if self.feed_interval_ms == 0 {
            return Err("feed_interval_ms must be > 0");
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err("scale must be finite and > 0");
        }
        Ok(())
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            noise: DEFAULT_NOISE,
            max_subscriptions: 1024,
            trigger: TriggerMode::Edge,
            feed_interval_ms: 200,
            scale: 100.0,
        }
    }
}
