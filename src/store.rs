//! Privileged current-acceleration store
//!
//! A single shared sample that only a privileged caller may overwrite.
//! Separate from the matching core; the feeder writes it on every poll.

use crate::error::{Error, Result};
use crate::sample::Sample;
use std::sync::{Mutex, PoisonError};

/// Identity of the caller of a control-plane operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller {
    pub uid: u32,
    pub euid: u32,
}

impl Caller {
    pub const ROOT: Caller = Caller { uid: 0, euid: 0 };

    pub const fn new(uid: u32, euid: u32) -> Self {
        Self { uid, euid }
    }

    /// Root by real or effective id.
    pub fn is_privileged(&self) -> bool {
        self.uid == 0 || self.euid == 0
    }
}

/// Last acceleration reported by the privileged feeder.
#[derive(Debug, Default)]
pub struct AccelerationStore {
    current: Mutex<Option<Sample>>,
}

impl AccelerationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the current acceleration.
    pub fn set(&self, caller: Caller, sample: Sample) -> Result<()> {
        if !caller.is_privileged() {
            log::warn!(
                "rejected acceleration write from uid {} euid {}",
                caller.uid,
                caller.euid
            );
            return Err(Error::PermissionDenied);
        }
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(sample);
        Ok(())
    }

    /// Last stored acceleration, if any.
    pub fn current(&self) -> Option<Sample> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
