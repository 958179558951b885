//! Subscriptions and the waiter protocol
//!
//! Each subscription owns a small monitor: a mutex around its flag and
//! waiter count, a `wake` condition that releases blocked callers, and a
//! `quiescent` condition that tells a destroying thread the last waiter
//! has left.
//!
//! ## Lifecycle
//!
//! - **Idle**: not signaled
//! - **Signaled**: flag set, waiters (if any) about to wake
//! - **Draining**: removed from the registry, waiting for waiters to leave
//!
//! The flag is auto-reset by the last waiter to leave, never by the
//! producer. A caller that enters `wait` while earlier waiters are still
//! leaving can see the flag still set and return at once: delivery is
//! at-least-once per signal, not exactly-once per waiter.
//!
//! ## Triggering
//!
//! In [`TriggerMode::Edge`] a subscription is notified when its matcher
//! result goes from unsatisfied to satisfied, so a sustained motion fires
//! once instead of on every sample. [`TriggerMode::Level`] fires on every
//! satisfying signal.

use crate::config::TriggerMode;
use crate::sample::MotionSpec;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable subscription identifier. Never reused within a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a call to `wait` ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The motion spec was satisfied
    Matched,
    /// The subscription was destroyed while waiting
    Destroyed,
}

/// Observable lifecycle state of a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    Signaled,
    Draining,
}

#[derive(Debug, Default)]
struct WaitState {
    signaled: bool,
    waiters: usize,
    destroyed: bool,
    /// Matcher result of the previous signal, for edge triggering
    last_match: bool,
    notifications: u64,
}

/// A registered motion spec plus its wait/notify state.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    spec: MotionSpec,
    state: Mutex<WaitState>,
    wake: Condvar,
    quiescent: Condvar,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, spec: MotionSpec) -> Self {
        Self {
            id,
            spec,
            state: Mutex::new(WaitState::default()),
            wake: Condvar::new(),
            quiescent: Condvar::new(),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn spec(&self) -> &MotionSpec {
        &self.spec
    }

    fn lock(&self) -> MutexGuard<'_, WaitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // WAITER SIDE
    // =========================================================================

    /// Block until the flag is set.
    pub(crate) fn wait(&self) -> WaitOutcome {
        let mut state = self.lock();
        if state.destroyed {
            return WaitOutcome::Destroyed;
        }
        state.waiters += 1;

        let mut state = self
            .wake
            .wait_while(state, |s| !s.signaled)
            .unwrap_or_else(PoisonError::into_inner);

        state.waiters -= 1;
        let outcome = if state.destroyed {
            WaitOutcome::Destroyed
        } else {
            WaitOutcome::Matched
        };
        if state.waiters == 0 {
            if !state.destroyed {
                state.signaled = false;
            }
            self.quiescent.notify_all();
        }
        outcome
    }

    // =========================================================================
    // PRODUCER SIDE
    // =========================================================================

    /// Feed one matcher result. Returns true if waiters were notified.
    pub(crate) fn offer(&self, matched: bool, trigger: TriggerMode) -> bool {
        let mut state = self.lock();
        if state.destroyed {
            return false;
        }
        let fire = match trigger {
            TriggerMode::Edge => matched && !state.last_match,
            TriggerMode::Level => matched,
        };
        state.last_match = matched;
        if fire {
            state.signaled = true;
            state.notifications += 1;
            self.wake.notify_all();
        }
        fire
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Release every waiter with `Destroyed` and block until all have left.
    ///
    /// The caller must already have made the subscription unreachable.
    pub(crate) fn retire(&self) {
        let mut state = self.lock();
        state.destroyed = true;
        state.signaled = true;
        self.wake.notify_all();

        let _drained = self
            .quiescent
            .wait_while(state, |s| s.waiters > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    pub fn state(&self) -> SubscriptionState {
        let state = self.lock();
        if state.destroyed {
            SubscriptionState::Draining
        } else if state.signaled {
            SubscriptionState::Signaled
        } else {
            SubscriptionState::Idle
        }
    }

    /// Callers currently blocked in `wait`.
    pub fn waiters(&self) -> usize {
        self.lock().waiters
    }

    /// Times this subscription has been notified by a signal.
    pub fn notifications(&self) -> u64 {
        self.lock().notifications
    }
}
