//! Event registry - the owned core every operation goes through
//!
//! Three independent locks, never nested in a way that can block:
//!
//! 1. `window` - held only for a push plus snapshot copy
//! 2. `subscriptions` - held only for insert/remove/lookup or to clone the
//!    live set; never held while a thread waits on a subscription
//! 3. one monitor per subscription (see [`crate::subscription`])
//!
//! `signal` takes (2) to clone the live set, releases it, takes (1) for the
//! push, releases it, then visits each subscription's monitor in id order.

use crate::config::EventConfig;
use crate::error::{Error, Result};
use crate::matcher;
use crate::sample::{MotionSpec, Sample};
use crate::subscription::{Subscription, SubscriptionId, WaitOutcome};
use crate::window::SampleWindow;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Counters describing registry activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub live_subscriptions: usize,
    pub samples_accepted: u64,
    pub samples_dropped: u64,
    pub notifications: u64,
}

/// Subscription registry plus the shared sample window.
#[derive(Debug)]
pub struct EventRegistry {
    config: EventConfig,
    window: Mutex<SampleWindow>,
    subscriptions: RwLock<BTreeMap<SubscriptionId, Arc<Subscription>>>,
    next_id: AtomicU64,
    notifications: AtomicU64,
}

impl EventRegistry {
    /// Create a registry with the given configuration.
    pub fn new(config: EventConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidArgument)?;
        Ok(Self::build(config))
    }

    fn build(config: EventConfig) -> Self {
        let window = SampleWindow::new(config.window_capacity());
        Self {
            config,
            window: Mutex::new(window),
            subscriptions: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            notifications: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    fn window(&self) -> MutexGuard<'_, SampleWindow> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Register a motion spec and return its id.
    ///
    /// `required_matches` is capped at the configured window. Identical
    /// specs get independent subscriptions.
    pub fn create(&self, spec: MotionSpec) -> Result<SubscriptionId> {
        let spec = spec.clamped(self.config.window);
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if subs.len() >= self.config.max_subscriptions {
            log::warn!(
                "subscription limit reached ({}), rejecting create",
                self.config.max_subscriptions
            );
            return Err(Error::OutOfMemory);
        }
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        subs.insert(id, Arc::new(Subscription::new(id, spec)));
        log::debug!("created subscription {} for {:?}", id, spec);
        Ok(id)
    }

    /// Live subscription by id.
    pub(crate) fn lookup(&self, id: SubscriptionId) -> Result<Arc<Subscription>> {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(id))
    }

    /// Shared handle to a live subscription, for inspecting its state.
    ///
    /// The handle stays readable after `destroy`, but it is no longer
    /// reachable through the registry and is never signaled again.
    pub fn subscription(&self, id: SubscriptionId) -> Result<Arc<Subscription>> {
        self.lookup(id)
    }

    /// Clone of the live set in id order, taken under one read guard.
    fn live(&self) -> Result<Vec<Arc<Subscription>>> {
        let subs = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut live = Vec::new();
        live.try_reserve_exact(subs.len())?;
        live.extend(subs.values().cloned());
        Ok(live)
    }

    /// Block until the subscription is notified or destroyed.
    pub fn wait(&self, id: SubscriptionId) -> Result<WaitOutcome> {
        let sub = self.lookup(id)?;
        let outcome = sub.wait();
        log::trace!("wait on {} returned {:?}", id, outcome);
        Ok(outcome)
    }

    /// Remove a subscription, release its waiters and wait for them to leave.
    pub fn destroy(&self, id: SubscriptionId) -> Result<()> {
        let sub = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or(Error::NotFound(id))?;

        let waiters = sub.waiters();
        sub.retire();
        log::debug!("destroyed subscription {} ({} waiters drained)", id, waiters);
        Ok(())
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.lookup(id).is_ok()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // SIGNAL
    // =========================================================================

    /// Ingest a sample and re-evaluate every live subscription.
    ///
    /// Returns the number of subscriptions notified. On `OutOfMemory` the
    /// sample is dropped and the window is unchanged.
    pub fn signal(&self, sample: Sample) -> Result<usize> {
        // All fallible allocation happens before the window is touched.
        let mut snapshot = Vec::new();
        snapshot.try_reserve_exact(self.config.window_capacity())?;
        let live = self.live()?;

        {
            let mut window = self.window();
            if let Err(e) = window.push(sample) {
                log::warn!(
                    "dropping sample {:?}: {} ({} dropped so far)",
                    sample,
                    e,
                    window.dropped()
                );
                return Err(e);
            }
            snapshot.extend(window.iter().copied());
        }

        let mut notified = 0;
        for sub in &live {
            let matched = matcher::satisfied(&snapshot, sub.spec(), self.config.noise);
            if sub.offer(matched, self.config.trigger) {
                log::debug!("subscription {} notified", sub.id());
                notified += 1;
            }
        }
        self.notifications.fetch_add(notified as u64, Ordering::Relaxed);
        log::trace!(
            "signal {:?}: window {}, {} live, {} notified",
            sample,
            snapshot.len(),
            live.len(),
            notified
        );
        Ok(notified)
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    /// Current window contents, oldest first.
    pub fn window_snapshot(&self) -> Result<Vec<Sample>> {
        self.window().snapshot()
    }

    pub fn stats(&self) -> RegistryStats {
        let (samples_accepted, samples_dropped) = {
            let window = self.window();
            (window.pushed(), window.dropped())
        };
        RegistryStats {
            live_subscriptions: self.len(),
            samples_accepted,
            samples_dropped,
            notifications: self.notifications.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::build(EventConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriggerMode;
    use crate::subscription::SubscriptionState;

    fn z(v: i32) -> Sample {
        Sample::new(0, 0, v)
    }

    #[test]
    fn test_ids_are_monotonic_and_never_reused() {
        let registry = EventRegistry::default();
        let a = registry.create(MotionSpec::new(0, 0, 10, 1)).unwrap();
        let b = registry.create(MotionSpec::new(0, 0, 10, 1)).unwrap();
        registry.destroy(b).unwrap();
        let c = registry.create(MotionSpec::new(0, 0, 10, 1)).unwrap();

        assert_eq!(a, SubscriptionId(1));
        assert_eq!(b, SubscriptionId(2));
        assert_eq!(c, SubscriptionId(3));
    }

    #[test]
    fn test_create_then_destroy_then_wait_not_found() {
        let registry = EventRegistry::default();
        let id = registry.create(MotionSpec::new(1, 1, 1, 1)).unwrap();
        registry.destroy(id).unwrap();

        assert!(!registry.contains(id));
        assert_eq!(registry.wait(id), Err(Error::NotFound(id)));
        assert_eq!(registry.destroy(id), Err(Error::NotFound(id)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_required_matches_clamped_to_window() {
        let registry = EventRegistry::new(EventConfig::new(5, 10)).unwrap();
        let id = registry.create(MotionSpec::new(0, 0, 10, 100)).unwrap();
        assert_eq!(registry.lookup(id).unwrap().spec().required_matches, 5);
    }

    #[test]
    fn test_subscription_limit_is_out_of_memory() {
        let config = EventConfig::default().with_max_subscriptions(2);
        let registry = EventRegistry::new(config).unwrap();
        registry.create(MotionSpec::default()).unwrap();
        let id = registry.create(MotionSpec::default()).unwrap();
        assert_eq!(registry.create(MotionSpec::default()), Err(Error::OutOfMemory));

        registry.destroy(id).unwrap();
        assert!(registry.create(MotionSpec::default()).is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = EventRegistry::new(EventConfig::new(0, 10)).unwrap_err();
        assert_eq!(err, Error::InvalidArgument("window must be > 0"));
    }

    #[test]
    fn test_oversized_window_rejected() {
        let err = EventRegistry::new(EventConfig::new(usize::MAX, 10)).unwrap_err();
        assert_eq!(err, Error::InvalidArgument("window must be <= MAX_WINDOW"));
        assert!(EventRegistry::new(EventConfig::new(crate::config::MAX_WINDOW, 10)).is_ok());
    }

    #[test]
    fn test_subscription_handle_reports_state() {
        let registry = EventRegistry::default();
        let id = registry.create(MotionSpec::new(0, 0, 10, 1)).unwrap();
        let sub = registry.subscription(id).unwrap();
        assert_eq!(sub.id(), id);
        assert_eq!(sub.state(), SubscriptionState::Idle);
        assert_eq!(sub.waiters(), 0);

        registry.signal(z(0)).unwrap();
        registry.signal(z(20)).unwrap();
        assert_eq!(sub.state(), SubscriptionState::Signaled);
        assert_eq!(sub.notifications(), 1);

        registry.destroy(id).unwrap();
        assert_eq!(registry.subscription(id).unwrap_err(), Error::NotFound(id));
        // a stale handle is never signaled again
        registry.signal(z(0)).unwrap();
        registry.signal(z(40)).unwrap();
        assert_eq!(sub.notifications(), 1);
    }

    #[test]
    fn test_live_set_matches_registry() {
        let registry = EventRegistry::default();
        let a = registry.create(MotionSpec::default()).unwrap();
        let b = registry.create(MotionSpec::default()).unwrap();
        let c = registry.create(MotionSpec::default()).unwrap();
        registry.destroy(b).unwrap();

        let live = registry.live().unwrap();
        let ids: Vec<SubscriptionId> = live.iter().map(|sub| sub.id()).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn test_signal_notifies_on_second_match() {
        let registry = EventRegistry::default();
        let id = registry.create(MotionSpec::new(0, 0, 10, 2)).unwrap();
        let sub = registry.lookup(id).unwrap();

        assert_eq!(registry.signal(z(0)).unwrap(), 0);
        assert_eq!(registry.signal(z(20)).unwrap(), 0);
        assert_eq!(sub.state(), SubscriptionState::Idle);

        assert_eq!(registry.signal(z(0)).unwrap(), 1);
        assert_eq!(sub.state(), SubscriptionState::Signaled);
        assert_eq!(registry.wait(id), Ok(WaitOutcome::Matched));
    }

    #[test]
    fn test_edge_trigger_does_not_refire_while_satisfied() {
        let registry = EventRegistry::default();
        registry.create(MotionSpec::new(0, 0, 10, 1)).unwrap();

        registry.signal(z(0)).unwrap();
        assert_eq!(registry.signal(z(20)).unwrap(), 1);
        // the 0 -> 20 pair is still in the window
        assert_eq!(registry.signal(z(20)).unwrap(), 0);
        assert_eq!(registry.stats().notifications, 1);
    }

    #[test]
    fn test_level_trigger_refires() {
        let config = EventConfig::default().with_trigger(TriggerMode::Level);
        let registry = EventRegistry::new(config).unwrap();
        registry.create(MotionSpec::new(0, 0, 10, 1)).unwrap();

        registry.signal(z(0)).unwrap();
        assert_eq!(registry.signal(z(20)).unwrap(), 1);
        assert_eq!(registry.signal(z(20)).unwrap(), 1);
    }

    #[test]
    fn test_identical_specs_are_independent() {
        let registry = EventRegistry::default();
        let spec = MotionSpec::new(0, 0, 10, 1);
        let a = registry.create(spec).unwrap();
        let b = registry.create(spec).unwrap();
        assert_ne!(a, b);

        registry.signal(z(0)).unwrap();
        assert_eq!(registry.signal(z(50)).unwrap(), 2);
        assert_eq!(registry.wait(a), Ok(WaitOutcome::Matched));

        registry.destroy(a).unwrap();
        assert!(registry.contains(b));
        assert_eq!(registry.wait(b), Ok(WaitOutcome::Matched));
        registry.destroy(b).unwrap();
    }

    #[test]
    fn test_window_bounded_by_config() {
        let registry = EventRegistry::new(EventConfig::new(3, 10)).unwrap();
        for i in 0..10 {
            registry.signal(z(i)).unwrap();
        }
        let window = registry.window_snapshot().unwrap();
        assert_eq!(window, vec![z(6), z(7), z(8), z(9)]);

        let stats = registry.stats();
        assert_eq!(stats.samples_accepted, 10);
        assert_eq!(stats.samples_dropped, 0);
    }
}
