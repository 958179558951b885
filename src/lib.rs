//! Motion Event - blocking notification on accelerometer motion patterns
//!
//! A caller describes a motion, parks a thread on it, and is released when
//! the sample stream shows that motion.
//!
//! # Core Types
//!
//! - **Sample**: one fixed-point three-axis acceleration reading
//! - **MotionSpec**: per-axis deltas plus how many matching sample pairs
//!   make an event
//! - **EventRegistry**: the shared window, the subscriptions, and the
//!   id counter, owned by one value
//!
//! # Architecture: Producer / Window / Waiters
//!
//! 1. **Producer** - one thread calls `signal` with each new sample
//! 2. **Window** - bounded FIFO of the last `window + 1` samples, shared by
//!    every subscription
//! 3. **Waiters** - any number of threads block in `wait` on a subscription
//!
//! Every `signal` re-runs the matcher for every live subscription against
//! the updated window. A subscription whose result rises to satisfied is
//! flagged and all of its waiters are released together. The last waiter
//! out clears the flag.
//!
//! `destroy` unlinks the subscription, releases its waiters with
//! [`WaitOutcome::Destroyed`], and returns only after the last of them has
//! left `wait`.
//!
//! # Matching
//!
//! Adjacent samples are compared pairwise. A pair matches when the summed
//! absolute delta is above the noise floor and every axis moved at least
//! its threshold. A motion spec is satisfied once `required_matches` pairs in
//! the window match.
//!
//! # Example: Vertical Shake
//!
//! ```rust
//! use motion_event::{EventRegistry, MotionSpec, Sample, WaitOutcome};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let registry = Arc::new(EventRegistry::default());
//!
//! // Two vertical jolts of at least 0.10 m/s² (fixed-point x100)
//! let shake = registry.create(MotionSpec::new(0, 0, 10, 2)).unwrap();
//!
//! let waiter = {
//!     let registry = Arc::clone(&registry);
//!     thread::spawn(move || registry.wait(shake))
//! };
//!
//! for z in [0, 20, 0, 20] {
//!     registry.signal(Sample::new(0, 0, z)).unwrap();
//! }
//! assert_eq!(waiter.join().unwrap(), Ok(WaitOutcome::Matched));
//!
//! registry.destroy(shake).unwrap();
//! assert!(registry.wait(shake).is_err());
//! ```
//!
//! # Control Plane
//!
//! [`ControlPlane`] exposes the same operations over fixed-layout records
//! and errno-style results, together with the privileged
//! [`AccelerationStore`]. [`Feeder`] drives it from any
//! [`AccelerationSource`].

mod config;
mod control;
mod error;
mod feed;
mod matcher;
mod registry;
mod sample;
mod store;
mod subscription;
mod window;

pub use config::{EventConfig, TriggerMode, DEFAULT_NOISE, DEFAULT_WINDOW, MAX_WINDOW};
pub use control::{
    decode_motion, decode_sample, encode_motion, encode_sample, Call, CallNumber, ControlPlane,
    ACCELERATION_RECORD_LEN, MOTION_RECORD_LEN,
};
pub use error::{Error, Result};
pub use feed::{AccelerationSource, FeedStats, Feeder, FnSource};
pub use matcher::{count_matches, pair_matches, satisfied};
pub use registry::{EventRegistry, RegistryStats};
pub use sample::{AxisDelta, MotionSpec, Reading, Sample};
pub use store::{AccelerationStore, Caller};
pub use subscription::{Subscription, SubscriptionId, SubscriptionState, WaitOutcome};
pub use window::SampleWindow;
