//! Control plane - fixed-layout records and numbered calls
//!
//! Callers outside the crate hand over raw records and plain integers and
//! get an `i64` back: a non-negative result on success, a negative errno
//! on failure. Records are native-endian and packed like their C
//! counterparts:
//!
//! - acceleration: `i32 x, i32 y, i32 z` (12 bytes)
//! - motion: `u32 dlt_x, u32 dlt_y, u32 dlt_z, u32 frq` (16 bytes)

use crate::config::EventConfig;
use crate::error::{Error, Result, EIDRM};
use crate::registry::EventRegistry;
use crate::sample::{MotionSpec, Sample};
use crate::store::{AccelerationStore, Caller};
use crate::subscription::{SubscriptionId, WaitOutcome};

pub const ACCELERATION_RECORD_LEN: usize = 12;
pub const MOTION_RECORD_LEN: usize = 16;

// =============================================================================
// RECORDS
// =============================================================================

fn words<const N: usize>(bytes: &[u8], what: &'static str) -> Result<[[u8; 4]; N]> {
    if bytes.len() != N * 4 {
        return Err(Error::InvalidArgument(what));
    }
    let mut out = [[0u8; 4]; N];
    for (word, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        word.copy_from_slice(chunk);
    }
    Ok(out)
}

/// Decode an acceleration record.
pub fn decode_sample(bytes: &[u8]) -> Result<Sample> {
    let [x, y, z] = words::<3>(bytes, "acceleration record must be 12 bytes")?;
    Ok(Sample::new(
        i32::from_ne_bytes(x),
        i32::from_ne_bytes(y),
        i32::from_ne_bytes(z),
    ))
}

pub fn encode_sample(sample: &Sample) -> [u8; ACCELERATION_RECORD_LEN] {
    let mut out = [0u8; ACCELERATION_RECORD_LEN];
    out[0..4].copy_from_slice(&sample.x.to_ne_bytes());
    out[4..8].copy_from_slice(&sample.y.to_ne_bytes());
    out[8..12].copy_from_slice(&sample.z.to_ne_bytes());
    out
}

/// Decode a motion record.
pub fn decode_motion(bytes: &[u8]) -> Result<MotionSpec> {
    let [dx, dy, dz, frq] = words::<4>(bytes, "motion record must be 16 bytes")?;
    Ok(MotionSpec::new(
        u32::from_ne_bytes(dx),
        u32::from_ne_bytes(dy),
        u32::from_ne_bytes(dz),
        u32::from_ne_bytes(frq),
    ))
}

pub fn encode_motion(spec: &MotionSpec) -> [u8; MOTION_RECORD_LEN] {
    let mut out = [0u8; MOTION_RECORD_LEN];
    out[0..4].copy_from_slice(&spec.delta_x.to_ne_bytes());
    out[4..8].copy_from_slice(&spec.delta_y.to_ne_bytes());
    out[8..12].copy_from_slice(&spec.delta_z.to_ne_bytes());
    out[12..16].copy_from_slice(&spec.required_matches.to_ne_bytes());
    out
}

// =============================================================================
// CALLS
// =============================================================================

/// Call numbers of the control-plane operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum CallNumber {
    SetAcceleration = 378,
    Create = 379,
    Wait = 380,
    Signal = 381,
    Destroy = 382,
}

impl TryFrom<u32> for CallNumber {
    type Error = Error;

    fn try_from(nr: u32) -> Result<Self> {
        match nr {
            378 => Ok(CallNumber::SetAcceleration),
            379 => Ok(CallNumber::Create),
            380 => Ok(CallNumber::Wait),
            381 => Ok(CallNumber::Signal),
            382 => Ok(CallNumber::Destroy),
            _ => Err(Error::InvalidArgument("unknown call number")),
        }
    }
}

/// One control-plane call with its raw argument.
#[derive(Clone, Copy, Debug)]
pub enum Call<'a> {
    SetAcceleration(&'a [u8]),
    Create(&'a [u8]),
    Wait(i64),
    Signal(&'a [u8]),
    Destroy(i64),
}

impl Call<'_> {
    pub fn number(&self) -> CallNumber {
        match self {
            Call::SetAcceleration(_) => CallNumber::SetAcceleration,
            Call::Create(_) => CallNumber::Create,
            Call::Wait(_) => CallNumber::Wait,
            Call::Signal(_) => CallNumber::Signal,
            Call::Destroy(_) => CallNumber::Destroy,
        }
    }
}

fn subscription_id(raw: i64) -> Result<SubscriptionId> {
    u64::try_from(raw)
        .ok()
        .filter(|&id| id > 0)
        .map(SubscriptionId)
        .ok_or(Error::InvalidArgument("subscription id must be positive"))
}

/// The event registry and the acceleration store behind one entry point.
#[derive(Debug, Default)]
pub struct ControlPlane {
    events: EventRegistry,
    store: AccelerationStore,
}

impl ControlPlane {
    pub fn new(config: EventConfig) -> Result<Self> {
        Ok(Self {
            events: EventRegistry::new(config)?,
            store: AccelerationStore::new(),
        })
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn store(&self) -> &AccelerationStore {
        &self.store
    }

    /// Run a call and fold the result into errno convention.
    ///
    /// `Wait` returns `0` on a match and `-EIDRM` when the subscription was
    /// destroyed underneath the caller.
    pub fn dispatch(&self, caller: Caller, call: Call<'_>) -> i64 {
        let nr = call.number();
        match self.execute(caller, call) {
            Ok(ret) => ret,
            Err(e) => {
                log::debug!("call {:?} failed: {}", nr, e);
                e.errno()
            }
        }
    }

    fn execute(&self, caller: Caller, call: Call<'_>) -> Result<i64> {
        match call {
            Call::SetAcceleration(record) => {
                self.store.set(caller, decode_sample(record)?)?;
                Ok(0)
            }
            Call::Create(record) => {
                let id = self.events.create(decode_motion(record)?)?;
                i64::try_from(id.0).map_err(|_| Error::OutOfMemory)
            }
            Call::Wait(raw) => match self.events.wait(subscription_id(raw)?)? {
                WaitOutcome::Matched => Ok(0),
                WaitOutcome::Destroyed => Ok(-EIDRM),
            },
            Call::Signal(record) => {
                self.events.signal(decode_sample(record)?)?;
                Ok(0)
            }
            Call::Destroy(raw) => {
                self.events.destroy(subscription_id(raw)?)?;
                Ok(0)
            }
        }
    }
}
