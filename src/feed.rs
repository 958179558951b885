//! Sample feeder - polls a source, scales readings, signals the core
//!
//! Best effort: a reading that cannot be scaled is skipped, and a sample
//! the window cannot take is dropped and counted. Only a source failure
//! ends the loop.

use crate::control::ControlPlane;
use crate::error::{Error, Result};
use crate::sample::{Reading, Sample};
use crate::store::Caller;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Anything that yields raw acceleration readings.
pub trait AccelerationSource: Send {
    /// Readings available since the last poll. May be empty.
    fn poll(&mut self) -> Result<Vec<Reading>>;
}

/// Source backed by a closure.
pub struct FnSource<F: FnMut() -> Result<Vec<Reading>> + Send>(pub F);

impl<F: FnMut() -> Result<Vec<Reading>> + Send> AccelerationSource for FnSource<F> {
    fn poll(&mut self) -> Result<Vec<Reading>> {
        (self.0)()
    }
}

/// Outcome counters for one or more polls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub signaled: u64,
    pub notified: u64,
    pub skipped: u64,
    pub dropped: u64,
}

impl FeedStats {
    fn absorb(&mut self, other: FeedStats) {
        self.signaled += other.signaled;
        self.notified += other.notified;
        self.skipped += other.skipped;
        self.dropped += other.dropped;
    }
}

/// Drives a [`ControlPlane`] from an [`AccelerationSource`].
pub struct Feeder<S: AccelerationSource> {
    plane: Arc<ControlPlane>,
    source: S,
    caller: Caller,
    interval: Duration,
    stats: FeedStats,
}

impl<S: AccelerationSource> Feeder<S> {
    /// Feeder writing as root at the plane's configured interval.
    pub fn new(plane: Arc<ControlPlane>, source: S) -> Self {
        let interval = Duration::from_millis(plane.events().config().feed_interval_ms);
        Self {
            plane,
            source,
            caller: Caller::ROOT,
            interval,
            stats: FeedStats::default(),
        }
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = caller;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    /// Poll once and push every reading through the plane.
    pub fn step(&mut self) -> Result<FeedStats> {
        let readings = self.source.poll()?;
        let scale = self.plane.events().config().scale;
        let mut step = FeedStats::default();

        for reading in readings {
            let sample = match Sample::from_reading(reading, scale) {
                Ok(sample) => sample,
                Err(e) => {
                    log::warn!("skipping reading {:?}: {}", reading, e);
                    step.skipped += 1;
                    continue;
                }
            };
            self.plane.store().set(self.caller, sample)?;
            match self.plane.events().signal(sample) {
                Ok(notified) => {
                    step.signaled += 1;
                    step.notified += notified as u64;
                }
                Err(Error::OutOfMemory) => step.dropped += 1,
                Err(e) => return Err(e),
            }
        }

        self.stats.absorb(step);
        Ok(step)
    }

    /// Poll until `stop` is set, sleeping out the rest of each interval.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<FeedStats> {
        log::info!("feeder started, interval {:?}", self.interval);
        while !stop.load(Ordering::Acquire) {
            let tick_start = Instant::now();
            if let Err(e) = self.step() {
                log::error!("feeder stopping: {}", e);
                return Err(e);
            }
            let elapsed = tick_start.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        log::info!("feeder stopped: {:?}", self.stats);
        Ok(self.stats)
    }
}

impl<S: AccelerationSource + 'static> Feeder<S> {
    /// Run on a dedicated thread.
    pub fn spawn(mut self, stop: Arc<AtomicBool>) -> thread::JoinHandle<Result<FeedStats>> {
        thread::spawn(move || self.run(&stop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventConfig;
    use crate::sample::MotionSpec;
    use crate::subscription::WaitOutcome;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Vec<Reading>>);

    impl AccelerationSource for Scripted {
        fn poll(&mut self) -> Result<Vec<Reading>> {
            Ok(self.0.pop_front().unwrap_or_default())
        }
    }

    fn r(z: f32) -> Reading {
        Reading::new(0.0, 0.0, z)
    }

    #[test]
    fn test_step_scales_and_signals() {
        let plane = Arc::new(ControlPlane::default());
        let id = plane.events().create(MotionSpec::new(0, 0, 100, 1)).unwrap();
        let script = Scripted(VecDeque::from(vec![vec![r(9.81), r(11.5)]]));
        let mut feeder = Feeder::new(Arc::clone(&plane), script);

        let step = feeder.step().unwrap();
        assert_eq!(step.signaled, 2);
        assert_eq!(step.notified, 1);
        assert_eq!(plane.store().current(), Some(Sample::new(0, 0, 1150)));
        assert_eq!(plane.events().wait(id), Ok(WaitOutcome::Matched));
    }

    #[test]
    fn test_bad_reading_skipped() {
        let plane = Arc::new(ControlPlane::default());
        let script = Scripted(VecDeque::from(vec![vec![r(f32::NAN), r(1.0)]]));
        let mut feeder = Feeder::new(Arc::clone(&plane), script);

        let step = feeder.step().unwrap();
        assert_eq!(step.skipped, 1);
        assert_eq!(step.signaled, 1);
        assert_eq!(plane.events().window_snapshot().unwrap(), vec![Sample::new(0, 0, 100)]);
    }

    #[test]
    fn test_unprivileged_feeder_fails() {
        let plane = Arc::new(ControlPlane::default());
        let script = Scripted(VecDeque::from(vec![vec![r(1.0)]]));
        let mut feeder = Feeder::new(plane, script).with_caller(Caller::new(1000, 1000));
        assert_eq!(feeder.step(), Err(Error::PermissionDenied));
    }

    fn device_gone() -> Result<Vec<Reading>> {
        Err(Error::Sensor("device gone".into()))
    }

    #[test]
    fn test_source_error_ends_run() {
        let plane = Arc::new(ControlPlane::new(EventConfig::default()).unwrap());
        let source = FnSource(device_gone);
        let mut feeder = Feeder::new(plane, source).with_interval(Duration::from_millis(1));
        let stop = AtomicBool::new(false);
        assert_eq!(feeder.run(&stop), Err(Error::Sensor("device gone".into())));
    }

    #[test]
    fn test_spawned_feeder_stops_on_flag() {
        let plane = Arc::new(ControlPlane::default());
        let reading = Reading::new(0.1, 0.2, 9.8);
        let source = FnSource(move || -> Result<Vec<Reading>> { Ok(vec![reading]) });
        let stop = Arc::new(AtomicBool::new(false));
        let handle = Feeder::new(Arc::clone(&plane), source)
            .with_interval(Duration::from_millis(2))
            .spawn(Arc::clone(&stop));

        while plane.events().stats().samples_accepted < 3 {
            thread::sleep(Duration::from_millis(1));
        }
        stop.store(true, Ordering::Release);
        let stats = handle.join().unwrap().unwrap();
        assert!(stats.signaled >= 3);
        assert_eq!(plane.store().current(), Some(Sample::new(10, 20, 980)));
    }
}
