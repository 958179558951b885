//! Sliding sample window - the bounded FIFO every matcher reads

use crate::error::Result;
use crate::sample::Sample;
use std::collections::{TryReserveError, VecDeque};

/// Bounded FIFO of the most recent samples, oldest first.
///
/// Holds at most `capacity` samples. Once full, every push evicts the oldest
/// sample before appending. The window itself is not synchronized; the
/// registry wraps it in a mutex.
#[derive(Clone, Debug)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    capacity: usize,

    /// Samples accepted since creation.
    pushed: u64,

    /// Samples dropped on allocation failure.
    dropped: u64,
}

impl SampleWindow {
    /// Create an empty window retaining up to `capacity` samples.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity: capacity.max(1),
            pushed: 0,
            dropped: 0,
        }
    }

    // =========================================================================
    // WRITING
    // =========================================================================

    /// Append a sample, evicting the oldest when full.
    ///
    /// On allocation failure the sample is dropped and the window is left
    /// exactly as it was.
    pub fn push(&mut self, sample: Sample) -> Result<()> {
        self.push_with(sample, |samples| samples.try_reserve(1))
    }

    /// `push` with the growth step supplied by the caller.
    fn push_with<F>(&mut self, sample: Sample, reserve: F) -> Result<()>
    where
        F: FnOnce(&mut VecDeque<Sample>) -> std::result::Result<(), TryReserveError>,
    {
        if self.samples.len() < self.capacity {
            if let Err(e) = reserve(&mut self.samples) {
                self.dropped += 1;
                return Err(e.into());
            }
        } else {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.pushed += 1;
        Ok(())
    }

    /// Remove every sample. Counters are kept.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    // =========================================================================
    // READING
    // =========================================================================

    /// Copy of the current contents in arrival order.
    pub fn snapshot(&self) -> Result<Vec<Sample>> {
        let mut out = Vec::new();
        out.try_reserve_exact(self.samples.len())?;
        out.extend(self.samples.iter().copied());
        Ok(out)
    }

    /// Most recently pushed sample.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
