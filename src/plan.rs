//! Receiver placement types shared by the partitioner, the allocator and the reporters.

use serde::Serialize;

/// A frequency in Hz.
pub type Hz = u64;

const HZ_PER_MHZ: f64 = 1_000_000.0;

/// Converts Hz to MHz for display only. Planning arithmetic stays integral.
pub fn to_mhz(hz: Hz) -> f64 {
    hz as f64 / HZ_PER_MHZ
}

/// One tunable capture device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Receiver {
    pub index: usize,
    pub center: Hz,
    pub bandwidth: Hz,
    pub recorder_count: u32,
}

impl Receiver {
    pub fn new(index: usize, center: Hz, bandwidth: Hz) -> Self {
        Self {
            index,
            center,
            bandwidth,
            recorder_count: 0,
        }
    }

    /// Lowest frequency this receiver captures (inclusive).
    pub fn lower(&self) -> Hz {
        self.center.saturating_sub(self.bandwidth / 2)
    }

    /// Highest frequency this receiver captures (inclusive).
    pub fn upper(&self) -> Hz {
        self.center.saturating_add(self.bandwidth / 2)
    }

    pub fn covers(&self, frequency: Hz) -> bool {
        self.lower() <= frequency && frequency <= self.upper()
    }
}

/// Ordered receivers produced by [`crate::partition::partition`] and filled in by
/// [`crate::allocate::allocate`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AllocationPlan {
    pub receivers: Vec<Receiver>,
}

impl AllocationPlan {
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    pub fn centers(&self) -> Vec<Hz> {
        self.receivers.iter().map(|r| r.center).collect()
    }

    pub fn total_recorders(&self) -> u32 {
        self.receivers.iter().map(|r| r.recorder_count).sum()
    }

    /// First receiver whose window contains `frequency`.
    pub fn covering(&self, frequency: Hz) -> Option<&Receiver> {
        self.receivers.iter().find(|r| r.covers(frequency))
    }
}
