//! Normalized metric inputs.
//!
//! Metric sampling itself lives outside this crate; samplers deliver values
//! already normalized to `[0, 1]` (or pairs thereof) through a
//! [`MetricSource`]. [`SharedMetrics`] is the in-tree implementation:
//! sampler threads write a snapshot, the control loop reads one per tick.

use std::sync::{Arc, Mutex};

/// Battery state: fill ratio plus external power flag.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatteryReading {
    pub ratio: f64,
    pub plugged: bool,
}

/// One coherent set of normalized metric values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricSnapshot {
    /// Per-core CPU load, one entry per physical core.
    pub cpu: Vec<f64>,
    /// Memory usage ratio.
    pub memory: f64,
    pub battery: BatteryReading,
    /// Disk read activity relative to the observed maximum.
    pub disk_read: f64,
    /// Disk write activity relative to the observed maximum.
    pub disk_write: f64,
    /// Network upload activity relative to the observed maximum.
    pub net_up: f64,
    /// Network download activity relative to the observed maximum.
    pub net_down: f64,
    /// Temperature samples relative to a reference maximum.
    pub temperatures: Vec<f64>,
    /// Fan speeds relative to a reference maximum.
    pub fans: Vec<f64>,
}

/// Source of metric snapshots, read once per tick by the control loop.
pub trait MetricSource: Send {
    fn snapshot(&self) -> MetricSnapshot;
}

/// Snapshot storage shared between sampler threads and the control loop.
#[derive(Debug, Clone, Default)]
pub struct SharedMetrics {
    inner: Arc<Mutex<MetricSnapshot>>,
}

impl SharedMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot. Called by sampler threads.
    pub fn update(&self, snapshot: MetricSnapshot) {
        match self.inner.lock() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

impl MetricSource for SharedMetrics {
    fn snapshot(&self) -> MetricSnapshot {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
