//! Convergence state
//!
//! `ConvergenceState` is owned by the aggregator task and is the only place
//! the two gauge values are written. Everything else sees a [`Snapshot`]
//! published after each update.

use crate::sample::{Gauge, Sample};

/// Gap and rate derived from one applied sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Checkpoints the node is behind (`known - synced`)
    pub gap: f64,
    /// Change in gap since the previous computation
    pub rate: f64,
}

/// Point-in-time copy of the convergence state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Snapshot {
    pub known_value: f64,
    pub synced_value: f64,
    /// Present once both gauges have been observed
    pub gap: Option<f64>,
    /// Number of samples applied so far
    pub applied: u64,
}

impl Snapshot {
    /// Whether a known checkpoint has ever been reported
    pub fn known_observed(&self) -> bool {
        self.known_value != 0.0
    }

    /// True once both gauges are known and the gap has closed
    pub fn has_converged(&self) -> bool {
        self.gap.is_some_and(|gap| gap <= 0.0)
    }
}

/// Latest gauge values plus the previous gap
///
/// A value of zero means "not observed yet"; a node legitimately reporting
/// checkpoint zero is indistinguishable from one that has reported nothing.
#[derive(Debug, Default)]
pub struct ConvergenceState {
    known_value: f64,
    synced_value: f64,
    last_gap: f64,
    applied: u64,
}

impl ConvergenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn known_value(&self) -> f64 {
        self.known_value
    }

    pub fn synced_value(&self) -> f64 {
        self.synced_value
    }

    pub fn last_gap(&self) -> f64 {
        self.last_gap
    }

    /// Apply one sample and recompute the gap
    ///
    /// Returns the new gap and rate when both gauges have been observed,
    /// `None` while only one of them is known.
    pub fn apply(&mut self, sample: Sample) -> Option<Progress> {
        match sample.gauge {
            Gauge::Known => self.known_value = sample.value,
            Gauge::Synced => self.synced_value = sample.value,
        }
        self.applied += 1;

        let gap = self.current_gap()?;
        let rate = gap - self.last_gap;
        self.last_gap = gap;
        Some(Progress { gap, rate })
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            known_value: self.known_value,
            synced_value: self.synced_value,
            gap: self.current_gap(),
            applied: self.applied,
        }
    }

    fn current_gap(&self) -> Option<f64> {
        if self.known_value != 0.0 && self.synced_value != 0.0 {
            Some(self.known_value - self.synced_value)
        } else {
            None
        }
    }
}
