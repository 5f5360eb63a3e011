//! Background sample aggregator
//!
//! Drains samples from the fetcher, folds them into [`ConvergenceState`],
//! redraws the status line and publishes a [`Snapshot`] for the controller.
//! It is the only writer of the state, so no locking is involved: ordering
//! comes from the channel.

use crate::display::{StatusLine, StatusSink};
use crate::sample::Sample;
use crate::state::{ConvergenceState, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Room for one poll's worth of samples
pub const SAMPLE_CHANNEL_CAPACITY: usize = 2;

/// Pause after each redraw so the terminal can keep up
const REDRAW_PAUSE: Duration = Duration::from_millis(5);

/// Create the bounded sample channel between fetcher and aggregator
pub fn sample_channel() -> (mpsc::Sender<Sample>, mpsc::Receiver<Sample>) {
    mpsc::channel(SAMPLE_CHANNEL_CAPACITY)
}

pub struct Aggregator {
    state: ConvergenceState,
    samples: mpsc::Receiver<Sample>,
    snapshots: watch::Sender<Snapshot>,
    status: Arc<dyn StatusSink>,
    interval_secs: u64,
}

impl Aggregator {
    /// Create an aggregator and the receiver its snapshots are published on
    ///
    /// `interval_secs` is the polling interval, used to turn the change in
    /// gap between polls into a per-second rate.
    pub fn new(
        samples: mpsc::Receiver<Sample>,
        status: Arc<dyn StatusSink>,
        interval_secs: u64,
    ) -> (Self, watch::Receiver<Snapshot>) {
        let (snapshots, snapshot_rx) = watch::channel(Snapshot::default());
        let aggregator = Self {
            state: ConvergenceState::new(),
            samples,
            snapshots,
            status,
            interval_secs,
        };
        (aggregator, snapshot_rx)
    }

    /// Apply one sample, redraw, and publish the resulting snapshot
    ///
    /// Returns the line that was drawn, if both gauges are known yet.
    pub fn apply(&mut self, sample: Sample) -> Option<StatusLine> {
        let line = self.state.apply(sample).map(|progress| StatusLine::Progress {
            gap: progress.gap,
            rate: progress.rate,
            interval_secs: self.interval_secs,
        });

        if let Some(line) = &line {
            self.status.show(line);
        }

        // Draw before publishing so a converged controller always gets the
        // last word on the status line.
        self.snapshots.send_replace(self.state.snapshot());
        line
    }

    /// Process samples until the sending side is dropped
    pub async fn run(mut self) {
        tracing::debug!(interval_secs = self.interval_secs, "Aggregator started");

        while let Some(sample) = self.samples.recv().await {
            tracing::trace!(gauge = %sample.gauge, value = sample.value, "Sample received");
            if self.apply(sample).is_some() {
                tokio::time::sleep(REDRAW_PAUSE).await;
            }
        }

        tracing::debug!(
            applied = self.state.snapshot().applied,
            "Sample channel closed, aggregator stopping"
        );
    }

    /// Run on a background tokio task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
