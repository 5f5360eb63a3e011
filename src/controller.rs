//! Convergence controller
//!
//! The main polling loop. Polls on a fixed interval, shows failures with an
//! escalating marker, and stops once the aggregator reports the gap closed.
//!
//! States:
//! - `Polling` → fetch succeeded, gap still open (or not yet known)
//! - `ErrorBackoff` → fetch failed, wait out the tick and poll again
//! - `Converged` → gap ≤ 0, terminal

use crate::display::{StatusLine, StatusSink};
use crate::error::{AppError, AppResult, FetchError};
use crate::fetcher::Fetcher;
use crate::state::Snapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Short pause after a failure so the error line gets drawn
const ERROR_PAUSE: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Polling,
    ErrorBackoff,
    Converged,
}

/// How a finished run ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunOutcome {
    /// Gap closed; carries the final snapshot
    Converged(Snapshot),
}

pub struct Controller {
    fetcher: Fetcher,
    snapshots: watch::Receiver<Snapshot>,
    status: Arc<dyn StatusSink>,
    interval: Duration,
    max_failures: Option<u32>,
    state: ControllerState,
    failures: u32,
    consecutive_failures: u32,
    published: u64,
    polls: u64,
}

impl Controller {
    pub fn new(
        fetcher: Fetcher,
        snapshots: watch::Receiver<Snapshot>,
        status: Arc<dyn StatusSink>,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            snapshots,
            status,
            interval,
            max_failures: None,
            state: ControllerState::Polling,
            failures: 0,
            consecutive_failures: 0,
            published: 0,
            polls: 0,
        }
    }

    /// Give up after this many failed polls in a row
    ///
    /// Without a limit the controller retries forever.
    pub fn with_max_failures(mut self, max_failures: Option<u32>) -> Self {
        self.max_failures = max_failures;
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Failed polls so far; never reset
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Polls attempted so far
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Poll until the node has caught up
    ///
    /// Never returns if the endpoint never reports a known checkpoint and no
    /// failure limit is set.
    pub async fn run(&mut self) -> AppResult<RunOutcome> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; poll right away
        ticker.tick().await;

        tracing::info!(
            url = %self.fetcher.url(),
            interval_ms = self.interval.as_millis() as u64,
            "Watching checkpoint gauges"
        );

        loop {
            if let Some(snapshot) = self.step().await? {
                self.transition(ControllerState::Converged);
                self.status.show(&StatusLine::CaughtUp);
                self.status.finish();
                tracing::info!(
                    checkpoint = snapshot.synced_value,
                    polls = self.polls,
                    failures = self.failures,
                    "Node caught up"
                );
                return Ok(RunOutcome::Converged(snapshot));
            }

            ticker.tick().await;
        }
    }

    /// One poll plus its convergence check
    ///
    /// Returns the converged snapshot once the gap has closed.
    async fn step(&mut self) -> AppResult<Option<Snapshot>> {
        self.polls += 1;

        match self.fetcher.poll().await {
            Ok(samples) => {
                self.consecutive_failures = 0;
                self.published += samples.len() as u64;
                self.transition(ControllerState::Polling);

                let snapshot = self.wait_for_aggregator().await?;
                if snapshot.known_observed() && snapshot.has_converged() {
                    return Ok(Some(snapshot));
                }
                Ok(None)
            }
            Err(FetchError::AggregatorClosed) => Err(AppError::Internal(
                "aggregator stopped before the node caught up".to_string(),
            )),
            Err(err) => {
                self.failures += 1;
                self.consecutive_failures += 1;
                self.transition(ControllerState::ErrorBackoff);

                tracing::debug!(
                    error = %err,
                    failures = self.failures,
                    consecutive_failures = self.consecutive_failures,
                    "Poll failed"
                );
                self.status.show(&StatusLine::FetchFailed {
                    error: err.to_string(),
                    failures: self.failures,
                });

                if let Some(limit) = self.max_failures
                    && self.consecutive_failures >= limit
                {
                    self.status.finish();
                    return Err(AppError::FailureLimit {
                        failures: self.consecutive_failures,
                        last_error: err.to_string(),
                    });
                }

                tokio::time::sleep(ERROR_PAUSE).await;
                Ok(None)
            }
        }
    }

    /// Wait until every sample published so far has been applied
    async fn wait_for_aggregator(&mut self) -> AppResult<Snapshot> {
        let published = self.published;
        let snapshot = self
            .snapshots
            .wait_for(|s| s.applied >= published)
            .await
            .map_err(|_| {
                AppError::Internal("aggregator stopped before the node caught up".to_string())
            })?;
        Ok(*snapshot)
    }

    fn transition(&mut self, next: ControllerState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "Controller state change");
            self.state = next;
        }
    }
}
