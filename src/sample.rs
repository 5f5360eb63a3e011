//! Gauge samples scraped from the metrics endpoint

use std::fmt;

/// Metric family carrying the highest checkpoint the node knows about
pub const KNOWN_METRIC: &str = "highest_known_checkpoint";

/// Metric family carrying the highest checkpoint the node has synced
pub const SYNCED_METRIC: &str = "highest_synced_checkpoint";

/// The two gauges catchup watches
///
/// Restricting this to an enum keeps unknown metric names out of the
/// aggregator entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gauge {
    /// `highest_known_checkpoint`
    Known,
    /// `highest_synced_checkpoint`
    Synced,
}

impl Gauge {
    /// Both gauges, in the order a poll publishes them
    pub const ALL: [Gauge; 2] = [Gauge::Known, Gauge::Synced];

    /// Metric family name as exposed by the endpoint
    pub fn metric_name(&self) -> &'static str {
        match self {
            Gauge::Known => KNOWN_METRIC,
            Gauge::Synced => SYNCED_METRIC,
        }
    }

    /// Look up a gauge by metric family name
    pub fn from_metric_name(name: &str) -> Option<Self> {
        match name {
            KNOWN_METRIC => Some(Gauge::Known),
            SYNCED_METRIC => Some(Gauge::Synced),
            _ => None,
        }
    }
}

impl fmt::Display for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metric_name())
    }
}

/// One reading of one gauge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub gauge: Gauge,
    pub value: f64,
}

impl Sample {
    pub fn new(gauge: Gauge, value: f64) -> Self {
        Self { gauge, value }
    }

    pub fn known(value: f64) -> Self {
        Self::new(Gauge::Known, value)
    }

    pub fn synced(value: f64) -> Self {
        Self::new(Gauge::Synced, value)
    }
}
