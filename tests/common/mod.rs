//! Shared helpers for integration tests

#![allow(dead_code)]

use catchup::display::{StatusLine, StatusSink};
use catchup::sample::{KNOWN_METRIC, SYNCED_METRIC};
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Status sink that remembers every line it was asked to show
#[derive(Default)]
pub struct Recorder {
    lines: Mutex<Vec<StatusLine>>,
    finished: AtomicUsize,
}

impl Recorder {
    pub fn lines(&self) -> Vec<StatusLine> {
        self.lines.lock().unwrap().clone()
    }

    pub fn rendered(&self) -> Vec<String> {
        self.lines().iter().map(ToString::to_string).collect()
    }

    pub fn count(&self, wanted: &StatusLine) -> usize {
        self.lines().iter().filter(|line| *line == wanted).count()
    }

    pub fn finish_calls(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl StatusSink for Recorder {
    fn show(&self, line: &StatusLine) {
        self.lines.lock().unwrap().push(line.clone());
    }

    fn finish(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Render a scrape body the way a node's Prometheus registry would
///
/// Each gauge is only registered when a value is given, so `None` produces
/// a payload without that family.
pub fn exposition(known: Option<f64>, synced: Option<f64>) -> String {
    let registry = Registry::new();

    for (name, help, value) in [
        (KNOWN_METRIC, "Highest known checkpoint", known),
        (SYNCED_METRIC, "Highest synced checkpoint", synced),
    ] {
        if let Some(value) = value {
            let gauge = prometheus::Gauge::new(name, help).expect("valid gauge");
            gauge.set(value);
            registry.register(Box::new(gauge)).expect("register gauge");
        }
    }

    // Unrelated series every node exposes alongside the checkpoints
    let uptime = IntCounter::new("uptime_seconds_total", "Process uptime").expect("valid counter");
    uptime.inc_by(3600);
    registry.register(Box::new(uptime)).expect("register counter");

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .expect("encode metrics");
    String::from_utf8(buffer).expect("text format is utf-8")
}
