//! catchup - watch a node catch up to the network
//!
//! Polls a Prometheus metrics endpoint for the highest known and highest
//! synced checkpoint, shows the gap and how fast it is closing, and stops
//! once the node has caught up.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod display;
pub mod error;
pub mod fetcher;
pub mod sample;
pub mod state;
pub mod telemetry;
