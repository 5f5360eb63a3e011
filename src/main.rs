//! catchup command-line entry point
//!
//! Wires the fetcher, aggregator and controller together and runs until the
//! watched node has caught up.

use catchup::aggregator::{Aggregator, sample_channel};
use catchup::cli::{Cli, Command, generate_config_template};
use catchup::config::Config;
use catchup::controller::{Controller, RunOutcome};
use catchup::fetcher::Fetcher;
use catchup::{display, telemetry};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = &cli.command {
        let template = generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(path, template)?;
                println!("Wrote configuration template to {}", path.display());
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    // Load configuration
    let config = match Config::load(cli.config.as_deref(), cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            telemetry::init("warn");
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    // Initialize telemetry
    telemetry::init(&config.observability.log_level);

    let status = display::stdout_sink();

    let (samples_tx, samples_rx) = sample_channel();
    let (aggregator, snapshots) =
        Aggregator::new(samples_rx, status.clone(), config.target.interval_seconds);
    let _aggregator = aggregator.spawn();

    let fetcher = Fetcher::new(config.target.addr.clone(), samples_tx)?;
    let mut controller = Controller::new(fetcher, snapshots, status, config.target.interval())
        .with_max_failures(config.target.max_failures);

    match controller.run().await {
        Ok(RunOutcome::Converged(snapshot)) => {
            tracing::debug!(checkpoint = snapshot.synced_value, "Exiting after catch-up");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Stopped watching");
            Err(e.into())
        }
    }
}
