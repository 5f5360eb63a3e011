//! Command-line interface for catchup
//!
//! Provides argument parsing and subcommand handling for the catchup binary.

use crate::config::Overrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Watch a node's checkpoint gauges until it has caught up
#[derive(Parser)]
#[command(name = "catchup")]
#[command(version)]
#[command(about = "Watch a node's checkpoint gauges until it has caught up")]
#[command(
    long_about = "catchup polls a Prometheus metrics endpoint for highest_known_checkpoint \
    and highest_synced_checkpoint, shows how far behind the node is and how fast the gap \
    is closing, and exits once the node has caught up."
)]
pub struct Cli {
    /// Path to an optional configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Validator metrics address
    #[arg(long)]
    pub addr: Option<String>,

    /// How often to check, in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Give up after this many failed polls in a row (default: retry forever)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_failures: Option<u32>,

    /// Log level for diagnostics on stderr (RUST_LOG takes precedence)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Flags that override configuration file values
    pub fn overrides(&self) -> Overrides {
        Overrides {
            addr: self.addr.clone(),
            interval_seconds: self.interval,
            max_failures: self.max_failures,
            log_level: self.log_level.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# catchup configuration
# ======================
#
# Every setting is optional. Command-line flags override values set here.

# ─────────────────────────────────────────────────────────────────────────────
# TARGET
# ─────────────────────────────────────────────────────────────────────────────

[target]
# Metrics endpoint exposing highest_known_checkpoint and
# highest_synced_checkpoint in Prometheus text format
addr = "http://localhost:9187/metrics"

# Seconds between polls
interval_seconds = 1

# Stop with an error after this many failed polls in a row.
# Leave unset to keep retrying until interrupted.
# max_failures = 60

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level for diagnostics written to stderr:
# "trace", "debug", "info", "warn", "error"
log_level = "warn"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // Clap's built-in verification for the CLI structure
        Cli::command().debug_assert();
    }

    #[test]
    fn no_flags_override_nothing() {
        let cli = Cli::parse_from(["catchup"]);
        assert!(cli.config.is_none());
        assert!(cli.command.is_none());

        let overrides = cli.overrides();
        assert!(overrides.addr.is_none());
        assert!(overrides.interval_seconds.is_none());
        assert!(overrides.max_failures.is_none());
        assert!(overrides.log_level.is_none());
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::parse_from([
            "catchup",
            "--addr",
            "http://node:9184/metrics",
            "--interval",
            "5",
            "--max-failures",
            "10",
            "--log-level",
            "debug",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.addr.as_deref(), Some("http://node:9184/metrics"));
        assert_eq!(overrides.interval_seconds, Some(5));
        assert_eq!(overrides.max_failures, Some(10));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Cli::try_parse_from(["catchup", "--interval", "0"]).is_err());
    }

    #[test]
    fn zero_max_failures_is_rejected() {
        assert!(Cli::try_parse_from(["catchup", "--max-failures", "0"]).is_err());
    }

    #[test]
    fn custom_config_path() {
        let cli = Cli::parse_from(["catchup", "--config", "custom.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn config_subcommand_with_output() {
        let cli = Cli::parse_from(["catchup", "config", "-o", "catchup.toml"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config { output: Some(ref path) }) if path == &PathBuf::from("catchup.toml")
        ));
    }

    #[test]
    fn template_is_valid_config() {
        let template = generate_config_template();
        let config: crate::config::Config =
            template.parse().expect("template should be a valid config");
        assert_eq!(config, crate::config::Config::default());
    }

    #[test]
    fn template_has_all_sections() {
        let template = generate_config_template();
        assert!(template.contains("[target]"));
        assert!(template.contains("[observability]"));
    }
}
