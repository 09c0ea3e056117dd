//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Event Publisher - bounded, drop-on-overload event publishing
#[derive(Parser, Debug)]
#[command(
    name = "event-publisher",
    author,
    version,
    about = "Publish events to a broker through a bounded worker pool",
    long_about = "Publishes events to a message broker without ever blocking the caller.\n\n\
                  Messages are handed to a shared, bounded worker pool; when the pool \n\
                  and its backlog are saturated, messages are dropped and reported."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "EVENT_PUBLISHER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "EVENT_PUBLISHER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish messages through one configured adapter
    Publish(PublishArgs),

    /// Validate configuration file without publishing
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `publish` command
#[derive(Parser, Debug, Clone)]
pub struct PublishArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "publisher.toml",
        env = "EVENT_PUBLISHER_CONFIG"
    )]
    pub config: PathBuf,

    /// Adapter to publish through (defaults to the first configured adapter)
    #[arg(short, long, env = "EVENT_PUBLISHER_ADAPTER")]
    pub adapter: Option<String>,

    /// Destination (topic) for every message
    #[arg(short, long, env = "EVENT_PUBLISHER_DESTINATION")]
    pub destination: String,

    /// Message payloads; read one per line from stdin when omitted
    pub messages: Vec<String>,

    /// Publish every message this many times
    #[arg(long, default_value = "1")]
    pub repeat: u64,

    /// Seconds to wait for queued messages before exiting (0 = do not wait)
    #[arg(long, default_value = "10", env = "EVENT_PUBLISHER_DRAIN_TIMEOUT")]
    pub drain_timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "EVENT_PUBLISHER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "publisher.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "publisher.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the resolved client properties of each adapter
    #[arg(long)]
    pub properties: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_publish_args_parsed() {
        let cli = Cli::try_parse_from([
            "event-publisher",
            "-v",
            "publish",
            "--config",
            "custom.toml",
            "--adapter",
            "orders",
            "-d",
            "orders.created",
            "--repeat",
            "3",
            "first",
            "second",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Publish(args) = cli.command else {
            panic!("expected publish command");
        };
        assert_eq!(args.config, PathBuf::from("custom.toml"));
        assert_eq!(args.adapter.as_deref(), Some("orders"));
        assert_eq!(args.destination, "orders.created");
        assert_eq!(args.messages, vec!["first", "second"]);
        assert_eq!(args.repeat, 3);
        assert_eq!(args.drain_timeout, 10);
        assert_eq!(args.metrics_port, 0);
    }

    #[test]
    fn test_publish_requires_destination() {
        let result = Cli::try_parse_from(["event-publisher", "publish", "payload"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["event-publisher", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_info_flags() {
        let cli = Cli::try_parse_from(["event-publisher", "info", "--json", "--properties"])
            .unwrap();
        let Commands::Info(args) = cli.command else {
            panic!("expected info command");
        };
        assert!(args.json);
        assert!(args.properties);
        assert_eq!(args.config, PathBuf::from("publisher.toml"));
    }
}
