//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full order/shipment/payment workload until interrupted
    Load {
        /// Seed tenants that have no customers or inventory before starting
        #[arg(long)]
        seed: bool,
    },

    /// Run the aggregation-only workload until interrupted
    Read,

    /// Insert customers and inventory for every configured tenant
    Seed {
        /// Customers per tenant
        #[arg(long, value_name = "N", default_value_t = 100)]
        customers: usize,

        /// Inventory items per tenant
        #[arg(long, value_name = "N", default_value_t = 200)]
        inventory: usize,
    },

    /// Relay broker messages into the document store in batches
    Relay {
        /// Feed the relay from an in-process producer instead of Kafka
        #[arg(long)]
        in_process: bool,
    },

    /// Publish synthetic tenant documents to the broker
    Produce,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file; defaults to --config or the environment
        #[arg(long, value_name = "PATH")]
        config_file: Option<PathBuf>,
    },

    /// Write a sample configuration file
    Sample {
        /// Output file path; prints to stdout when omitted
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },
}
