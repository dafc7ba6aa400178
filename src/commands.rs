//! CLI command definitions
//!
//! Defines the clap commands for the apiflow CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file (default: $APIFLOW_CONFIG, ./config/config.yaml, ./config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Test-data file (default: $APIFLOW_DATA, or test_data_file from the config)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Also write detailed logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run flow files
    Test {
        /// Flow files, directories, or file::test-id
        #[arg(required = true)]
        targets: Vec<String>,

        /// Only run tests with this marker (repeatable: -m p0 -m flow)
        #[arg(long = "marker", short = 'm')]
        markers: Vec<String>,

        /// Write a JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Read the configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Inspect or edit the persisted test data
    #[command(subcommand)]
    Data(DataCommands),

    /// Log in and cache the token
    Login {
        /// Log in even if a cached token exists
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the value at a dotted path
    Get {
        /// Dotted path, e.g. environments.api_base_url
        path: String,
    },
}

#[derive(Subcommand)]
pub enum DataCommands {
    /// Print the value at a dotted path
    Get {
        /// Dotted path, e.g. test_context.user_id
        path: String,
    },

    /// Write a value (parsed as YAML: 42, true, "text", {a: 1})
    Set {
        /// Dotted path
        path: String,

        /// Value
        value: String,
    },

    /// Clear all test data, or one subtree
    Reset {
        /// Subtree to clear
        scope: Option<String>,
    },
}
