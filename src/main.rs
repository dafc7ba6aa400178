//! apiflow - API test-automation harness
//!
//! Runs YAML flows against a backend, caching the login token and chaining
//! created IDs between steps through a persisted test-data file.

use apiflow::commands::{Commands, GlobalArgs};
use apiflow::{cli, common::logging};
use clap::Parser;

#[derive(Parser)]
#[command(name = "apiflow", about = "API test-automation harness")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Test { verbose: true, .. });
    let log_guard = logging::init_cli(verbose, cli.global.log_file.as_deref());

    let code = match cli::dispatch(&cli.global, cli.command).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_fatal() {
                2
            } else {
                1
            }
        }
    };

    drop(log_guard);
    std::process::exit(code);
}
