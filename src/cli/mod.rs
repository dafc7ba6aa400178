//! CLI command handling
//!
//! Dispatches CLI commands and formats output. Each handler returns whether
//! the command succeeded; `main` turns `false` into a non-zero exit code.

use colored::Colorize;
use serde_yaml::Value;

use crate::commands::{Commands, ConfigCommands, DataCommands, GlobalArgs};
use crate::common::Result;
use crate::context::{open_config, open_data, RunContext};
use crate::testing::{run_targets, RunOptions};

/// Dispatch a CLI command
pub async fn dispatch(global: &GlobalArgs, command: Commands) -> Result<bool> {
    match command {
        Commands::Test {
            targets,
            markers,
            report,
            verbose,
        } => {
            let mut ctx = RunContext::from_config(global.config.as_deref(), global.data.as_deref())?;
            let options = RunOptions { markers, verbose };

            let run = run_targets(&mut ctx, &targets, &options).await?;

            if let Some(path) = report {
                run.write_json(&path)?;
                println!("Report written to {}", path.display());
            }

            if run.total == 0 {
                println!("{}", "No tests selected".yellow());
            }

            Ok(run.success())
        }

        Commands::Config(ConfigCommands::Get { path }) => {
            let config = open_config(global.config.as_deref())?;
            Ok(print_value(&path, config.get(&path)))
        }

        Commands::Data(data_cmd) => {
            let config = open_config(global.config.as_deref())?;
            let mut data = open_data(&config, global.data.as_deref())?;

            match data_cmd {
                DataCommands::Get { path } => Ok(print_value(&path, data.get(&path))),

                DataCommands::Set { path, value } => {
                    let parsed: Value = serde_yaml::from_str(&value)
                        .unwrap_or_else(|_| Value::String(value.clone()));
                    data.set(&path, parsed)?;
                    println!("Set {} in {}", path, data.path().display());
                    Ok(true)
                }

                DataCommands::Reset { scope } => {
                    data.reset(scope.as_deref())?;
                    match scope {
                        Some(scope) => println!("Cleared {} in {}", scope, data.path().display()),
                        None => println!("Cleared {}", data.path().display()),
                    }
                    Ok(true)
                }
            }
        }

        Commands::Login { force } => {
            let mut ctx = RunContext::from_config(global.config.as_deref(), global.data.as_deref())?;
            ctx.get_token(force).await?;
            println!(
                "{} Logged in, token cached in {}",
                "✓".green(),
                ctx.data().path().display()
            );
            Ok(true)
        }
    }
}

/// Print a looked-up value; returns false when it is missing
fn print_value(path: &str, value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => {
            println!("{}", s);
            true
        }
        Some(v) => {
            let text = serde_yaml::to_string(v).unwrap_or_default();
            println!("{}", text.trim_end());
            true
        }
        None => {
            eprintln!("'{}' is not set", path);
            false
        }
    }
}
