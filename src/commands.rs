//! Command execution logic.
//!
//! This module contains the execution logic for all CLI commands:
//! - One-time balance report across networks
//! - Interactive monitoring session
//! - Network listing

use std::sync::Arc;
use std::time::Duration;

use clap::CommandFactory;

use crate::batch::{self, BatchOptions};
use crate::cli::{Cli, Commands};
use crate::error::AppError;
use crate::interactive::{self, MonitorOptions};
use crate::networks::Registry;
use crate::rpc::RpcClient;
use crate::utils;

/// Executes the CLI command specified in the parsed arguments.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, the interactive
/// monitor is started with an unknown network or threshold, or stdin/stdout
/// fail. Balance lookups themselves never produce an error here; failed
/// networks are part of the printed report.
pub async fn run(cli: Cli) -> Result<(), AppError> {
    let registry = Registry::from_env();
    let rpc = RpcClient::new(Duration::from_secs(cli.rpc_timeout))?;

    match cli.command {
        Commands::Check {
            address,
            evm_only,
            solana_only,
            no_testnets,
            json,
        } => {
            let Some(address) = address.filter(|a| !a.trim().is_empty()) else {
                return print_usage();
            };
            let options = BatchOptions {
                include_testnets: !no_testnets,
                evm_only,
                solana_only,
            };
            let report = batch::run_batch(&rpc, &registry, address.trim(), options).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render(options));
            }
        }
        Commands::Monitor {
            network,
            address,
            threshold,
            interval,
        } => {
            let threshold = threshold.as_deref().map(utils::parse_threshold).transpose()?;
            let options = MonitorOptions {
                network,
                address,
                threshold,
                interval: Duration::from_secs(interval),
            };
            interactive::run(Arc::new(rpc), registry, options).await?;
        }
        Commands::Networks { no_testnets } => {
            for network in registry.all(!no_testnets) {
                println!("{}", interactive::describe_network(network));
            }
        }
    }
    Ok(())
}

/// A missing address is a user input error: show usage and stop the run
/// without failing the process.
fn print_usage() -> Result<(), AppError> {
    log::warn!("Check requested without an address");
    let mut command = Cli::command();
    command.build();
    match command.find_subcommand_mut("check") {
        Some(check) => check.print_help()?,
        None => command.print_help()?,
    }
    eprintln!("\nError: {}", AppError::NoAddressProvided);
    Ok(())
}
