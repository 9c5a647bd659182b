//! Chain Balance
//!
//! A lightweight Rust application for checking native wallet balances across
//! EVM chains and Solana.
//!
//! # Features
//!
//! - **Check Mode**: Query one address on every configured network and print a report
//! - **Monitor Mode**: Interactive session with recurring checks, change and
//!   low-balance alerts
//! - **Networks**: List the configured networks and their selection keys
//!
//! # Usage
//!
//! ```bash
//! # Check all networks
//! chain-balance check 0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045
//!
//! # Mainnet Solana only
//! chain-balance check --solana-only --no-testnets So11111111111111111111111111111111111111112
//!
//! # Monitor an account on Base every 30s
//! export BASE_RPC="https://mainnet.base.org"
//! chain-balance monitor --network 8453 --address 0xd8dA... --threshold 0.1
//! ```

mod address;
mod balance;
mod batch;
mod cli;
mod commands;
mod error;
mod interactive;
mod monitor;
mod networks;
mod rpc;
mod scheduler;
mod session;
mod utils;

use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();
    log::info!("Application started version={}", env!("CARGO_PKG_VERSION"));
    let cli = Cli::parse();

    if let Err(e) = commands::run(cli).await {
        log::error!("Application error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
