//! Command-line interface definitions.
//!
//! This module defines the CLI structure using `clap` derive macros.
//! All CLI commands are defined here and parsed automatically by clap.

use clap::{Parser, Subcommand};

use crate::session::DEFAULT_INTERVAL;

/// Main CLI structure for the chain balance checker.
#[derive(Parser, Debug)]
#[command(
    name = "chain-balance",
    version,
    about = "Wallet balance checker for EVM chains and Solana"
)]
pub struct Cli {
    /// Timeout for each RPC request, in seconds
    #[arg(
        long,
        global = true,
        env = "CHAIN_BALANCE_RPC_TIMEOUT",
        default_value_t = 15
    )]
    pub rpc_timeout: u64,
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
///
/// - `Check`: one-time balance query across all configured networks
/// - `Monitor`: interactive session with recurring checks and alerts
/// - `Networks`: list the configured networks and their selection keys
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query the balance of an address on every configured network
    #[command(after_help = "Examples:\n  \
        chain-balance check 0x123...                  # Check all networks\n  \
        chain-balance check --evm-only 0x123...       # Check only EVM chains\n  \
        chain-balance check --solana-only Gh7...      # Check only Solana networks\n  \
        chain-balance check --no-testnets 0x123...    # Exclude testnets")]
    Check {
        /// Wallet address (EVM hex or Solana base58)
        address: Option<String>,
        /// Check only EVM chains
        #[arg(long, conflicts_with = "solana_only")]
        evm_only: bool,
        /// Check only Solana networks
        #[arg(long)]
        solana_only: bool,
        /// Exclude testnets
        #[arg(long)]
        no_testnets: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive balance monitor for one network
    Monitor {
        /// Network key to start on (see `networks`), defaults to the first EVM chain
        #[arg(long)]
        network: Option<String>,
        /// Wallet address to preload
        #[arg(long)]
        address: Option<String>,
        /// Low balance alert threshold, in the network's native unit
        #[arg(long)]
        threshold: Option<String>,
        /// Polling interval in seconds
        #[arg(
            long,
            default_value_t = DEFAULT_INTERVAL.as_secs(),
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        interval: u64,
    },
    /// List configured networks
    Networks {
        /// Hide testnets
        #[arg(long)]
        no_testnets: bool,
    },
}
