//! Batch balance report.
//!
//! Queries every selected network once, strictly one after another, and
//! collects the results into a [`Report`]. Failures on individual networks
//! are part of the report, never an error of the run.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::balance::{BalanceResult, query_balance};
use crate::networks::Registry;
use crate::rpc::ChainRpc;

/// Which networks a batch run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub include_testnets: bool,
    pub evm_only: bool,
    pub solana_only: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            include_testnets: true,
            evm_only: false,
            solana_only: false,
        }
    }
}

/// Results of one batch run, in registry order.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub address: String,
    pub include_testnets: bool,
    pub evm: Vec<BalanceResult>,
    pub solana: Vec<BalanceResult>,
    /// Number of results with a balance above zero.
    pub non_zero: usize,
}

impl Report {
    /// All results, EVM first.
    pub fn results(&self) -> impl Iterator<Item = &BalanceResult> {
        self.evm.iter().chain(self.solana.iter())
    }

    /// Renders the report the way the `check` command prints it.
    pub fn render(&self, options: BatchOptions) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Checking balances for address: {}", self.address);
        let _ = writeln!(
            out,
            "Include testnets: {}",
            if self.include_testnets { "Yes" } else { "No" }
        );

        if !options.solana_only {
            let _ = writeln!(out, "\nEVM Balances:");
            for result in &self.evm {
                let _ = writeln!(out, "  {result}");
            }
        }
        if !options.evm_only {
            let _ = writeln!(out, "\nSolana Balances:");
            for result in &self.solana {
                let _ = writeln!(out, "  {result}");
            }
        }

        let _ = writeln!(out, "\nSummary:");
        let _ = writeln!(
            out,
            "Found {} non-zero balances across all chains.",
            self.non_zero
        );
        out
    }
}

/// Queries `address` on every network selected by `options`.
pub async fn run_batch(
    rpc: &dyn ChainRpc,
    registry: &Registry,
    address: &str,
    options: BatchOptions,
) -> Report {
    log::info!(
        "Batch run started address={} include_testnets={} evm_only={} solana_only={}",
        address,
        options.include_testnets,
        options.evm_only,
        options.solana_only
    );

    let mut evm = Vec::new();
    if !options.solana_only {
        for network in registry.evm(options.include_testnets) {
            log::info!("Checking {}...", network.name);
            let result = query_balance(rpc, address, network).await;
            log::debug!("Checked network={} ok={}", result.network(), result.is_ok());
            evm.push(result);
        }
    }

    let mut solana = Vec::new();
    if !options.evm_only {
        for network in registry.solana(options.include_testnets) {
            log::info!("Checking {}...", network.name);
            let result = query_balance(rpc, address, network).await;
            log::debug!("Checked network={} ok={}", result.network(), result.is_ok());
            solana.push(result);
        }
    }

    let mut report = Report {
        address: address.to_string(),
        include_testnets: options.include_testnets,
        evm,
        solana,
        non_zero: 0,
    };
    report.non_zero = report
        .results()
        .filter(|r| r.amount().is_some_and(|a| a > Decimal::ZERO))
        .count();

    log::info!(
        "Batch run finished address={} checked={} non_zero={}",
        address,
        report.results().count(),
        report.non_zero
    );
    report
}
