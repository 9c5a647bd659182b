//! Single balance lookup.
//!
//! [`query_balance`] validates an address for a network, asks the node for
//! the native balance once and normalizes the answer into a [`BalanceResult`].
//! It never fails: every problem ends up as [`BalanceResult::Err`].

use std::fmt;

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::address::{ChainAddress, ChainFamily};
use crate::error::QueryError;
use crate::networks::{NetworkDescriptor, NetworkId};
use crate::rpc::ChainRpc;

/// Outcome of one balance query on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BalanceResult {
    Ok {
        network: String,
        symbol: String,
        amount: Decimal,
        is_testnet: bool,
    },
    Err {
        network: String,
        symbol: String,
        reason: String,
        is_testnet: bool,
    },
}

impl BalanceResult {
    fn ok(network: &NetworkDescriptor, amount: Decimal) -> Self {
        BalanceResult::Ok {
            network: network.name.clone(),
            symbol: network.symbol.clone(),
            amount,
            is_testnet: network.is_testnet,
        }
    }

    fn err(network: &NetworkDescriptor, error: QueryError) -> Self {
        BalanceResult::Err {
            network: network.name.clone(),
            symbol: network.symbol.clone(),
            reason: error.to_string(),
            is_testnet: network.is_testnet,
        }
    }

    pub fn network(&self) -> &str {
        match self {
            BalanceResult::Ok { network, .. } | BalanceResult::Err { network, .. } => network,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            BalanceResult::Ok { symbol, .. } | BalanceResult::Err { symbol, .. } => symbol,
        }
    }

    /// The balance, for successful results.
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            BalanceResult::Ok { amount, .. } => Some(*amount),
            BalanceResult::Err { .. } => None,
        }
    }

    /// The failure reason, for failed results.
    pub fn reason(&self) -> Option<&str> {
        match self {
            BalanceResult::Ok { .. } => None,
            BalanceResult::Err { reason, .. } => Some(reason),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, BalanceResult::Ok { .. })
    }
}

impl fmt::Display for BalanceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceResult::Ok {
                network,
                symbol,
                amount,
                is_testnet,
            } => {
                write!(f, "{network}: {} {symbol}", amount.normalize())?;
                if *is_testnet {
                    f.write_str(" (testnet)")?;
                }
                Ok(())
            }
            BalanceResult::Err { network, reason, .. } => {
                write!(f, "{network}: Error - {reason}")
            }
        }
    }
}

/// Queries the native balance of `address` on `network`.
///
/// Invalid addresses are rejected before any request is made. EVM endpoints
/// are first asked for their chain id, which must match the descriptor, then
/// for the balance. No retries, no caching.
pub async fn query_balance(
    rpc: &dyn ChainRpc,
    address: &str,
    network: &NetworkDescriptor,
) -> BalanceResult {
    log::debug!(
        "Querying balance network={} id={} address={}",
        network.name,
        network.id,
        address
    );

    match fetch_amount(rpc, address, network).await {
        Ok(amount) => {
            log::info!(
                "Balance fetched network={} address={} amount={}",
                network.name,
                address,
                amount
            );
            BalanceResult::ok(network, amount)
        }
        Err(e) => {
            log::warn!("Balance query failed network={} address={}: {}", network.name, address, e);
            BalanceResult::err(network, e)
        }
    }
}

async fn fetch_amount(
    rpc: &dyn ChainRpc,
    address: &str,
    network: &NetworkDescriptor,
) -> Result<Decimal, QueryError> {
    let family = network.family();
    let parsed = family.parse_address(address)?;

    let smallest_units: u128 = match (parsed, &network.id) {
        (ChainAddress::Evm(address), NetworkId::Evm(expected)) => {
            let actual = rpc
                .evm_chain_id(&network.endpoint)
                .await
                .map_err(QueryError::Transport)?;
            if actual != *expected {
                return Err(QueryError::Transport(format!(
                    "network mismatch: expected chain id {expected}, got {actual}"
                )));
            }
            let wei = rpc
                .evm_balance(&network.endpoint, address)
                .await
                .map_err(QueryError::Transport)?;
            u256_to_u128(wei)?
        }
        (ChainAddress::Solana(pubkey), NetworkId::Solana(_)) => rpc
            .solana_balance(&network.endpoint, pubkey)
            .await
            .map_err(QueryError::Transport)?
            .into(),
        // parse_address follows the network's family, so the pairs always line up
        _ => return Err(QueryError::InvalidAddress),
    };

    to_display_units(smallest_units, family)
}

fn u256_to_u128(value: U256) -> Result<u128, QueryError> {
    u128::try_from(value).map_err(|_| QueryError::Transport("balance out of range".to_string()))
}

/// Converts an integer amount of the family's smallest unit into its display unit.
pub fn to_display_units(smallest_units: u128, family: ChainFamily) -> Result<Decimal, QueryError> {
    let out_of_range = || QueryError::Transport("balance out of range".to_string());
    let value = i128::try_from(smallest_units).map_err(|_| out_of_range())?;
    Decimal::try_from_i128_with_scale(value, family.decimals()).map_err(|_| out_of_range())
}
