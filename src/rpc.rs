//! JSON-RPC client for EVM and Solana endpoints.
//!
//! This module provides the narrow interface the balance query needs from a
//! chain node ([`ChainRpc`]) and a `reqwest`-based implementation of it
//! ([`RpcClient`]). Only three read-only methods are used:
//!
//! - `eth_chainId`: liveness check and network identity for EVM endpoints
//! - `eth_getBalance`: native balance in wei
//! - `getBalance`: Solana balance in lamports
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use chain_balance::rpc::{ChainRpc, RpcClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let client = RpcClient::new(Duration::from_secs(15)).map_err(|e| e.to_string())?;
//!     let chain_id = client.evm_chain_id("https://mainnet.base.org").await?;
//!     println!("chain id: {chain_id}");
//!     Ok(())
//! }
//! ```

use std::time::{Duration, Instant};

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::address::SolanaPubkey;

/// Read-only node operations needed to look up a native balance.
///
/// Errors are human-readable messages; the caller turns them into
/// [`crate::balance::BalanceResult::Err`] values.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Returns the chain id reported by an EVM endpoint.
    async fn evm_chain_id(&self, endpoint: &str) -> Result<u64, String>;

    /// Returns the latest native balance of `address` in wei.
    async fn evm_balance(&self, endpoint: &str, address: Address) -> Result<U256, String>;

    /// Returns the balance of `pubkey` in lamports.
    async fn solana_balance(&self, endpoint: &str, pubkey: SolanaPubkey) -> Result<u64, String>;
}

/// JSON-RPC request structure.
#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

/// JSON-RPC response structure.
#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize, Debug)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Result of Solana `getBalance`, wrapped in an RPC context.
#[derive(Deserialize)]
struct SolanaBalance {
    value: u64,
}

/// HTTP JSON-RPC client shared by all networks.
pub struct RpcClient {
    /// Internal HTTP client for making requests.
    client: reqwest::Client,
}

impl RpcClient {
    /// Creates a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, String> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                log::error!("RPC request failed method={} endpoint={}: {}", method, endpoint, e);
                format!("HTTP request failed: {e}")
            })?;

        log::debug!(
            "RPC request completed method={} endpoint={} duration_ms={} status={:?}",
            method,
            endpoint,
            start.elapsed().as_millis(),
            response.status()
        );

        let status = response.status();
        if !status.is_success() {
            log::error!(
                "RPC endpoint returned error status method={} endpoint={} status={}",
                method,
                endpoint,
                status
            );
            return Err(format!("HTTP status {status}"));
        }

        let rpc_response: RpcResponse<T> = response.json().await.map_err(|e| {
            log::error!(
                "Failed to parse RPC response method={} endpoint={}: {}",
                method,
                endpoint,
                e
            );
            format!("Failed to parse response: {e}")
        })?;

        into_result(rpc_response, method)
    }
}

fn into_result<T>(response: RpcResponse<T>, method: &str) -> Result<T, String> {
    if let Some(error) = response.error {
        log::error!("RPC error method={}: {:?}", method, error);
        return Err(format!("RPC error {}: {}", error.code, error.message));
    }
    response.result.ok_or_else(|| {
        log::error!("No result in RPC response method={}", method);
        "No result in response".to_string()
    })
}

fn parse_quantity(quantity: &str) -> Result<u64, String> {
    let digits = quantity
        .strip_prefix("0x")
        .ok_or_else(|| format!("Malformed quantity: {quantity}"))?;
    u64::from_str_radix(digits, 16).map_err(|e| format!("Malformed quantity {quantity}: {e}"))
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn evm_chain_id(&self, endpoint: &str) -> Result<u64, String> {
        let quantity: String = self
            .call(endpoint, "eth_chainId", serde_json::json!([]))
            .await?;
        parse_quantity(&quantity)
    }

    async fn evm_balance(&self, endpoint: &str, address: Address) -> Result<U256, String> {
        log::debug!("Fetching EVM balance address={} endpoint={}", address, endpoint);
        self.call(endpoint, "eth_getBalance", serde_json::json!([address, "latest"]))
            .await
    }

    async fn solana_balance(&self, endpoint: &str, pubkey: SolanaPubkey) -> Result<u64, String> {
        log::debug!("Fetching Solana balance pubkey={} endpoint={}", pubkey, endpoint);
        let balance: SolanaBalance = self
            .call(
                endpoint,
                "getBalance",
                serde_json::json!([pubkey.to_string(), { "commitment": "confirmed" }]),
            )
            .await?;
        Ok(balance.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: DeserializeOwned>(body: &str) -> Result<T, String> {
        let response: RpcResponse<T> = serde_json::from_str(body).unwrap();
        into_result(response, "test")
    }

    #[test]
    fn evm_balance_is_decoded_from_hex_quantity() {
        let balance: U256 =
            parse(r#"{"jsonrpc":"2.0","id":1,"result":"0xde0b6b3a7640000"}"#).unwrap();
        assert_eq!(balance, U256::from(1_000_000_000_000_000_000u128));
    }

    #[test]
    fn solana_balance_is_read_from_context_value() {
        let balance: SolanaBalance = parse(
            r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":1500000000}}"#,
        )
        .unwrap();
        assert_eq!(balance.value, 1_500_000_000);
    }

    #[test]
    fn rpc_error_object_is_reported() {
        let err = parse::<String>(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"invalid params"}}"#,
        )
        .unwrap_err();
        assert_eq!(err, "RPC error -32602: invalid params");
    }

    #[test]
    fn missing_result_is_an_error() {
        let err = parse::<String>(r#"{"jsonrpc":"2.0","id":1}"#).unwrap_err();
        assert_eq!(err, "No result in response");
    }

    #[test]
    fn quantities_parse_as_hex() {
        assert_eq!(parse_quantity("0x2105"), Ok(8453));
        assert_eq!(parse_quantity("0x1"), Ok(1));
        assert!(parse_quantity("8453").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_reported_as_error() {
        let client = RpcClient::new(Duration::from_secs(2)).unwrap();
        let result = client.evm_chain_id("http://127.0.0.1:1").await;
        assert!(result.unwrap_err().starts_with("HTTP request failed"));
    }
}
