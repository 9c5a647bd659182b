//! Address validation per chain family.
//!
//! Both front ends and the balance query go through [`ChainFamily::parse_address`],
//! so EVM and Solana address rules live in exactly one place.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::Serialize;

use crate::error::QueryError;

/// Decimal exponent of the EVM native unit (wei -> ETH).
pub const EVM_DECIMALS: u32 = 18;

/// Decimal exponent of SOL (lamports -> SOL).
pub const SOLANA_DECIMALS: u32 = 9;

/// Chain family, which decides address format and unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Evm,
    Solana,
}

/// A validated address of either family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainAddress {
    Evm(Address),
    Solana(SolanaPubkey),
}

/// 32-byte Solana public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolanaPubkey([u8; 32]);

impl fmt::Display for SolanaPubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl FromStr for SolanaPubkey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // base58 of 32 bytes is 32..=44 characters
        if !(32..=44).contains(&s.len()) {
            return Err(QueryError::InvalidAddress);
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| QueryError::InvalidAddress)?;
        let key: [u8; 32] = bytes.try_into().map_err(|_| QueryError::InvalidAddress)?;
        Ok(Self(key))
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFamily::Evm => f.write_str("EVM"),
            ChainFamily::Solana => f.write_str("Solana"),
        }
    }
}

impl ChainFamily {
    /// Number of decimals between the smallest unit and the display unit.
    pub const fn decimals(self) -> u32 {
        match self {
            ChainFamily::Evm => EVM_DECIMALS,
            ChainFamily::Solana => SOLANA_DECIMALS,
        }
    }

    /// Validates `input` against this family's address format.
    ///
    /// EVM addresses are 40 hex digits with an optional `0x` prefix. All-lower
    /// and all-upper case are accepted as is; mixed case must carry a valid
    /// EIP-55 checksum. Solana addresses are base58 strings decoding to 32 bytes.
    pub fn parse_address(self, input: &str) -> Result<ChainAddress, QueryError> {
        let input = input.trim();
        match self {
            ChainFamily::Evm => parse_evm(input).map(ChainAddress::Evm),
            ChainFamily::Solana => input.parse().map(ChainAddress::Solana),
        }
    }

    /// Shorthand for `parse_address(..).is_ok()`.
    pub fn is_valid_address(self, input: &str) -> bool {
        self.parse_address(input).is_ok()
    }
}

fn parse_evm(input: &str) -> Result<Address, QueryError> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(QueryError::InvalidAddress);
    }

    let address = Address::from_str(digits).map_err(|_| QueryError::InvalidAddress)?;

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        let checksummed = address.to_checksum(None);
        if checksummed[2..] != *digits {
            log::debug!("EIP-55 checksum mismatch address={}", input);
            return Err(QueryError::InvalidAddress);
        }
    }

    Ok(address)
}
