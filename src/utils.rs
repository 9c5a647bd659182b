use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::AppError;

/// Returns the current UTC time formatted as YYYY-MM-DD HH:MM:SS.
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Shortens an address to its first 6 and last 4 characters.
pub fn shorten_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Formats an amount with its unit symbol, without trailing zeros.
pub fn format_amount(amount: Decimal, symbol: &str) -> String {
    format!("{} {symbol}", amount.normalize())
}

/// Host part of an explorer URL, e.g. `etherscan.io`.
pub fn explorer_host(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split('/').next().unwrap_or(rest)
}

/// Parses a user-supplied low-balance threshold.
pub fn parse_threshold(input: &str) -> Result<Decimal, AppError> {
    let input = input.trim();
    Decimal::from_str(input)
        .ok()
        .filter(|value| !value.is_sign_negative())
        .ok_or_else(|| AppError::InvalidThreshold(input.to_string()))
}
