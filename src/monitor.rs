//! Monitor state and notification rules.
//!
//! This is the decision logic behind balance monitoring, kept free of timers
//! and I/O so it can be exercised directly. [`crate::session`] drives it.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::balance::BalanceResult;

/// Alert derived from the latest balance update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum Notification {
    Warning(String),
    Info(String),
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Notification::Warning(message) | Notification::Info(message) => message,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            Notification::Warning(_) => "WARNING",
            Notification::Info(_) => "INFO",
        };
        write!(f, "{level}: {}", self.message())
    }
}

/// Per-session monitoring state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    pub address: String,
    /// Most recent successful result.
    pub last: Option<BalanceResult>,
    /// What `last` held before the most recent successful update.
    pub previous: Option<BalanceResult>,
    pub active: bool,
    pub threshold: Option<Decimal>,
    pub notification: Option<Notification>,
    /// Reason of the most recent failed update, cleared on success.
    pub error: Option<String>,
}

impl MonitorState {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Back to the initial state for `address`. The threshold is user input
    /// and survives the reset.
    pub fn reset(&mut self, address: impl Into<String>) {
        let threshold = self.threshold;
        *self = Self::new(address);
        self.threshold = threshold;
    }

    /// Applies one query result.
    ///
    /// A successful result shifts `last` into `previous`, becomes the new
    /// `last` and re-derives the notification. A failed result only records
    /// the error, so the last known-good balance stays available for deltas.
    pub fn apply(&mut self, result: BalanceResult) -> Option<&Notification> {
        if let Some(reason) = result.reason() {
            self.error = Some(reason.to_string());
            return None;
        }

        self.error = None;
        if let Some(last) = self.last.take() {
            self.previous = Some(last);
        }
        self.notification = derive_notification(&result, self.previous.as_ref(), self.threshold);
        self.last = Some(result);
        self.notification.as_ref()
    }
}

/// Derives the notification for `current` given the previous result and an
/// optional low-balance threshold.
///
/// The threshold warning takes precedence over the change message.
pub fn derive_notification(
    current: &BalanceResult,
    previous: Option<&BalanceResult>,
    threshold: Option<Decimal>,
) -> Option<Notification> {
    let amount = current.amount()?;
    let symbol = current.symbol();

    if let Some(threshold) = threshold {
        if amount < threshold {
            return Some(Notification::Warning(format!(
                "Balance is below threshold of {} {symbol}!",
                threshold.normalize()
            )));
        }
    }

    let previous_amount = previous.and_then(BalanceResult::amount)?;
    if previous_amount == amount {
        return None;
    }

    let delta = amount - previous_amount;
    let sign = if delta > Decimal::ZERO { "+" } else { "" };
    // halves round away from zero
    let shown = delta.round_dp_with_strategy(6, RoundingStrategy::MidpointAwayFromZero);
    let message = format!("Balance changed by {sign}{shown:.6} {symbol}");
    if delta >= Decimal::ZERO {
        Some(Notification::Info(message))
    } else {
        Some(Notification::Warning(message))
    }
}
