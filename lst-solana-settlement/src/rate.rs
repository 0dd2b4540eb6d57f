//! Fixed-ratio conversion between lamports and derivative-token base units.
//!
//! Amounts are always handled in base units. The configured whole-unit ratio
//! is scaled by each currency's decimal precision once, reduced by the gcd,
//! and then applied with `u128` integer arithmetic. Both directions floor, so
//! the service never mints or refunds more than the observed amount is worth.

use crate::config::Exchange;
use crate::error::{Result, SettlementError};

/// The largest precision accepted for either currency; `10^18` still leaves
/// headroom for a `u64` rate factor inside a `u128`.
const MAX_DECIMALS: u8 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRate {
    /// Token base units per `denominator` native base units, after reduction.
    numerator: u128,
    denominator: u128,
}

impl ExchangeRate {
    /// Builds a rate meaning `1 native = numerator / denominator tokens` in
    /// whole units.
    pub fn new(
        numerator: u64,
        denominator: u64,
        native_decimals: u8,
        token_decimals: u8,
    ) -> Result<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(SettlementError::InvalidRate(format!(
                "rate must be positive, got {numerator}/{denominator}"
            )));
        }
        if native_decimals > MAX_DECIMALS || token_decimals > MAX_DECIMALS {
            return Err(SettlementError::InvalidRate(format!(
                "decimals must not exceed {MAX_DECIMALS}, got native={native_decimals} token={token_decimals}"
            )));
        }

        let scaled_num = numerator as u128 * 10u128.pow(token_decimals as u32);
        let scaled_den = denominator as u128 * 10u128.pow(native_decimals as u32);
        let divisor = gcd(scaled_num, scaled_den);

        Ok(Self {
            numerator: scaled_num / divisor,
            denominator: scaled_den / divisor,
        })
    }

    pub fn from_config(exchange: &Exchange) -> Result<Self> {
        Self::new(
            exchange.rate_numerator,
            exchange.rate_denominator,
            exchange.native_decimals,
            exchange.token_decimals,
        )
    }

    /// Lamports in, token base units out (floored).
    pub fn to_token(&self, native: u64) -> Result<u64> {
        convert(native, self.numerator, self.denominator)
    }

    /// Token base units in, lamports out (floored).
    pub fn to_native(&self, token: u64) -> Result<u64> {
        convert(token, self.denominator, self.numerator)
    }
}

fn convert(amount: u64, mul: u128, div: u128) -> Result<u64> {
    let product = (amount as u128)
        .checked_mul(mul)
        .ok_or_else(|| SettlementError::InvalidAmount(format!("{amount} overflows conversion")))?;
    u64::try_from(product / div).map_err(|_| {
        SettlementError::InvalidAmount(format!("{amount} converts to more than u64::MAX"))
    })
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
