//! Amount and time arithmetic shared by every submitting flow.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Time-to-live attached to every deadline-bounded call, in seconds.
pub const TTL: u64 = 60 * 20;

/// Percentage applied on top of a gas estimate.
pub const GAS_MARGIN_PERCENT: u64 = 120;

/// 0.5%, used for the swap-to-LEVX output floor and router liquidity minimums
pub const ALLOWED_SLIPPAGE: Percent = Percent::new(50, 10_000);

/// 0.5%, used for the LP migration output floor
pub const LP_SLIPPAGE_TOLERANCE: Percent = Percent::new(5, 1_000);

/// Constant product pool fee, 0.3%
pub const SWAP_FEE: Percent = Percent::new(3, 1_000);

/// An exact fraction `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Percent {
    pub numerator: u64,
    pub denominator: u64,
}

impl Percent {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// `floor(amount * numerator / denominator)`
    pub fn of(&self, amount: U256) -> U256 {
        mul_div(amount, U256::from(self.numerator), U256::from(self.denominator))
    }
}

/// `floor(value * numerator / denominator)`, falling back to dividing first if
/// the product does not fit.
fn mul_div(value: U256, numerator: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::ZERO;
    }
    match value.checked_mul(numerator) {
        Some(product) => product / denominator,
        None => value / denominator * numerator,
    }
}

/// Gas limit submitted for an estimate: `floor(estimate * margin / 100)`.
pub fn gas_limit_with_margin(estimate: u64, margin_percent: u64) -> u64 {
    let limit = u128::from(estimate) * u128::from(margin_percent) / 100;
    u64::try_from(limit).unwrap_or(u64::MAX)
}

/// Removes `slippage` from `amount`.
///
/// Only the deducted part is rounded down, so the result is never below the
/// exact `amount * (1 - slippage)`.
pub fn deduct(amount: U256, slippage: Percent) -> U256 {
    amount.saturating_sub(slippage.of(amount))
}

/// Unix timestamp `ttl` seconds after `now`.
pub fn deadline(now: u64, ttl: u64) -> U256 {
    U256::from(now.saturating_add(ttl))
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Output of a constant product swap of `amount_in` with `fee` taken from the input.
///
/// `None` when either reserve is empty.
pub fn amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256, fee: Percent) -> Option<U256> {
    if reserve_in.is_zero() || reserve_out.is_zero() || fee.denominator == 0 {
        return None;
    }
    let denominator = U256::from(fee.denominator);
    let amount_in_with_fee =
        amount_in.checked_mul(U256::from(fee.denominator.checked_sub(fee.numerator)?))?;
    let numerator = amount_in_with_fee.checked_mul(reserve_out)?;
    let divisor = reserve_in
        .checked_mul(denominator)?
        .checked_add(amount_in_with_fee)?;
    Some(numerator / divisor)
}

/// Part of `reserve` owned by `liquidity` LP tokens out of `total_supply`.
pub fn lp_share(liquidity: U256, reserve: U256, total_supply: U256) -> Option<U256> {
    if total_supply.is_zero() {
        return None;
    }
    Some(liquidity.checked_mul(reserve)? / total_supply)
}

/// Minimum amounts accepted by a router when adding or removing liquidity.
pub fn liquidity_minimums(amount_a: U256, amount_b: U256, slippage: Percent) -> (U256, U256) {
    (deduct(amount_a, slippage), deduct(amount_b, slippage))
}
