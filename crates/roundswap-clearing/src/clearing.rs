//! Blended clearing price and payout computation.
//!
//! A round clears at one price for everybody: the ratio of its aggregate
//! totals. A participant's asset0 deposit is worth `amount0 * total1 / total0`
//! of asset1, and vice versa. Products are formed in 256-bit width before the
//! floor division, so no intermediate can overflow an [`Amount`].

use roundswap_types::{Amount, AmountPair, Payout, Result, Round, RoundStatus, RoundswapError};
use ruint::aliases::U256;

/// `floor(a * b / denominator)` without intermediate overflow.
///
/// # Errors
/// `ArithmeticOverflow` on a zero denominator or if the quotient does not
/// fit an [`Amount`].
pub fn mul_div_floor(a: Amount, b: Amount, denominator: Amount) -> Result<Amount> {
    if denominator == 0 {
        return Err(RoundswapError::overflow(format!(
            "division by zero in {a} * {b} / 0"
        )));
    }
    // (2^128 - 1)^2 < 2^256, so the product is exact.
    let product = U256::from(a) * U256::from(b);
    let quotient = product / U256::from(denominator);
    u128::try_from(quotient).map_err(|_| {
        RoundswapError::overflow(format!("{a} * {b} / {denominator} exceeds the amount range"))
    })
}

/// The uniform exchange rate of a two-sided round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearingPrice {
    total0: Amount,
    total1: Amount,
}

impl ClearingPrice {
    /// The clearing price of the given totals, if both sides are funded.
    #[must_use]
    pub fn from_totals(totals: AmountPair) -> Option<Self> {
        (totals.amount0 > 0 && totals.amount1 > 0).then_some(Self {
            total0: totals.amount0,
            total1: totals.amount1,
        })
    }

    #[must_use]
    pub fn totals(&self) -> AmountPair {
        AmountPair::new(self.total0, self.total1)
    }

    /// Value of `amount1` of asset1, expressed in asset0.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the result does not fit an [`Amount`].
    pub fn asset0_for(&self, amount1: Amount) -> Result<Amount> {
        mul_div_floor(amount1, self.total0, self.total1)
    }

    /// Value of `amount0` of asset0, expressed in asset1.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the result does not fit an [`Amount`].
    pub fn asset1_for(&self, amount0: Amount) -> Result<Amount> {
        mul_div_floor(amount0, self.total1, self.total0)
    }

    /// Cross-settle a deposit: asset1 in becomes asset0 out and vice versa.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if either side does not fit an [`Amount`].
    pub fn settle(&self, deposit: AmountPair) -> Result<Payout> {
        Ok(Payout::new(
            self.asset0_for(deposit.amount1)?,
            self.asset1_for(deposit.amount0)?,
        ))
    }
}

/// The amounts a closed round owes for a deposit.
///
/// - `ClosedFailed`: the deposit itself, exactly.
/// - `ClosedSuccess`: the deposit cross-settled at the round's clearing price.
///
/// # Errors
/// - `RoundNotEnded` if the round is still open
/// - `ArithmeticOverflow` if a success round has an empty side (cannot
///   happen for rounds closed by [`Round::close`])
pub fn claim_payout(round: &Round, deposit: AmountPair) -> Result<Payout> {
    match round.status {
        RoundStatus::Open => Err(RoundswapError::RoundNotEnded {
            requested: round.id,
        }),
        RoundStatus::ClosedFailed => Ok(deposit),
        RoundStatus::ClosedSuccess => {
            let price = ClearingPrice::from_totals(round.totals()).ok_or_else(|| {
                RoundswapError::overflow(format!("{} closed as success with an empty side", round.id))
            })?;
            price.settle(deposit)
        }
    }
}

/// What a deposit would pay if the round were settled in its current state.
///
/// Closed rounds give the same answer as [`claim_payout`]. An open round is
/// previewed at its current partial totals: cross-settled when both sides
/// are funded, a refund otherwise (which is what closing it now would do).
///
/// # Errors
/// `ArithmeticOverflow` if the result does not fit an [`Amount`].
pub fn preview_payout(round: &Round, deposit: AmountPair) -> Result<Payout> {
    if round.status.is_closed() {
        return claim_payout(round, deposit);
    }
    match ClearingPrice::from_totals(round.totals()) {
        Some(price) => price.settle(deposit),
        None => Ok(deposit),
    }
}
