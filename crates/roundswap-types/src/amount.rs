//! Asset amounts and human-readable unit conversion.
//!
//! An [`Amount`] is an unsigned integer count of the smallest asset unit
//! (wei-style). Settlement math never touches floating point; `Decimal` is
//! only used at the edges to read and print human amounts like `"100.5"`.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Result, RoundswapError, constants};

/// Smallest-unit asset amount.
pub type Amount = u128;

/// A pair of amounts, one per asset side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AmountPair {
    pub amount0: Amount,
    pub amount1: Amount,
}

impl AmountPair {
    pub const ZERO: Self = Self {
        amount0: 0,
        amount1: 0,
    };

    #[must_use]
    pub fn new(amount0: Amount, amount1: Amount) -> Self {
        Self { amount0, amount1 }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount0 == 0 && self.amount1 == 0
    }
}

impl From<(Amount, Amount)> for AmountPair {
    fn from((amount0, amount1): (Amount, Amount)) -> Self {
        Self { amount0, amount1 }
    }
}

impl From<AmountPair> for (Amount, Amount) {
    fn from(pair: AmountPair) -> Self {
        (pair.amount0, pair.amount1)
    }
}

impl fmt::Display for AmountPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.amount0, self.amount1)
    }
}

/// Conversion between human decimal amounts and smallest-unit [`Amount`]s.
pub mod units {
    use super::{Amount, Decimal, Result, RoundswapError, constants};

    fn pow10(exp: u32) -> Result<u128> {
        10u128
            .checked_pow(exp)
            .ok_or_else(|| RoundswapError::InvalidAmount {
                reason: format!("10^{exp} exceeds the amount range"),
            })
    }

    /// Scale `value` up by `decimals` places, exactly.
    ///
    /// `parse_units(Decimal::new(15, 1), 18)` is `1_500_000_000_000_000_000`.
    ///
    /// # Errors
    /// `InvalidAmount` if the value is negative, carries more fractional
    /// digits than `decimals`, or does not fit an [`Amount`].
    pub fn parse_units(value: Decimal, decimals: u32) -> Result<Amount> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(RoundswapError::InvalidAmount {
                reason: format!("negative amount {value}"),
            });
        }
        let value = value.normalize();
        let scale = value.scale();
        if scale > decimals {
            return Err(RoundswapError::InvalidAmount {
                reason: format!("{value} has more than {decimals} fractional digits"),
            });
        }
        value
            .mantissa()
            .unsigned_abs()
            .checked_mul(pow10(decimals - scale)?)
            .ok_or_else(|| RoundswapError::InvalidAmount {
                reason: format!("{value} with {decimals} decimals overflows the amount range"),
            })
    }

    /// Parse a decimal string such as `"100"` or `"0.25"` into smallest units.
    ///
    /// # Errors
    /// `InvalidAmount` if the string is not a decimal number or fails
    /// [`parse_units`].
    pub fn parse_units_str(value: &str, decimals: u32) -> Result<Amount> {
        let parsed: Decimal = value
            .trim()
            .parse()
            .map_err(|err| RoundswapError::InvalidAmount {
                reason: format!("cannot parse {value:?}: {err}"),
            })?;
        parse_units(parsed, decimals)
    }

    /// [`parse_units`] with the default 18 decimals.
    ///
    /// # Errors
    /// See [`parse_units`].
    pub fn parse_ether(value: Decimal) -> Result<Amount> {
        parse_units(value, constants::DEFAULT_DECIMALS)
    }

    /// Render smallest units as a normalized `Decimal` with `decimals` places.
    ///
    /// # Errors
    /// `InvalidAmount` if `decimals` exceeds the `Decimal` scale limit or the
    /// amount does not fit a 96-bit mantissa.
    pub fn format_units(amount: Amount, decimals: u32) -> Result<Decimal> {
        if decimals > constants::MAX_DECIMALS {
            return Err(RoundswapError::InvalidAmount {
                reason: format!("{decimals} decimals exceeds {}", constants::MAX_DECIMALS),
            });
        }
        let signed = i128::try_from(amount).map_err(|_| RoundswapError::InvalidAmount {
            reason: format!("{amount} out of decimal range"),
        })?;
        Decimal::try_from_i128_with_scale(signed, decimals)
            .map(|d| d.normalize())
            .map_err(|err| RoundswapError::InvalidAmount {
                reason: format!("{amount} out of decimal range: {err}"),
            })
    }
}
