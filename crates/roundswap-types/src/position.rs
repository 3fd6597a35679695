//! Per-participant escrow positions.

use serde::{Deserialize, Serialize};

use crate::{Amount, AmountPair, Result, RoundswapError};

/// A participant's accumulated deposits within one round.
///
/// `claimed` flips to `true` once, when the participant is paid out, and is
/// never reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub amount0: Amount,
    pub amount1: Amount,
    pub claimed: bool,
}

impl Position {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn amounts(&self) -> AmountPair {
        AmountPair::new(self.amount0, self.amount1)
    }

    /// Whether there is anything left to pay out.
    #[must_use]
    pub fn is_claimable(&self) -> bool {
        !self.claimed && !self.amounts().is_zero()
    }

    /// Add a deposit to this position.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if either amount would overflow; the position is
    /// unchanged in that case.
    pub fn accumulate(&mut self, amount0: Amount, amount1: Amount) -> Result<()> {
        let next0 = self
            .amount0
            .checked_add(amount0)
            .ok_or_else(|| RoundswapError::overflow("position amount0"))?;
        let next1 = self
            .amount1
            .checked_add(amount1)
            .ok_or_else(|| RoundswapError::overflow("position amount1"))?;
        self.amount0 = next0;
        self.amount1 = next1;
        Ok(())
    }
}

/// The amounts paid to a participant when claiming.
///
/// `amount0` is paid in asset0 and `amount1` in asset1.
pub type Payout = AmountPair;

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Position {
    pub fn dummy(amount0: Amount, amount1: Amount) -> Self {
        Self {
            amount0,
            amount1,
            claimed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_adds_both_sides() {
        let mut pos = Position::new();
        pos.accumulate(100, 0).unwrap();
        pos.accumulate(5, 20).unwrap();
        assert_eq!(pos.amounts(), AmountPair::new(105, 20));
        assert!(pos.is_claimable());
    }

    #[test]
    fn accumulate_overflow_leaves_position_unchanged() {
        let mut pos = Position::dummy(1, Amount::MAX);
        let err = pos.accumulate(1, 1).unwrap_err();
        assert!(matches!(err, RoundswapError::ArithmeticOverflow { .. }));
        assert_eq!(pos.amounts(), AmountPair::new(1, Amount::MAX));
    }

    #[test]
    fn claimed_or_empty_is_not_claimable() {
        assert!(!Position::new().is_claimable());
        let mut pos = Position::dummy(1, 1);
        pos.claimed = true;
        assert!(!pos.is_claimable());
    }
}
