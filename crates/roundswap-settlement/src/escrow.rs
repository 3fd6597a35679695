//! Escrow conservation tracker.
//!
//! Invariant checked against the ledgers on demand:
//! ```text
//! ∀ asset: ledger.balance_of(custody) == Σ(pulled in) - Σ(paid out)
//! ```
//!
//! The residual covers unclaimed escrow plus floor-division dust. A mismatch
//! means value moved through custody without going through the engine.
//!
//! Running totals are 256-bit. Custody never holds more than `Amount::MAX`
//! per asset, but the lifetime sums of deposits and payouts can exceed it.

use std::fmt;

use roundswap_types::{Amount, AmountPair, Result, RoundswapError};
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

/// Per-asset running total, wide enough to never overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscrowTotals {
    pub amount0: U256,
    pub amount1: U256,
}

impl EscrowTotals {
    pub const ZERO: Self = Self {
        amount0: U256::ZERO,
        amount1: U256::ZERO,
    };

    #[must_use]
    pub fn add(self, amounts: AmountPair) -> Self {
        Self {
            amount0: self.amount0 + U256::from(amounts.amount0),
            amount1: self.amount1 + U256::from(amounts.amount1),
        }
    }
}

impl From<AmountPair> for EscrowTotals {
    fn from(pair: AmountPair) -> Self {
        Self::ZERO.add(pair)
    }
}

impl fmt::Display for EscrowTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.amount0, self.amount1)
    }
}

/// Cumulative value the engine has pulled into and paid out of custody.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAccounts {
    /// Total pulled in by deposits, per asset.
    deposited: EscrowTotals,
    /// Total paid out by claims, per asset.
    paid: EscrowTotals,
}

impl EscrowAccounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from known totals, e.g. when restoring a snapshot.
    ///
    /// # Errors
    /// `ConservationViolation` if more was paid than deposited, or if the
    /// residual exceeds what a ledger can hold.
    pub fn with_totals(deposited: EscrowTotals, paid: EscrowTotals) -> Result<Self> {
        let accounts = Self { deposited, paid };
        accounts.checked_residual()?;
        Ok(accounts)
    }

    /// Record value pulled into custody.
    pub fn record_deposit(&mut self, amounts: AmountPair) {
        self.deposited = self.deposited.add(amounts);
    }

    /// Record value paid out of custody.
    pub fn record_payout(&mut self, amounts: AmountPair) {
        self.paid = self.paid.add(amounts);
    }

    #[must_use]
    pub fn deposited(&self) -> EscrowTotals {
        self.deposited
    }

    #[must_use]
    pub fn paid(&self) -> EscrowTotals {
        self.paid
    }

    /// What custody should still hold: deposited minus paid.
    ///
    /// Saturates at both ends; [`verify`](Self::verify) reports either case.
    #[must_use]
    pub fn residual(&self) -> AmountPair {
        AmountPair::new(
            narrow_saturating(self.deposited.amount0.saturating_sub(self.paid.amount0)),
            narrow_saturating(self.deposited.amount1.saturating_sub(self.paid.amount1)),
        )
    }

    fn checked_residual(&self) -> Result<AmountPair> {
        let r0 = self.deposited.amount0.checked_sub(self.paid.amount0);
        let r1 = self.deposited.amount1.checked_sub(self.paid.amount1);
        let (Some(r0), Some(r1)) = (r0, r1) else {
            return Err(RoundswapError::ConservationViolation {
                reason: format!("paid {} exceeds deposited {}", self.paid, self.deposited),
            });
        };
        match (Amount::try_from(r0), Amount::try_from(r1)) {
            (Ok(r0), Ok(r1)) => Ok(AmountPair::new(r0, r1)),
            _ => Err(RoundswapError::ConservationViolation {
                reason: format!(
                    "residual ({r0}, {r1}) exceeds the ledger amount range (deposited={}, paid={})",
                    self.deposited, self.paid
                ),
            }),
        }
    }

    /// Verify that custody actually holds the residual.
    ///
    /// # Errors
    /// `ConservationViolation` if `actual` differs from the residual on either
    /// side, or if more was paid than deposited.
    pub fn verify(&self, actual: AmountPair) -> Result<()> {
        let expected = self.checked_residual()?;
        if actual != expected {
            return Err(RoundswapError::ConservationViolation {
                reason: format!(
                    "custody holds {actual}, expected {expected} \
                     (deposited={}, paid={})",
                    self.deposited, self.paid
                ),
            });
        }
        Ok(())
    }
}

fn narrow_saturating(value: U256) -> Amount {
    Amount::try_from(value).unwrap_or(Amount::MAX)
}
