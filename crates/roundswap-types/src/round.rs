//! Round lifecycle types.
//!
//! Each round moves through exactly one transition:
//! **OPEN → CLOSED_SUCCESS | CLOSED_FAILED**
//!
//! While OPEN, deposits accumulate into the round totals. Closing freezes the
//! totals; a round with either side empty fails and refunds its depositors.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, AmountPair, Result, RoundId, RoundswapError};

/// Status of a settlement round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundStatus {
    /// Accepting deposits.
    Open,
    /// Closed with both sides funded; claims settle at the blended price.
    ClosedSuccess,
    /// Closed with one side empty; claims refund the deposit.
    ClosedFailed,
}

impl RoundStatus {
    #[must_use]
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    #[must_use]
    pub fn is_closed(self) -> bool {
        !self.is_open()
    }

    /// Wire tag used when hashing a closed round.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::ClosedSuccess => 1,
            Self::ClosedFailed => 2,
        }
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::ClosedSuccess => write!(f, "CLOSED_SUCCESS"),
            Self::ClosedFailed => write!(f, "CLOSED_FAILED"),
        }
    }
}

/// Aggregate state of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub status: RoundStatus,
    /// Sum of all asset0 deposits into this round.
    pub total0: Amount,
    /// Sum of all asset1 deposits into this round.
    pub total1: Amount,
    pub opened_at: DateTime<Utc>,
    /// `None` while the round is open.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Round {
    /// A fresh open round with zero totals.
    #[must_use]
    pub fn open(id: RoundId) -> Self {
        Self {
            id,
            status: RoundStatus::Open,
            total0: 0,
            total1: 0,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    #[must_use]
    pub fn totals(&self) -> AmountPair {
        AmountPair::new(self.total0, self.total1)
    }

    /// Whether both sides have liquidity, i.e. the round would clear.
    #[must_use]
    pub fn is_two_sided(&self) -> bool {
        self.total0 > 0 && self.total1 > 0
    }

    /// The totals after adding a deposit, without applying it.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if either total would overflow.
    pub fn checked_totals_with(&self, amount0: Amount, amount1: Amount) -> Result<AmountPair> {
        let total0 = self
            .total0
            .checked_add(amount0)
            .ok_or_else(|| RoundswapError::overflow(format!("{} total0", self.id)))?;
        let total1 = self
            .total1
            .checked_add(amount1)
            .ok_or_else(|| RoundswapError::overflow(format!("{} total1", self.id)))?;
        Ok(AmountPair::new(total0, total1))
    }

    /// Freeze the totals and pick the terminal status.
    ///
    /// Returns the new status. Closing an already closed round is a no-op
    /// that returns the existing status.
    pub fn close(&mut self) -> RoundStatus {
        if self.status.is_closed() {
            return self.status;
        }
        self.status = if self.is_two_sided() {
            RoundStatus::ClosedSuccess
        } else {
            RoundStatus::ClosedFailed
        };
        self.closed_at = Some(Utc::now());
        self.status
    }
}
