//! In-memory ERC-20 style ledger.
//!
//! Tracks per-holder balances and the allowance each holder has granted the
//! custody account. All mutations are atomic: either the full operation
//! succeeds or the ledger is unchanged.

use std::collections::HashMap;

use roundswap_types::{Amount, AssetConfig, ParticipantId, TransferError, constants, units};

use crate::capability::AssetLedger;

/// A single-asset ledger with balances and custody allowances.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    symbol: String,
    decimals: u32,
    /// The engine account that `transfer_in` credits and `transfer_out` debits.
    custody: ParticipantId,
    balances: HashMap<ParticipantId, Amount>,
    /// Amount each owner has authorized custody to pull.
    allowances: HashMap<ParticipantId, Amount>,
    total_supply: Amount,
}

impl InMemoryLedger {
    /// Create an empty 18-decimal ledger.
    #[must_use]
    pub fn new(symbol: impl Into<String>, custody: ParticipantId) -> Self {
        Self {
            symbol: symbol.into(),
            decimals: constants::DEFAULT_DECIMALS,
            custody,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: 0,
        }
    }

    /// Create an empty ledger for a configured asset.
    #[must_use]
    pub fn from_config(config: &AssetConfig, custody: ParticipantId) -> Self {
        Self {
            decimals: config.decimals,
            ..Self::new(config.symbol.clone(), custody)
        }
    }

    #[must_use]
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// `amount` in whole units, or raw smallest units if it does not fit a `Decimal`.
    #[must_use]
    pub fn display_units(&self, amount: Amount) -> String {
        units::format_units(amount, self.decimals)
            .map_or_else(|_| amount.to_string(), |value| value.to_string())
    }

    #[must_use]
    pub fn custody(&self) -> ParticipantId {
        self.custody
    }

    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Create new supply in `holder`'s account.
    ///
    /// # Errors
    /// `BalanceOverflow` if the holder balance or total supply would overflow.
    pub fn mint(&mut self, holder: ParticipantId, amount: Amount) -> Result<(), TransferError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| self.overflow(holder))?;
        let balance = self
            .balance_of(holder)
            .checked_add(amount)
            .ok_or_else(|| self.overflow(holder))?;
        self.total_supply = supply;
        self.balances.insert(holder, balance);
        Ok(())
    }

    /// Authorize custody to pull up to `amount` from `owner`.
    ///
    /// Replaces any previous allowance, like ERC-20 `approve`.
    pub fn approve(&mut self, owner: ParticipantId, amount: Amount) {
        self.allowances.insert(owner, amount);
    }

    /// Remaining amount custody may pull from `owner`.
    #[must_use]
    pub fn allowance(&self, owner: ParticipantId) -> Amount {
        self.allowances.get(&owner).copied().unwrap_or(0)
    }

    /// Move `amount` between two holders.
    ///
    /// # Errors
    /// `InsufficientBalance` if `from` holds less than `amount`,
    /// `BalanceOverflow` if `to` cannot receive it.
    pub fn transfer(
        &mut self,
        from: ParticipantId,
        to: ParticipantId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                asset: self.symbol.clone(),
                account: from,
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| self.overflow(to))?;
        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);
        Ok(())
    }

    fn overflow(&self, account: ParticipantId) -> TransferError {
        TransferError::BalanceOverflow {
            asset: self.symbol.clone(),
            account,
        }
    }
}

impl AssetLedger for InMemoryLedger {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn transfer_in(&mut self, from: ParticipantId, amount: Amount) -> Result<(), TransferError> {
        let approved = self.allowance(from);
        if approved < amount {
            return Err(TransferError::InsufficientAllowance {
                asset: self.symbol.clone(),
                owner: from,
                needed: amount,
                approved,
            });
        }
        self.transfer(from, self.custody, amount)?;
        self.allowances.insert(from, approved - amount);
        tracing::trace!(
            asset = %self.symbol,
            from = %from,
            amount,
            units = %self.display_units(amount),
            "Pulled into custody"
        );
        Ok(())
    }

    fn transfer_out(&mut self, to: ParticipantId, amount: Amount) -> Result<(), TransferError> {
        self.transfer(self.custody, to, amount)?;
        tracing::trace!(
            asset = %self.symbol,
            to = %to,
            amount,
            units = %self.display_units(amount),
            "Released from custody"
        );
        Ok(())
    }

    fn balance_of(&self, holder: ParticipantId) -> Amount {
        self.balances.get(&holder).copied().unwrap_or(0)
    }
}
