//! The asset ledger capability consumed by the settlement engine.
//!
//! The engine never holds balances itself. Every value movement goes through
//! one `AssetLedger` per pooled asset, injected at construction.

use roundswap_types::{Amount, ParticipantId, TransferError};

/// Custody operations on a single fungible asset.
///
/// `transfer_in` and `transfer_out` move value between a participant and the
/// engine's custody account. A failed transfer must leave the ledger
/// unchanged.
pub trait AssetLedger {
    /// Ticker of the asset this ledger moves.
    fn symbol(&self) -> &str;

    /// Pull `amount` from `from` into custody.
    fn transfer_in(&mut self, from: ParticipantId, amount: Amount) -> Result<(), TransferError>;

    /// Push `amount` from custody to `to`.
    fn transfer_out(&mut self, to: ParticipantId, amount: Amount) -> Result<(), TransferError>;

    /// Current balance of `holder`.
    fn balance_of(&self, holder: ParticipantId) -> Amount;
}

impl<L: AssetLedger + ?Sized> AssetLedger for Box<L> {
    fn symbol(&self) -> &str {
        (**self).symbol()
    }

    fn transfer_in(&mut self, from: ParticipantId, amount: Amount) -> Result<(), TransferError> {
        (**self).transfer_in(from, amount)
    }

    fn transfer_out(&mut self, to: ParticipantId, amount: Amount) -> Result<(), TransferError> {
        (**self).transfer_out(to, amount)
    }

    fn balance_of(&self, holder: ParticipantId) -> Amount {
        (**self).balance_of(holder)
    }
}
