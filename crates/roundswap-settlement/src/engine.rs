//! The round settlement engine.
//!
//! Every mutating operation follows the same order:
//! 1. Validate against the book and compute the result, no mutation
//! 2. Update the book where it guards the operation (claims only)
//! 3. Move assets through the ledgers, compensating on partial failure
//! 4. Commit escrow accounts, push the event, log
//!
//! A failed call leaves rounds, positions, escrow accounts and ledger
//! balances exactly as they were.

use roundswap_clearing::{RoundAudit, round_digest};
use roundswap_ledger::{AssetLedger, InMemoryLedger};
use roundswap_types::{
    Amount, AmountPair, EngineConfig, EngineEvent, ParticipantId, Payout, Position, Result, Round,
    RoundId, RoundStatus, RoundswapError, TransferError, constants,
};
use serde::{Deserialize, Serialize};

use crate::book::{BookSnapshot, ClaimTicket, RoundBook};
use crate::escrow::{EscrowAccounts, EscrowTotals};

/// Outcome of [`SettlementEngine::end_round`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundClosure {
    pub round_id: RoundId,
    pub status: RoundStatus,
    pub total0: Amount,
    pub total1: Amount,
    /// SHA-256 commitment over the frozen round.
    pub digest: [u8; 32],
}

impl RoundClosure {
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

/// Everything needed to rebuild an engine around the same ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub book: BookSnapshot,
    pub escrow: EscrowAccounts,
}

impl EngineSnapshot {
    /// # Errors
    /// `Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// # Errors
    /// `Serialization` if the input is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Round-based two-asset settlement engine.
///
/// Owns the round and position ledgers and one [`AssetLedger`] per side.
/// The engine's custody account is the holder `transfer_in` credits and
/// `transfer_out` debits on both ledgers.
pub struct SettlementEngine<L0, L1> {
    custody: ParticipantId,
    asset0: L0,
    asset1: L1,
    book: RoundBook,
    escrow: EscrowAccounts,
    events: Vec<EngineEvent>,
}

impl SettlementEngine<InMemoryLedger, InMemoryLedger> {
    /// Build an engine over two empty in-memory ledgers.
    ///
    /// # Errors
    /// `Configuration` if the config does not validate.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config.custody,
            InMemoryLedger::from_config(&config.asset0, config.custody),
            InMemoryLedger::from_config(&config.asset1, config.custody),
        ))
    }
}

impl<L0: AssetLedger, L1: AssetLedger> SettlementEngine<L0, L1> {
    /// Create an engine with round 1 open.
    pub fn new(custody: ParticipantId, asset0: L0, asset1: L1) -> Self {
        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            custody = %custody,
            asset0 = asset0.symbol(),
            asset1 = asset1.symbol(),
            "Settlement engine started"
        );
        Self {
            custody,
            asset0,
            asset1,
            book: RoundBook::new(),
            escrow: EscrowAccounts::new(),
            events: Vec::new(),
        }
    }

    /// Rebuild an engine from a snapshot.
    ///
    /// The ledgers must be the ones the snapshot was taken against; call
    /// [`verify_conservation`](Self::verify_conservation) to confirm.
    ///
    /// # Errors
    /// - `Serialization` / `ConservationViolation` if the book is inconsistent
    /// - `ConservationViolation` if escrow deposits disagree with round totals
    pub fn from_snapshot(
        custody: ParticipantId,
        asset0: L0,
        asset1: L1,
        snapshot: EngineSnapshot,
    ) -> Result<Self> {
        let book = RoundBook::restore(snapshot.book)?;
        let escrow = EscrowAccounts::with_totals(snapshot.escrow.deposited(), snapshot.escrow.paid())?;

        let mut totals = EscrowTotals::ZERO;
        let mut round_id = RoundId::FIRST;
        while let Some(round) = book.round(round_id) {
            totals = totals.add(round.totals());
            round_id = round_id.next();
        }
        if totals != escrow.deposited() {
            return Err(RoundswapError::ConservationViolation {
                reason: format!(
                    "round totals sum to {totals}, escrow deposited {}",
                    escrow.deposited()
                ),
            });
        }

        tracing::info!(
            custody = %custody,
            current_round = %book.current_round(),
            "Settlement engine restored"
        );
        Ok(Self {
            custody,
            asset0,
            asset1,
            book,
            escrow,
            events: Vec::new(),
        })
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    /// Escrow `amount0` of asset0 and `amount1` of asset1 from `caller` into
    /// the open round.
    ///
    /// # Errors
    /// - `RoundNotStarted` / `RoundEnded` if `round_id` is not the open round
    /// - `ZeroInput` if both amounts are zero
    /// - `ArithmeticOverflow` if a total would overflow
    /// - `TransferFailed` if a ledger refuses to pull the funds
    /// - `Internal` if undoing a partial pull failed
    pub fn deposit(
        &mut self,
        round_id: RoundId,
        amount0: Amount,
        amount1: Amount,
        caller: ParticipantId,
    ) -> Result<()> {
        let plan = self.book.plan_deposit(round_id, caller, amount0, amount1)?;

        if amount0 > 0 {
            self.asset0
                .transfer_in(caller, amount0)
                .map_err(|err| transfer_failed("deposit", caller, err))?;
        }
        if amount1 > 0 {
            if let Err(err) = self.asset1.transfer_in(caller, amount1) {
                if amount0 > 0 {
                    self.asset0.transfer_out(caller, amount0).map_err(|undo| {
                        compensation_failed("deposit", caller, self.asset0.symbol(), &undo)
                    })?;
                }
                return Err(transfer_failed("deposit", caller, err));
            }
        }

        self.escrow.record_deposit(plan.amounts);
        self.book.apply_deposit(plan);
        self.events.push(EngineEvent::Deposit {
            participant: caller,
            round_id,
            amount0,
            amount1,
        });
        tracing::info!(
            round = round_id.0,
            participant = %caller,
            amount0,
            amount1,
            "Deposit escrowed"
        );
        Ok(())
    }

    /// Close the open round and open the next one.
    ///
    /// The round succeeds if both sides are funded and fails otherwise.
    pub fn end_round(&mut self) -> RoundClosure {
        let round = self.book.close_current();
        let event = match round.status {
            RoundStatus::ClosedSuccess => Some(EngineEvent::Success { round_id: round.id }),
            RoundStatus::ClosedFailed => Some(EngineEvent::Failed { round_id: round.id }),
            RoundStatus::Open => {
                tracing::error!(round = round.id.0, "Closed round still reports open");
                None
            }
        };
        self.events.extend(event);

        let closure = RoundClosure {
            round_id: round.id,
            status: round.status,
            total0: round.total0,
            total1: round.total1,
            digest: round_digest(&round),
        };
        tracing::info!(
            round = round.id.0,
            status = %round.status,
            total0 = round.total0,
            total1 = round.total1,
            digest = %closure.digest_hex(),
            next = self.book.current_round().0,
            "Round closed"
        );
        closure
    }

    /// Pay `caller` their settlement for a closed round.
    ///
    /// # Errors
    /// - `RoundNotEnded` if `round_id` is the open round or later
    /// - `AlreadyClaimed` if there is no unpaid, non-empty position
    /// - `TransferFailed` if custody cannot pay; the claim stays available
    /// - `Internal` if undoing a partial payout failed; the claim is consumed
    pub fn claim(&mut self, round_id: RoundId, caller: ParticipantId) -> Result<Payout> {
        let ticket = self.book.begin_claim(round_id, caller)?;
        match self.pay_out(&ticket) {
            Ok(()) => {}
            Err(err @ RoundswapError::Internal(_)) => return Err(err),
            Err(err) => {
                self.book.abort_claim(&ticket)?;
                return Err(err);
            }
        }

        let payout = ticket.payout;
        self.events.push(EngineEvent::Claim {
            participant: caller,
            round_id,
            payout0: payout.amount0,
            payout1: payout.amount1,
        });
        tracing::info!(
            round = round_id.0,
            participant = %caller,
            payout0 = payout.amount0,
            payout1 = payout.amount1,
            "Claim paid"
        );
        Ok(payout)
    }

    /// Move a ticket's payout out of custody and commit it to escrow.
    fn pay_out(&mut self, ticket: &ClaimTicket) -> Result<()> {
        let caller = ticket.participant;
        let payout = ticket.payout;

        self.ensure_custody_covers(payout)
            .map_err(|err| transfer_failed("claim", caller, err))?;

        if payout.amount0 > 0 {
            self.asset0
                .transfer_out(caller, payout.amount0)
                .map_err(|err| transfer_failed("claim", caller, err))?;
        }
        if payout.amount1 > 0 {
            if let Err(err) = self.asset1.transfer_out(caller, payout.amount1) {
                if payout.amount0 > 0 {
                    if let Err(undo) = self.asset0.transfer_in(caller, payout.amount0) {
                        // asset0 really left custody.
                        self.escrow.record_payout(AmountPair::new(payout.amount0, 0));
                        self.events.push(EngineEvent::Claim {
                            participant: caller,
                            round_id: ticket.round_id,
                            payout0: payout.amount0,
                            payout1: 0,
                        });
                        return Err(compensation_failed(
                            "claim",
                            caller,
                            self.asset0.symbol(),
                            &undo,
                        ));
                    }
                }
                return Err(transfer_failed("claim", caller, err));
            }
        }

        self.escrow.record_payout(payout);
        Ok(())
    }

    fn ensure_custody_covers(&self, payout: Payout) -> std::result::Result<(), TransferError> {
        let held0 = self.asset0.balance_of(self.custody);
        if held0 < payout.amount0 {
            return Err(TransferError::InsufficientBalance {
                asset: self.asset0.symbol().to_string(),
                account: self.custody,
                needed: payout.amount0,
                available: held0,
            });
        }
        let held1 = self.asset1.balance_of(self.custody);
        if held1 < payout.amount1 {
            return Err(TransferError::InsufficientBalance {
                asset: self.asset1.symbol().to_string(),
                account: self.custody,
                needed: payout.amount1,
                available: held1,
            });
        }
        Ok(())
    }

    /// Hand the event log to an external consumer.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// What `caller` would receive from `round_id` if it settled now.
    ///
    /// # Errors
    /// `RoundNotStarted` if the round has not been opened yet.
    pub fn query_claimable_balance(
        &self,
        round_id: RoundId,
        caller: ParticipantId,
    ) -> Result<Payout> {
        let payout = self.book.preview(round_id, caller)?;
        tracing::debug!(
            round = round_id.0,
            participant = %caller,
            payout0 = payout.amount0,
            payout1 = payout.amount1,
            "Claim preview"
        );
        Ok(payout)
    }

    #[must_use]
    pub fn current_round(&self) -> RoundId {
        self.book.current_round()
    }

    /// Custody holdings of both assets, dust included.
    #[must_use]
    pub fn token_balance(&self) -> AmountPair {
        AmountPair::new(self.token0_balance(), self.token1_balance())
    }

    #[must_use]
    pub fn token0_balance(&self) -> Amount {
        self.asset0.balance_of(self.custody)
    }

    #[must_use]
    pub fn token1_balance(&self) -> Amount {
        self.asset1.balance_of(self.custody)
    }

    #[must_use]
    pub fn round(&self, round_id: RoundId) -> Option<&Round> {
        self.book.round(round_id)
    }

    #[must_use]
    pub fn position(&self, round_id: RoundId, participant: ParticipantId) -> Option<&Position> {
        self.book.position(round_id, participant)
    }

    /// # Errors
    /// See [`RoundBook::audit`].
    pub fn audit_round(&self, round_id: RoundId) -> Result<RoundAudit> {
        self.book.audit(round_id)
    }

    #[must_use]
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    #[must_use]
    pub fn escrow_accounts(&self) -> &EscrowAccounts {
        &self.escrow
    }

    /// Value custody should still hold: unclaimed escrow plus dust.
    #[must_use]
    pub fn residual(&self) -> AmountPair {
        self.escrow.residual()
    }

    /// Check that custody holds exactly the residual on both ledgers.
    ///
    /// # Errors
    /// `ConservationViolation` on any mismatch.
    pub fn verify_conservation(&self) -> Result<()> {
        self.escrow.verify(self.token_balance()).inspect_err(|err| {
            tracing::error!(custody = %self.custody, error = %err, "Conservation check failed");
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            book: self.book.snapshot(),
            escrow: self.escrow.clone(),
        }
    }

    #[must_use]
    pub fn book(&self) -> &RoundBook {
        &self.book
    }

    #[must_use]
    pub fn custody(&self) -> ParticipantId {
        self.custody
    }

    #[must_use]
    pub fn asset0(&self) -> &L0 {
        &self.asset0
    }

    #[must_use]
    pub fn asset1(&self) -> &L1 {
        &self.asset1
    }

    /// Direct ledger access, e.g. to mint or approve in a host.
    pub fn asset0_mut(&mut self) -> &mut L0 {
        &mut self.asset0
    }

    pub fn asset1_mut(&mut self) -> &mut L1 {
        &mut self.asset1
    }
}

fn transfer_failed(op: &str, caller: ParticipantId, err: TransferError) -> RoundswapError {
    tracing::warn!(participant = %caller, error = %err, "{op} aborted: transfer failed");
    RoundswapError::TransferFailed(err)
}

fn compensation_failed(
    op: &str,
    caller: ParticipantId,
    asset: &str,
    err: &TransferError,
) -> RoundswapError {
    tracing::error!(
        participant = %caller,
        asset,
        error = %err,
        "{op} compensation failed, custody and caller balances need manual repair"
    );
    RoundswapError::Internal(format!("{op} compensation failed on {asset}: {err}"))
}
