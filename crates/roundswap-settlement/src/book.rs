//! The round and position ledgers.
//!
//! `RoundBook` is the engine's owned state: the sequence of rounds, the
//! positions inside them, and the id of the one open round. It never moves
//! assets. Every mutation is split into a fallible check that returns a plan
//! and an infallible apply, so the engine can run ledger transfers in between
//! without leaving half-applied state behind.

use std::collections::BTreeMap;

use roundswap_clearing::{RoundAudit, audit_round, claim_payout, preview_payout};
use roundswap_types::{
    Amount, AmountPair, ParticipantId, Payout, Position, Result, Round, RoundId, RoundStatus,
    RoundswapError,
};
use serde::{Deserialize, Serialize};

/// A validated deposit, ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositPlan {
    pub round_id: RoundId,
    pub participant: ParticipantId,
    pub amounts: AmountPair,
    /// Round totals after the deposit.
    totals: AmountPair,
    /// Position after the deposit.
    position: Position,
}

/// A claim whose position has already been marked as claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimTicket {
    pub round_id: RoundId,
    pub participant: ParticipantId,
    pub payout: Payout,
}

/// Serializable copy of a [`RoundBook`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub current_round: RoundId,
    pub rounds: Vec<Round>,
    pub positions: Vec<PositionRecord>,
}

/// One entry of the position ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub round_id: RoundId,
    pub participant: ParticipantId,
    pub position: Position,
}

/// Round ledger plus position ledger.
#[derive(Debug, Clone)]
pub struct RoundBook {
    current: RoundId,
    rounds: BTreeMap<RoundId, Round>,
    positions: BTreeMap<(RoundId, ParticipantId), Position>,
}

impl RoundBook {
    /// A book with round 1 open.
    #[must_use]
    pub fn new() -> Self {
        let mut rounds = BTreeMap::new();
        rounds.insert(RoundId::FIRST, Round::open(RoundId::FIRST));
        Self {
            current: RoundId::FIRST,
            rounds,
            positions: BTreeMap::new(),
        }
    }

    /// Id of the open round.
    #[must_use]
    pub fn current_round(&self) -> RoundId {
        self.current
    }

    #[must_use]
    pub fn round(&self, round_id: RoundId) -> Option<&Round> {
        self.rounds.get(&round_id)
    }

    #[must_use]
    pub fn position(&self, round_id: RoundId, participant: ParticipantId) -> Option<&Position> {
        self.positions.get(&(round_id, participant))
    }

    /// All positions of one round, ordered by participant.
    pub fn positions_in(
        &self,
        round_id: RoundId,
    ) -> impl Iterator<Item = (ParticipantId, &Position)> + '_ {
        self.positions
            .range((round_id, ParticipantId::from_bytes([0; 16]))..)
            .take_while(move |((r, _), _)| *r == round_id)
            .map(|((_, who), pos)| (*who, pos))
    }

    /// Number of rounds ever opened, including the current one.
    #[must_use]
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    fn open_round(&self) -> Result<&Round> {
        self.rounds
            .get(&self.current)
            .ok_or_else(|| RoundswapError::Internal(format!("open {} missing", self.current)))
    }

    /// Validate a deposit without applying it.
    ///
    /// # Errors
    /// - `RoundNotStarted` / `RoundEnded` if `round_id` is not the open round
    /// - `ZeroInput` if both amounts are zero
    /// - `ArithmeticOverflow` if the round totals or position would overflow
    pub fn plan_deposit(
        &self,
        round_id: RoundId,
        participant: ParticipantId,
        amount0: Amount,
        amount1: Amount,
    ) -> Result<DepositPlan> {
        if round_id > self.current {
            return Err(RoundswapError::RoundNotStarted {
                requested: round_id,
                current: self.current,
            });
        }
        if round_id < self.current {
            return Err(RoundswapError::RoundEnded {
                requested: round_id,
                current: self.current,
            });
        }
        if amount0 == 0 && amount1 == 0 {
            return Err(RoundswapError::ZeroInput);
        }

        let totals = self.open_round()?.checked_totals_with(amount0, amount1)?;
        let mut position = self
            .position(round_id, participant)
            .cloned()
            .unwrap_or_default();
        position.accumulate(amount0, amount1)?;

        Ok(DepositPlan {
            round_id,
            participant,
            amounts: AmountPair::new(amount0, amount1),
            totals,
            position,
        })
    }

    /// Apply a deposit produced by [`plan_deposit`](Self::plan_deposit).
    ///
    /// The plan must come from this book with no mutation in between.
    pub fn apply_deposit(&mut self, plan: DepositPlan) {
        if let Some(round) = self.rounds.get_mut(&plan.round_id) {
            round.total0 = plan.totals.amount0;
            round.total1 = plan.totals.amount1;
        }
        self.positions
            .insert((plan.round_id, plan.participant), plan.position);
    }

    /// Validate and apply a deposit in one step.
    ///
    /// # Errors
    /// See [`plan_deposit`](Self::plan_deposit).
    pub fn record_deposit(
        &mut self,
        round_id: RoundId,
        participant: ParticipantId,
        amount0: Amount,
        amount1: Amount,
    ) -> Result<()> {
        let plan = self.plan_deposit(round_id, participant, amount0, amount1)?;
        self.apply_deposit(plan);
        Ok(())
    }

    /// Close the open round and open the next one.
    ///
    /// Returns a copy of the round as closed.
    pub fn close_current(&mut self) -> Round {
        let closing = self.current;
        let closed = self
            .rounds
            .entry(closing)
            .or_insert_with(|| Round::open(closing));
        closed.close();
        let closed = closed.clone();

        self.current = closing.next();
        self.rounds.insert(self.current, Round::open(self.current));
        closed
    }

    /// Validate a claim, compute its payout, and mark the position claimed.
    ///
    /// The position is flagged before this returns, so a second
    /// `begin_claim` for the same position fails until
    /// [`abort_claim`](Self::abort_claim) rolls it back.
    ///
    /// # Errors
    /// - `RoundNotEnded` if `round_id` is the open round or later
    /// - `AlreadyClaimed` if there is no unpaid, non-empty position
    /// - `ArithmeticOverflow` if the payout cannot be computed
    pub fn begin_claim(
        &mut self,
        round_id: RoundId,
        participant: ParticipantId,
    ) -> Result<ClaimTicket> {
        if round_id >= self.current {
            return Err(RoundswapError::RoundNotEnded {
                requested: round_id,
            });
        }
        let already_claimed = || RoundswapError::AlreadyClaimed {
            round_id,
            participant,
        };
        let round = self.rounds.get(&round_id).ok_or_else(already_claimed)?;
        let position = self
            .positions
            .get_mut(&(round_id, participant))
            .filter(|p| p.is_claimable())
            .ok_or_else(already_claimed)?;

        let payout = claim_payout(round, position.amounts())?;
        position.claimed = true;

        Ok(ClaimTicket {
            round_id,
            participant,
            payout,
        })
    }

    /// Undo [`begin_claim`](Self::begin_claim) after a failed payout.
    ///
    /// # Errors
    /// `Internal` if the ticket does not name a claimed position.
    pub fn abort_claim(&mut self, ticket: &ClaimTicket) -> Result<()> {
        match self
            .positions
            .get_mut(&(ticket.round_id, ticket.participant))
        {
            Some(position) if position.claimed => {
                position.claimed = false;
                Ok(())
            }
            _ => Err(RoundswapError::Internal(format!(
                "no claimed position for {} in {}",
                ticket.participant, ticket.round_id
            ))),
        }
    }

    /// What `participant` would receive from `round_id` right now.
    ///
    /// Open rounds are previewed at their partial totals. A missing or
    /// already claimed position previews as zero.
    ///
    /// # Errors
    /// - `RoundNotStarted` if the round has not been opened yet
    /// - `ArithmeticOverflow` if the payout cannot be computed
    pub fn preview(&self, round_id: RoundId, participant: ParticipantId) -> Result<Payout> {
        if round_id > self.current {
            return Err(RoundswapError::RoundNotStarted {
                requested: round_id,
                current: self.current,
            });
        }
        let (Some(round), Some(position)) = (
            self.rounds.get(&round_id),
            self.position(round_id, participant),
        ) else {
            return Ok(Payout::ZERO);
        };
        if position.claimed {
            return Ok(Payout::ZERO);
        }
        preview_payout(round, position.amounts())
    }

    /// Paid / outstanding / dust breakdown of a closed round.
    ///
    /// # Errors
    /// - `RoundNotStarted` if the round does not exist
    /// - `RoundNotEnded` if it is still open
    /// - `ConservationViolation` if the round's positions do not add up
    pub fn audit(&self, round_id: RoundId) -> Result<RoundAudit> {
        let round = self
            .rounds
            .get(&round_id)
            .ok_or(RoundswapError::RoundNotStarted {
                requested: round_id,
                current: self.current,
            })?;
        audit_round(round, self.positions_in(round_id).map(|(_, p)| p))
    }

    /// Copy the ledgers into a serializable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            current_round: self.current,
            rounds: self.rounds.values().cloned().collect(),
            positions: self
                .positions
                .iter()
                .map(|(&(round_id, participant), position)| PositionRecord {
                    round_id,
                    participant,
                    position: position.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild a book from a snapshot, checking its invariants.
    ///
    /// # Errors
    /// - `Serialization` if rounds are not `1..=current_round` with only the
    ///   last one open, or a position names an unknown round
    /// - `ConservationViolation` if a round's positions do not sum to its totals
    ///   or its closed status contradicts which sides were funded
    pub fn restore(snapshot: BookSnapshot) -> Result<Self> {
        let malformed = |what: String| RoundswapError::Serialization(format!("snapshot: {what}"));

        let current = snapshot.current_round;
        let expected = usize::try_from(current.0).map_err(|_| malformed(format!("{current} too large")))?;
        if current < RoundId::FIRST || snapshot.rounds.len() != expected {
            return Err(malformed(format!(
                "{} rounds for current {current}",
                snapshot.rounds.len()
            )));
        }

        let mut rounds = BTreeMap::new();
        for round in snapshot.rounds {
            let should_be_open = round.id == current;
            if round.status.is_open() != should_be_open {
                return Err(malformed(format!("{} is {}", round.id, round.status)));
            }
            if round.id < RoundId::FIRST || round.id > current {
                return Err(malformed(format!("unexpected {}", round.id)));
            }
            if rounds.insert(round.id, round).is_some() {
                return Err(malformed("duplicate round".into()));
            }
        }

        let mut positions = BTreeMap::new();
        let mut sums: BTreeMap<RoundId, AmountPair> = BTreeMap::new();
        for record in snapshot.positions {
            if !rounds.contains_key(&record.round_id) {
                return Err(malformed(format!("position in unknown {}", record.round_id)));
            }
            let sum = sums.entry(record.round_id).or_default();
            sum.amount0 = sum
                .amount0
                .checked_add(record.position.amount0)
                .ok_or_else(|| RoundswapError::overflow("snapshot amount0"))?;
            sum.amount1 = sum
                .amount1
                .checked_add(record.position.amount1)
                .ok_or_else(|| RoundswapError::overflow("snapshot amount1"))?;
            positions.insert((record.round_id, record.participant), record.position);
        }

        for round in rounds.values() {
            let sum = sums.get(&round.id).copied().unwrap_or_default();
            if sum != round.totals() {
                return Err(RoundswapError::ConservationViolation {
                    reason: format!(
                        "{}: positions sum to {sum}, totals are {}",
                        round.id,
                        round.totals()
                    ),
                });
            }
            let outcome_matches = match round.status {
                RoundStatus::Open => true,
                RoundStatus::ClosedSuccess => round.is_two_sided(),
                RoundStatus::ClosedFailed => !round.is_two_sided(),
            };
            if !outcome_matches {
                return Err(RoundswapError::ConservationViolation {
                    reason: format!(
                        "{} is {} with totals {}",
                        round.id,
                        round.status,
                        round.totals()
                    ),
                });
            }
        }

        Ok(Self {
            current,
            rounds,
            positions,
        })
    }
}

impl Default for RoundBook {
    fn default() -> Self {
        Self::new()
    }
}
