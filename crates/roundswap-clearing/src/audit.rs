//! Per-round settlement audit.
//!
//! Floor division leaves a little of each asset unpaid in a success round.
//! Summed over `n` positions the exact payouts add up to the round totals,
//! so the residue on each side is an integer in `[0, n)`. This module
//! recomputes every position's payout and checks that bound.
//!
//! ```text
//! totals == paid + outstanding + dust     (per asset)
//! dust   <  positions                     (success rounds)
//! dust   == 0                             (failed rounds)
//! ```

use roundswap_types::{AmountPair, Position, Result, Round, RoundId, RoundStatus, RoundswapError};

use crate::clearing::claim_payout;

/// Breakdown of where a closed round's totals go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundAudit {
    pub round_id: RoundId,
    pub status: RoundStatus,
    /// Positions holding a non-zero deposit.
    pub positions: usize,
    /// Positions already paid out.
    pub claimants: usize,
    /// Paid to claimants so far, per payout asset.
    pub paid: AmountPair,
    /// Still owed to positions that have not claimed.
    pub outstanding: AmountPair,
    /// Never distributed; stays in custody.
    pub dust: AmountPair,
}

/// Audit a closed round against its positions.
///
/// # Errors
/// - `RoundNotEnded` if the round is open
/// - `ConservationViolation` if payouts exceed the totals or the dust bound
///   does not hold
pub fn audit_round<'a>(
    round: &Round,
    positions: impl IntoIterator<Item = &'a Position>,
) -> Result<RoundAudit> {
    if round.status.is_open() {
        return Err(RoundswapError::RoundNotEnded {
            requested: round.id,
        });
    }
    let mut audit = RoundAudit {
        round_id: round.id,
        status: round.status,
        positions: 0,
        claimants: 0,
        paid: AmountPair::ZERO,
        outstanding: AmountPair::ZERO,
        dust: AmountPair::ZERO,
    };

    for position in positions {
        if position.amounts().is_zero() {
            continue;
        }
        let payout = claim_payout(round, position.amounts())?;
        audit.positions += 1;
        let bucket = if position.claimed {
            audit.claimants += 1;
            &mut audit.paid
        } else {
            &mut audit.outstanding
        };
        bucket.amount0 = bucket
            .amount0
            .checked_add(payout.amount0)
            .ok_or_else(|| RoundswapError::overflow("audit payout0"))?;
        bucket.amount1 = bucket
            .amount1
            .checked_add(payout.amount1)
            .ok_or_else(|| RoundswapError::overflow("audit payout1"))?;
    }

    let owed0 = audit.paid.amount0.checked_add(audit.outstanding.amount0);
    let owed1 = audit.paid.amount1.checked_add(audit.outstanding.amount1);
    let dust0 = owed0.and_then(|owed| round.total0.checked_sub(owed));
    let dust1 = owed1.and_then(|owed| round.total1.checked_sub(owed));
    let (Some(dust0), Some(dust1)) = (dust0, dust1) else {
        return Err(violation(round, "payouts exceed round totals"));
    };
    audit.dust = AmountPair::new(dust0, dust1);

    let bound = audit.positions as u128;
    let within_bound = match round.status {
        RoundStatus::ClosedFailed => audit.dust.is_zero(),
        _ => dust0 < bound && dust1 < bound,
    };
    if !within_bound {
        return Err(violation(
            round,
            &format!("dust {} not below {} positions", audit.dust, audit.positions),
        ));
    }

    Ok(audit)
}

fn violation(round: &Round, what: &str) -> RoundswapError {
    tracing::error!(
        round = round.id.0,
        status = %round.status,
        total0 = round.total0,
        total1 = round.total1,
        "Round audit failed: {what}"
    );
    RoundswapError::ConservationViolation {
        reason: format!("{}: {what}", round.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundswap_types::Amount;

    const ETHER: Amount = 1_000_000_000_000_000_000;

    fn round_with(positions: &[Position]) -> Round {
        let mut round = Round::open(RoundId(1));
        for p in positions {
            round.total0 += p.amount0;
            round.total1 += p.amount1;
        }
        round.close();
        round
    }

    #[test]
    fn two_participant_dust_is_one_unit() {
        let mut owner = Position::dummy(100 * ETHER, 200 * ETHER);
        let other = Position::dummy(200 * ETHER, 500 * ETHER);
        owner.claimed = true;
        let round = round_with(&[owner.clone(), other.clone()]);

        let audit = audit_round(&round, [&owner, &other]).unwrap();
        assert_eq!(audit.positions, 2);
        assert_eq!(audit.claimants, 1);
        assert_eq!(
            audit.paid,
            AmountPair::new(85_714_285_714_285_714_285, 233_333_333_333_333_333_333)
        );
        assert_eq!(
            audit.outstanding,
            AmountPair::new(214_285_714_285_714_285_714, 466_666_666_666_666_666_666)
        );
        assert_eq!(audit.dust, AmountPair::new(1, 1));
    }

    #[test]
    fn failed_round_has_no_dust() {
        let pos = Position::dummy(100 * ETHER, 0);
        let round = round_with(std::slice::from_ref(&pos));
        let audit = audit_round(&round, [&pos]).unwrap();
        assert_eq!(audit.status, RoundStatus::ClosedFailed);
        assert_eq!(audit.outstanding, AmountPair::new(100 * ETHER, 0));
        assert!(audit.dust.is_zero());
    }

    #[test]
    fn empty_positions_are_skipped() {
        let empty = Position::new();
        let pos = Position::dummy(5, 9);
        let round = round_with(&[pos.clone()]);
        let audit = audit_round(&round, [&empty, &pos]).unwrap();
        assert_eq!(audit.positions, 1);
        assert!(audit.dust.is_zero());
    }

    #[test]
    fn missing_positions_violate_conservation() {
        let a = Position::dummy(10, 0);
        let b = Position::dummy(0, 10);
        let round = round_with(&[a.clone(), b]);
        // Only `a` is supplied: the unaccounted asset0 exceeds the dust bound.
        let err = audit_round(&round, [&a]).unwrap_err();
        assert!(matches!(err, RoundswapError::ConservationViolation { .. }));
    }

    #[test]
    fn open_round_cannot_be_audited() {
        let round = Round::open(RoundId(3));
        assert!(matches!(
            audit_round(&round, Vec::<&Position>::new()).unwrap_err(),
            RoundswapError::RoundNotEnded { .. }
        ));
    }

    #[test]
    fn randomized_rounds_respect_dust_bound() {
        use rand::{Rng, SeedableRng, rngs::StdRng};

        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let n: usize = rng.gen_range(1..=12);
            let positions: Vec<Position> = (0..n)
                .map(|_| {
                    let mut p = Position::dummy(
                        rng.gen_range(0..1_000_000) * ETHER / 1000 + rng.gen_range(0..1000),
                        rng.gen_range(0..1_000_000) * ETHER / 1000 + rng.gen_range(0..1000),
                    );
                    p.claimed = true;
                    p
                })
                .collect();
            let round = round_with(&positions);
            let audit = audit_round(&round, &positions).unwrap();
            assert!(audit.outstanding.is_zero());
            assert!(audit.paid.amount0 <= round.total0);
            assert!(audit.paid.amount1 <= round.total1);
            assert!(audit.dust.amount0 < n as u128 || round.status == RoundStatus::ClosedFailed);
        }
    }
}
