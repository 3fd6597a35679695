//! Notifications emitted by the settlement engine.
//!
//! Every successful mutating call appends its events, in order, to the
//! engine's event log. Failed calls emit nothing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Amount, ParticipantId, RoundId};

/// An observable engine notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineEvent {
    /// Funds were escrowed into a round.
    Deposit {
        participant: ParticipantId,
        round_id: RoundId,
        amount0: Amount,
        amount1: Amount,
    },
    /// A round closed with both sides funded.
    Success { round_id: RoundId },
    /// A round closed with one side empty; deposits will be refunded.
    Failed { round_id: RoundId },
    /// A participant was paid out for a closed round.
    Claim {
        participant: ParticipantId,
        round_id: RoundId,
        payout0: Amount,
        payout1: Amount,
    },
}

impl EngineEvent {
    /// The round this event concerns.
    #[must_use]
    pub fn round_id(&self) -> RoundId {
        match self {
            Self::Deposit { round_id, .. }
            | Self::Success { round_id }
            | Self::Failed { round_id }
            | Self::Claim { round_id, .. } => *round_id,
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit {
                participant,
                round_id,
                amount0,
                amount1,
            } => write!(f, "Deposit({participant}, {round_id}, {amount0}, {amount1})"),
            Self::Success { round_id } => write!(f, "Success({round_id})"),
            Self::Failed { round_id } => write!(f, "Failed({round_id})"),
            Self::Claim {
                participant,
                round_id,
                payout0,
                payout1,
            } => write!(f, "Claim({participant}, {round_id}, {payout0}, {payout1})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_id_accessor() {
        let who = ParticipantId::new();
        let events = [
            EngineEvent::Deposit {
                participant: who,
                round_id: RoundId(1),
                amount0: 1,
                amount1: 0,
            },
            EngineEvent::Failed {
                round_id: RoundId(1),
            },
            EngineEvent::Claim {
                participant: who,
                round_id: RoundId(1),
                payout0: 1,
                payout1: 0,
            },
        ];
        assert!(events.iter().all(|e| e.round_id() == RoundId(1)));
    }

    #[test]
    fn serde_uses_variant_names() {
        let event = EngineEvent::Success {
            round_id: RoundId(4),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"success":{"round_id":4}}"#);
        let back: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);

        // Amounts above u64 survive the round trip.
        let claim = EngineEvent::Claim {
            participant: ParticipantId::from_bytes([7; 16]),
            round_id: RoundId(2),
            payout0: 85_714_285_714_285_714_285,
            payout1: 233_333_333_333_333_333_333,
        };
        let json = serde_json::to_string(&claim).unwrap();
        let back: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(claim, back);
    }

    #[test]
    fn display() {
        let event = EngineEvent::Failed {
            round_id: RoundId(2),
        };
        assert_eq!(format!("{event}"), "Failed(round:2)");
    }
}
