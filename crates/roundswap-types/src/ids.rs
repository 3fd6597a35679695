//! Identifiers used throughout Roundswap.
//!
//! Participants use UUIDv7 for time-ordered sorting. Rounds are plain
//! sequential integers starting at [`RoundId::FIRST`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RoundId
// ---------------------------------------------------------------------------

/// Sequential identifier of a settlement round.
///
/// Round 1 is opened when the engine is created; each close opens `id + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RoundId(pub u64);

impl RoundId {
    /// The round that is open when an engine starts.
    pub const FIRST: Self = Self(1);

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ParticipantId
// ---------------------------------------------------------------------------

/// Account identifier for a depositor, or for the engine's custody account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl ParticipantId {
    /// A participant id drawn from thread-local randomness.
    pub fn random() -> Self {
        Self::from_bytes(rand::random::<[u8; 16]>())
    }
}
