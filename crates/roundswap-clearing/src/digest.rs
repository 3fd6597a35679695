//! Round closure commitments.
//!
//! When a round closes its totals are frozen forever. The digest is a
//! SHA-256 hash over the frozen round so an off-engine auditor holding a
//! snapshot can confirm it describes the same closure the engine reported.

use roundswap_types::{Round, constants};
use sha2::{Digest, Sha256};

/// Hash a round's identity, status, and totals.
///
/// Timestamps are not part of the commitment: two engines replaying the same
/// calls produce the same digest.
#[must_use]
pub fn round_digest(round: &Round) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(constants::ROUND_DIGEST_DOMAIN);
    hasher.update(round.id.0.to_le_bytes());
    hasher.update([round.status.code()]);
    hasher.update(round.total0.to_le_bytes());
    hasher.update(round.total1.to_le_bytes());

    let result = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&result);
    digest
}

/// Hex form of [`round_digest`], for logs and receipts.
#[must_use]
pub fn round_digest_hex(round: &Round) -> String {
    hex::encode(round_digest(round))
}

/// Verify that a digest matches the round.
#[must_use]
pub fn verify_round_digest(round: &Round, expected: &[u8; 32]) -> bool {
    round_digest(round) == *expected
}
