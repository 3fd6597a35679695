//! # roundswap-clearing
//!
//! **Pure settlement arithmetic for Roundswap.**
//!
//! This crate is the compute plane: given a round and a deposit it says what
//! the deposit is worth. It has:
//!
//! - **Zero side effects**: no ledgers, no state, no events
//! - **Exact integers**: 256-bit intermediates, floor division, no floats
//! - **One price per round**: the blended ratio of the round totals
//! - **Auditable closures**: SHA-256 round digests and a dust audit

pub mod audit;
pub mod clearing;
pub mod digest;

pub use audit::{RoundAudit, audit_round};
pub use clearing::{ClearingPrice, claim_payout, mul_div_floor, preview_payout};
pub use digest::{round_digest, round_digest_hex, verify_round_digest};
