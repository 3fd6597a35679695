//! # roundswap-settlement
//!
//! **Settlement plane**: the round state machine, escrow accounting, and the
//! engine that moves assets through the ledgers.
//!
//! ## Architecture
//!
//! The [`SettlementEngine`] drives each round through one transition,
//! `OPEN → CLOSED_SUCCESS | CLOSED_FAILED`:
//! 1. **deposit**: pulls both assets into custody and grows the caller's position
//! 2. **end_round**: freezes totals, picks the outcome, opens the next round
//! 3. **claim**: marks the position claimed, then pays the settlement out
//! 4. **query_claimable_balance**: previews a claim without mutation
//!
//! ## State
//!
//! - [`RoundBook`]: round and position ledgers, no asset movement
//! - [`EscrowAccounts`]: cumulative in/out per asset, checked against custody
//! - [`SharedEngine`]: `Arc<Mutex<_>>` handle for multi-threaded hosts

pub mod book;
pub mod engine;
pub mod escrow;
pub mod shared;

pub use book::{BookSnapshot, ClaimTicket, DepositPlan, PositionRecord, RoundBook};
pub use engine::{EngineSnapshot, RoundClosure, SettlementEngine};
pub use escrow::{EscrowAccounts, EscrowTotals};
pub use shared::SharedEngine;
