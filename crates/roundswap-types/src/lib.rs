//! # roundswap-types
//!
//! Shared types, errors, and configuration for the **Roundswap** settlement
//! engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`RoundId`], [`ParticipantId`]
//! - **Amounts**: [`Amount`], [`AmountPair`], and the [`units`] converters
//! - **Round model**: [`Round`], [`RoundStatus`]
//! - **Position model**: [`Position`], [`Payout`]
//! - **Events**: [`EngineEvent`]
//! - **Configuration**: [`EngineConfig`], [`AssetConfig`]
//! - **Errors**: [`RoundswapError`] with `RS_ERR_` prefix codes, and [`TransferError`]
//! - **Constants**: system-wide defaults

pub mod amount;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod position;
pub mod round;

pub use amount::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use position::*;
pub use round::*;

// Constants are accessed via `roundswap_types::constants::FOO`
// (not re-exported to avoid name collisions).
