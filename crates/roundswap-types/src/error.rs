//! Error types for the Roundswap settlement engine.
//!
//! All errors use the `RS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Round lifecycle errors
//! - 2xx: Deposit / claim validation errors
//! - 3xx: Asset transfer errors
//! - 4xx: Accounting errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Amount, ParticipantId, RoundId};

/// Failure reported by an asset ledger when moving value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The source account does not hold enough of the asset.
    #[error("{asset}: insufficient balance for {account}: need {needed}, have {available}")]
    InsufficientBalance {
        asset: String,
        account: ParticipantId,
        needed: Amount,
        available: Amount,
    },

    /// The owner has not authorized the custody account to pull this much.
    #[error("{asset}: insufficient allowance from {owner}: need {needed}, approved {approved}")]
    InsufficientAllowance {
        asset: String,
        owner: ParticipantId,
        needed: Amount,
        approved: Amount,
    },

    /// Crediting the receiver would overflow its balance.
    #[error("{asset}: balance overflow crediting {account}")]
    BalanceOverflow {
        asset: String,
        account: ParticipantId,
    },

    /// The ledger refused the transfer for a reason of its own.
    #[error("{asset}: transfer rejected: {reason}")]
    Rejected { asset: String, reason: String },
}

/// Central error enum for all Roundswap operations.
#[derive(Debug, Error)]
pub enum RoundswapError {
    // =================================================================
    // Round Lifecycle Errors (1xx)
    // =================================================================
    /// The targeted round has not been opened yet.
    #[error("RS_ERR_100: Round not started: requested {requested}, current {current}")]
    RoundNotStarted { requested: RoundId, current: RoundId },

    /// The targeted round is already closed to deposits.
    #[error("RS_ERR_101: Round ended: requested {requested}, current {current}")]
    RoundEnded { requested: RoundId, current: RoundId },

    /// Claims are only possible once the round has closed.
    #[error("RS_ERR_102: Round not ended: {requested} is still open")]
    RoundNotEnded { requested: RoundId },

    // =================================================================
    // Deposit / Claim Errors (2xx)
    // =================================================================
    /// A deposit must carry a positive amount on at least one side.
    #[error("RS_ERR_200: Zero input: at least one deposit amount must be positive")]
    ZeroInput,

    /// Nothing left to pay: already claimed, or never deposited.
    #[error("RS_ERR_201: Already claimed: {participant} has nothing to claim in {round_id}")]
    AlreadyClaimed {
        round_id: RoundId,
        participant: ParticipantId,
    },

    /// A human-readable amount could not be converted.
    #[error("RS_ERR_202: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    // =================================================================
    // Transfer Errors (3xx)
    // =================================================================
    /// The asset ledger refused a transfer; the operation was aborted.
    #[error("RS_ERR_300: Transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    // =================================================================
    // Accounting Errors (4xx)
    // =================================================================
    /// Checked arithmetic would overflow.
    #[error("RS_ERR_400: Arithmetic overflow: {context}")]
    ArithmeticOverflow { context: String },

    /// Custody balances disagree with the engine's escrow accounts.
    #[error("RS_ERR_401: Conservation violation: {reason}")]
    ConservationViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("RS_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("RS_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("RS_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl RoundswapError {
    #[must_use]
    pub fn overflow(context: impl Into<String>) -> Self {
        Self::ArithmeticOverflow {
            context: context.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, RoundswapError>;

impl From<serde_json::Error> for RoundswapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
