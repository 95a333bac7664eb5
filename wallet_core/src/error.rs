use serde::{Deserialize, Serialize};
use thiserror::Error;

use satchel_transactions::TransactionError;
use satchel_types::{Subunits, TypesError};

use crate::partial::SessionState;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("insufficient currency: need {needed}, have {available}")]
    InsufficientFunds { needed: Subunits, available: Subunits },

    #[error("insufficient {asset}: need {needed}, have {available}")]
    InsufficientAsset {
        asset: String,
        needed: Subunits,
        available: Subunits,
    },

    #[error("change would be negative: inputs {gathered}, spent {spent}")]
    NegativeChange { gathered: u64, spent: u64 },

    #[error("a fee quote is required to build a partial transaction")]
    QuoteRequired,

    #[error("fee mismatch: reported {reported}, reserved {reserved}")]
    FeeMismatch { reported: Subunits, reserved: Subunits },

    #[error("claim mismatch: {0}")]
    ClaimMismatch(String),

    #[error("no unspent currency output worth exactly {0} subunits")]
    ReservedOutputMissing(Subunits),

    #[error("broadcast failed: {0}")]
    BroadcastFailure(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("partial session cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transaction(TransactionError),

    #[error(transparent)]
    Types(#[from] TypesError),
}

impl From<TransactionError> for WalletError {
    fn from(e: TransactionError) -> Self {
        match e {
            TransactionError::NegativeChange { gathered, spent } => {
                Self::NegativeChange { gathered, spent }
            }
            other => Self::Transaction(other),
        }
    }
}

/// Coarse classification of a [`WalletError`], carried in results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidParameters,
    InsufficientFunds,
    InsufficientAsset,
    NegativeChange,
    QuoteRequired,
    FeeMismatch,
    ClaimMismatch,
    ReservedOutputMissing,
    BroadcastFailure,
}

impl FailureKind {
    /// Only network trouble is worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BroadcastFailure)
    }
}

impl WalletError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidParameters(_)
            | Self::InvalidTransition { .. }
            | Self::Config(_)
            | Self::Transaction(_)
            | Self::Types(_) => FailureKind::InvalidParameters,
            Self::InsufficientFunds { .. } => FailureKind::InsufficientFunds,
            Self::InsufficientAsset { .. } => FailureKind::InsufficientAsset,
            Self::NegativeChange { .. } => FailureKind::NegativeChange,
            Self::QuoteRequired => FailureKind::QuoteRequired,
            Self::FeeMismatch { .. } => FailureKind::FeeMismatch,
            Self::ClaimMismatch(_) => FailureKind::ClaimMismatch,
            Self::ReservedOutputMissing(_) => FailureKind::ReservedOutputMissing,
            Self::BroadcastFailure(_) | Self::Network(_) => FailureKind::BroadcastFailure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
