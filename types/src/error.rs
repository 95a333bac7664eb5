//! Error type for parsing and converting the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid decimal amount: {0:?}")]
    InvalidAmount(String),

    #[error("amount has {digits} decimal places, at most {max} allowed")]
    PrecisionExceeded { digits: usize, max: u8 },

    #[error("amount does not fit in 64-bit subunits")]
    AmountOverflow,

    #[error("invalid transaction id: {0}")]
    InvalidTxId(String),
}
