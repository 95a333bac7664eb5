use satchel_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("unexpected end of transaction data at byte {offset}")]
    UnexpectedEof { offset: usize },

    #[error("non-canonical varint at byte {offset}")]
    NonCanonicalVarInt { offset: usize },

    #[error("{count} trailing bytes after transaction")]
    TrailingBytes { count: usize },

    #[error("invalid hex transaction: {0}")]
    InvalidHex(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("invalid asset name {0:?}")]
    InvalidAssetName(String),

    #[error("memo is {len} bytes, at most {max} allowed")]
    MemoTooLarge { len: usize, max: usize },

    #[error("change would be negative: inputs {gathered}, spent {spent}")]
    NegativeChange { gathered: u64, spent: u64 },

    #[error("input set mismatch: {0}")]
    InputMismatch(String),

    #[error("input index {index} out of range for {count} inputs")]
    InputIndexOutOfRange { index: usize, count: usize },

    #[error("unknown signature hash flag 0x{0:02x}")]
    UnknownSighashFlag(u8),

    #[error("malformed unlocking script on input {0}")]
    MalformedUnlockingScript(usize),
}
