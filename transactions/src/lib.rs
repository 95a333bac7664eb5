//! Wire-level transaction construction for Ravencoin-family chains.
//!
//! - **encode**: compact sizes and the byte reader
//! - **transaction**: the wire model with exact serialization and txids
//! - **script**: P2PKH, asset transfer and return-data scripts
//! - **output**: typed outputs compiled from payment intents
//! - **sighash**: legacy signature hashing, full or extensible
//! - **chain**: per-chain key, address and signing capabilities
//! - **assembler**: drafts built from gathered inputs, then signed

pub mod assembler;
pub mod chain;
pub mod encode;
pub mod error;
pub mod output;
pub mod script;
pub mod sighash;
pub mod transaction;

pub use assembler::{append_signed_input, assemble, TransactionDraft};
pub use chain::{verify_input, AnyChain, ChainOps, Evrmore, Ravencoin};
pub use error::TransactionError;
pub use output::{ChangeDestination, CompiledOutput};
pub use script::{Script, ScriptKind};
pub use sighash::{signature_hash, SighashMode};
pub use transaction::{Transaction, TxIn, TxOut};
