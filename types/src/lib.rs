//! Fundamental types for the Satchel wallet.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! subunit amounts, fee estimation, chain identifiers, addresses, transaction ids,
//! unspent outputs, key material and protocol constants.

pub mod address;
pub mod amount;
pub mod chain;
pub mod error;
pub mod fee;
pub mod hash;
pub mod keys;
pub mod params;
pub mod utxo;

pub use address::Address;
pub use amount::{is_divisibility_valid, Subunits, SUBUNITS_PER_UNIT};
pub use chain::{ChainSymbol, Network};
pub use error::TypesError;
pub use fee::FeeRate;
pub use hash::TxId;
pub use keys::{KeyPair, PrivateKey, PublicKey};
pub use params::ProtocolParams;
pub use utxo::{GatheredInputSet, OutPoint, UnspentOutput};
