//! Cryptographic primitives for the Satchel wallet.
//!
//! - **secp256k1** ECDSA for input signing (DER signatures, low-S)
//! - **SHA-256d** for transaction ids and signature hashes
//! - **HASH160** (RIPEMD-160 of SHA-256) for public key hashes
//! - Base58check P2PKH address encoding per chain and network

pub mod address;
pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{address_from_pubkey, decode_address, encode_address, validate_address};
pub use error::CryptoError;
pub use hash::{hash160, sha256, sha256d};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_digest, verify_digest};
