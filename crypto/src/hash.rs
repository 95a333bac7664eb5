//! SHA-256d and HASH160.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&Sha256::digest(data));
    output
}

/// Double SHA-256, used for transaction ids and signature hashes.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD-160 of SHA-256, the public key hash committed to by P2PKH scripts.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let ripe = Ripemd160::digest(Sha256::digest(data));
    let mut output = [0u8; 20];
    output.copy_from_slice(&ripe);
    output
}
