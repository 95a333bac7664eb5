//! secp256k1 key generation.

use rand::rngs::OsRng;
use rand::RngCore;
use satchel_types::{KeyPair, PrivateKey, PublicKey};
use secp256k1::{Secp256k1, SecretKey};

use crate::error::CryptoError;

/// Generate a new key pair from a secure random source.
pub fn generate_keypair() -> KeyPair {
    loop {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        // Out-of-range scalars are astronomically rare; draw again.
        if let Ok(pair) = keypair_from_seed(&seed) {
            return pair;
        }
    }
}

/// Derive the compressed public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> Result<PublicKey, CryptoError> {
    let secp = Secp256k1::signing_only();
    let secret = SecretKey::from_slice(&private.0).map_err(|_| CryptoError::InvalidSecretKey)?;
    Ok(PublicKey(
        secp256k1::PublicKey::from_secret_key(&secp, &secret).serialize(),
    ))
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> Result<KeyPair, CryptoError> {
    let public = public_from_private(&private)?;
    Ok(KeyPair { public, private })
}

/// Derive a key pair from a 32-byte seed used directly as the secret scalar.
pub fn keypair_from_seed(seed: &[u8; 32]) -> Result<KeyPair, CryptoError> {
    keypair_from_private(PrivateKey(*seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_derivation_is_deterministic() {
        let a = keypair_from_seed(&[7u8; 32]).unwrap();
        let b = keypair_from_seed(&[7u8; 32]).unwrap();
        assert_eq!(a.public, b.public);
        assert!(a.public.0[0] == 0x02 || a.public.0[0] == 0x03);
    }

    #[test]
    fn zero_seed_is_invalid() {
        assert!(matches!(
            keypair_from_seed(&[0u8; 32]),
            Err(CryptoError::InvalidSecretKey)
        ));
    }

    #[test]
    fn generated_keys_are_unique() {
        let a = generate_keypair();
        let b = generate_keypair();
        assert_ne!(a.public, b.public);
    }
}
