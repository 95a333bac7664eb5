//! ECDSA signing of 32-byte digests.

use satchel_types::{PrivateKey, PublicKey};
use secp256k1::{ecdsa, Message, Secp256k1, SecretKey};

use crate::error::CryptoError;

/// Sign a digest, returning the DER-encoded (low-S) signature.
pub fn sign_digest(digest: &[u8; 32], private_key: &PrivateKey) -> Result<Vec<u8>, CryptoError> {
    let secp = Secp256k1::signing_only();
    let secret =
        SecretKey::from_slice(&private_key.0).map_err(|_| CryptoError::InvalidSecretKey)?;
    let sig = secp.sign_ecdsa(&Message::from_digest(*digest), &secret);
    Ok(sig.serialize_der().to_vec())
}

/// Verify a DER signature over a digest.
///
/// Returns `false` for malformed keys or signatures.
pub fn verify_digest(digest: &[u8; 32], der_signature: &[u8], public_key: &PublicKey) -> bool {
    let secp = Secp256k1::verification_only();
    let Ok(public) = secp256k1::PublicKey::from_slice(public_key.as_bytes()) else {
        return false;
    };
    let Ok(sig) = ecdsa::Signature::from_der(der_signature) else {
        return false;
    };
    secp.verify_ecdsa(&Message::from_digest(*digest), &sig, &public)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256d;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn sign_and_verify() {
        let kp = generate_keypair();
        let digest = sha256d(b"partial transaction");
        let sig = sign_digest(&digest, &kp.private).unwrap();
        assert!(verify_digest(&digest, &sig, &kp.public));
    }

    #[test]
    fn wrong_digest_fails() {
        let kp = generate_keypair();
        let sig = sign_digest(&sha256d(b"a"), &kp.private).unwrap();
        assert!(!verify_digest(&sha256d(b"b"), &sig, &kp.public));
    }

    #[test]
    fn wrong_key_fails() {
        let kp1 = keypair_from_seed(&[1u8; 32]).unwrap();
        let kp2 = keypair_from_seed(&[2u8; 32]).unwrap();
        let digest = sha256d(b"test");
        let sig = sign_digest(&digest, &kp1.private).unwrap();
        assert!(!verify_digest(&digest, &sig, &kp2.public));
    }

    #[test]
    fn signature_deterministic() {
        let kp = keypair_from_seed(&[99u8; 32]).unwrap();
        let digest = sha256d(b"deterministic");
        assert_eq!(
            sign_digest(&digest, &kp.private).unwrap(),
            sign_digest(&digest, &kp.private).unwrap()
        );
    }

    #[test]
    fn malformed_signature_rejected() {
        let kp = generate_keypair();
        assert!(!verify_digest(&[0u8; 32], &[0x30, 0x01], &kp.public));
    }
}
