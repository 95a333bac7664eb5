//! Base58check P2PKH addresses.
//!
//! Address format: base58check(version || hash160(pubkey)), where the version
//! byte depends on the chain and network.

use satchel_types::{Address, ChainSymbol, Network, PublicKey};

use crate::error::CryptoError;
use crate::hash::hash160;

/// Version byte + 20-byte key hash.
const PAYLOAD_LEN: usize = 21;

/// Encode a public key hash as an address for `chain` on `network`.
pub fn encode_address(pubkey_hash: &[u8; 20], chain: ChainSymbol, network: Network) -> Address {
    let mut payload = Vec::with_capacity(PAYLOAD_LEN);
    payload.push(chain.p2pkh_version(network));
    payload.extend_from_slice(pubkey_hash);
    Address::new(bs58::encode(payload).with_check().into_string())
}

/// Derive the P2PKH address of a compressed public key.
pub fn address_from_pubkey(public: &PublicKey, chain: ChainSymbol, network: Network) -> Address {
    encode_address(&hash160(public.as_bytes()), chain, network)
}

/// Extract the public key hash from an address.
///
/// Fails on bad base58, a bad checksum, the wrong length, or a version byte
/// belonging to another chain or network.
pub fn decode_address(
    address: &str,
    chain: ChainSymbol,
    network: Network,
) -> Result<[u8; 20], CryptoError> {
    let invalid = |reason: String| CryptoError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let decoded = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| invalid(e.to_string()))?;
    if decoded.len() != PAYLOAD_LEN {
        return Err(invalid(format!("payload is {} bytes", decoded.len())));
    }
    let expected = chain.p2pkh_version(network);
    if decoded[0] != expected {
        return Err(invalid(format!(
            "version byte 0x{:02x}, expected 0x{:02x} for {} {}",
            decoded[0],
            expected,
            chain,
            network.as_str()
        )));
    }

    let mut pkh = [0u8; 20];
    pkh.copy_from_slice(&decoded[1..]);
    Ok(pkh)
}

/// Validate that an address is well-formed for the given chain and network.
pub fn validate_address(address: &str, chain: ChainSymbol, network: Network) -> bool {
    decode_address(address, chain, network).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKH: [u8; 20] = [
        0x3d, 0x51, 0x43, 0xa9, 0x33, 0x6e, 0xaf, 0x44, 0x99, 0x0a, 0x0b, 0x42, 0x49, 0xfc, 0xb8,
        0x23, 0xd7, 0x0d, 0xe5, 0x2c,
    ];

    #[test]
    fn known_ravencoin_address() {
        let addr = encode_address(&PKH, ChainSymbol::Ravencoin, Network::Mainnet);
        assert_eq!(addr.as_str(), "REsQeZT8KD8mFfcD4ZQQWis4Ju9eYjgxtT");
    }

    #[test]
    fn known_evrmore_address() {
        let addr = encode_address(&PKH, ChainSymbol::Evrmore, Network::Mainnet);
        assert_eq!(addr.as_str(), "ENk84dQM9Ld7AxqsQEQoRLWpKHCBKyFCbc");
    }

    #[test]
    fn known_testnet_address() {
        let addr = encode_address(&PKH, ChainSymbol::Ravencoin, Network::Testnet);
        assert_eq!(addr.as_str(), "mm7As6epXQmSxmidJxPfF7kBQdHkn8MXWC");
    }

    #[test]
    fn decode_roundtrip() {
        let addr = encode_address(&PKH, ChainSymbol::Evrmore, Network::Testnet);
        let decoded =
            decode_address(addr.as_str(), ChainSymbol::Evrmore, Network::Testnet).unwrap();
        assert_eq!(decoded, PKH);
    }

    #[test]
    fn wrong_chain_rejected() {
        assert!(!validate_address(
            "REsQeZT8KD8mFfcD4ZQQWis4Ju9eYjgxtT",
            ChainSymbol::Evrmore,
            Network::Mainnet
        ));
        assert!(!validate_address(
            "REsQeZT8KD8mFfcD4ZQQWis4Ju9eYjgxtT",
            ChainSymbol::Ravencoin,
            Network::Testnet
        ));
    }

    #[test]
    fn bad_checksum_rejected() {
        let mut bad = "REsQeZT8KD8mFfcD4ZQQWis4Ju9eYjgxtT".to_string();
        bad.pop();
        bad.push('U');
        assert!(!validate_address(&bad, ChainSymbol::Ravencoin, Network::Mainnet));
    }

    #[test]
    fn garbage_rejected() {
        assert!(!validate_address("", ChainSymbol::Ravencoin, Network::Mainnet));
        assert!(!validate_address("0OIl", ChainSymbol::Ravencoin, Network::Mainnet));
        assert!(!validate_address("R", ChainSymbol::Ravencoin, Network::Mainnet));
    }
}
