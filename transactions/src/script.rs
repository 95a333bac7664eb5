//! Locking scripts: pay-to-public-key-hash, asset transfers and return-data memos.
//!
//! An asset transfer is a P2PKH script followed by an asset envelope:
//!
//! ```text
//! OP_DUP OP_HASH160 <pkh> OP_EQUALVERIFY OP_CHECKSIG
//! OP_ASSET <push: tag(3) 't' len(1) name amount(8, LE)> OP_DROP
//! ```

use std::fmt;

use satchel_types::params::MAX_ASSET_NAME_LEN;
use satchel_types::{ChainSymbol, Subunits};

use crate::error::TransactionError;

pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_DROP: u8 = 0x75;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Marks the start of an asset envelope.
pub const OP_ASSET: u8 = 0xc0;

/// Envelope marker for a transfer of an existing asset.
const TRANSFER_MARKER: u8 = b't';

const P2PKH_LEN: usize = 25;

/// A serialized script.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn classify(&self) -> ScriptKind {
        classify(&self.0)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// What a locking script pays to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptKind {
    P2pkh {
        pubkey_hash: [u8; 20],
    },
    AssetTransfer {
        pubkey_hash: [u8; 20],
        tag: [u8; 3],
        name: String,
        amount: Subunits,
    },
    NullData {
        payload: Vec<u8>,
    },
    Unknown,
}

/// Append a minimal data push.
pub fn push_data(buf: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        buf.push(len as u8);
    } else if len <= 0xff {
        buf.push(OP_PUSHDATA1);
        buf.push(len as u8);
    } else {
        buf.push(OP_PUSHDATA2);
        buf.extend_from_slice(&(len as u16).to_le_bytes());
    }
    buf.extend_from_slice(data);
}

/// Standard pay-to-public-key-hash script.
pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Script {
    let mut s = Vec::with_capacity(P2PKH_LEN);
    s.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
    s.extend_from_slice(pubkey_hash);
    s.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    Script(s)
}

/// Asset transfer of `amount` subunits of `name` to `pubkey_hash`.
pub fn asset_transfer(
    pubkey_hash: &[u8; 20],
    chain: ChainSymbol,
    name: &str,
    amount: Subunits,
) -> Result<Script, TransactionError> {
    if name.is_empty() || name.len() > MAX_ASSET_NAME_LEN || !name.is_ascii() {
        return Err(TransactionError::InvalidAssetName(name.to_string()));
    }

    let mut payload = Vec::with_capacity(3 + 2 + name.len() + 8);
    payload.extend_from_slice(&chain.asset_tag());
    payload.push(TRANSFER_MARKER);
    payload.push(name.len() as u8);
    payload.extend_from_slice(name.as_bytes());
    payload.extend_from_slice(&amount.raw().to_le_bytes());

    let mut s = p2pkh(pubkey_hash).into_bytes();
    s.push(OP_ASSET);
    push_data(&mut s, &payload);
    s.push(OP_DROP);
    Ok(Script(s))
}

/// Provably unspendable return-data script carrying `payload`.
pub fn null_data(payload: &[u8]) -> Script {
    let mut s = Vec::with_capacity(payload.len() + 3);
    s.push(OP_RETURN);
    push_data(&mut s, payload);
    Script(s)
}

/// Read one data push at `pos`, returning the data and the position after it.
fn read_push(bytes: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let op = *bytes.get(pos)?;
    let (len, start) = match op {
        n if n < OP_PUSHDATA1 => (n as usize, pos + 1),
        OP_PUSHDATA1 => (*bytes.get(pos + 1)? as usize, pos + 2),
        OP_PUSHDATA2 => {
            let raw = bytes.get(pos + 1..pos + 3)?;
            (u16::from_le_bytes([raw[0], raw[1]]) as usize, pos + 3)
        }
        _ => return None,
    };
    let data = bytes.get(start..start + len)?;
    Some((data, start + len))
}

fn p2pkh_hash(bytes: &[u8]) -> Option<[u8; 20]> {
    if bytes.len() < P2PKH_LEN
        || bytes[..3] != [OP_DUP, OP_HASH160, 20]
        || bytes[23..25] != [OP_EQUALVERIFY, OP_CHECKSIG]
    {
        return None;
    }
    let mut pkh = [0u8; 20];
    pkh.copy_from_slice(&bytes[3..23]);
    Some(pkh)
}

fn parse_transfer_payload(payload: &[u8]) -> Option<([u8; 3], String, Subunits)> {
    let tag: [u8; 3] = payload.get(..3)?.try_into().ok()?;
    if *payload.get(3)? != TRANSFER_MARKER {
        return None;
    }
    let name_len = *payload.get(4)? as usize;
    let name = payload.get(5..5 + name_len)?;
    let amount: [u8; 8] = payload.get(5 + name_len..13 + name_len)?.try_into().ok()?;
    if payload.len() != 13 + name_len {
        return None;
    }
    let name = String::from_utf8(name.to_vec()).ok()?;
    Some((tag, name, Subunits::new(u64::from_le_bytes(amount))))
}

/// Classify a locking script.
pub fn classify(bytes: &[u8]) -> ScriptKind {
    if bytes.first() == Some(&OP_RETURN) {
        return match read_push(bytes, 1) {
            Some((payload, end)) if end == bytes.len() => ScriptKind::NullData {
                payload: payload.to_vec(),
            },
            None if bytes.len() == 1 => ScriptKind::NullData { payload: Vec::new() },
            _ => ScriptKind::Unknown,
        };
    }

    let Some(pubkey_hash) = p2pkh_hash(bytes) else {
        return ScriptKind::Unknown;
    };
    if bytes.len() == P2PKH_LEN {
        return ScriptKind::P2pkh { pubkey_hash };
    }
    if bytes[P2PKH_LEN] != OP_ASSET {
        return ScriptKind::Unknown;
    }
    let Some((payload, end)) = read_push(bytes, P2PKH_LEN + 1) else {
        return ScriptKind::Unknown;
    };
    if end + 1 != bytes.len() || bytes[end] != OP_DROP {
        return ScriptKind::Unknown;
    }
    match parse_transfer_payload(payload) {
        Some((tag, name, amount)) => ScriptKind::AssetTransfer {
            pubkey_hash,
            tag,
            name,
            amount,
        },
        None => ScriptKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKH: [u8; 20] = [
        0x3d, 0x51, 0x43, 0xa9, 0x33, 0x6e, 0xaf, 0x44, 0x99, 0x0a, 0x0b, 0x42, 0x49, 0xfc, 0xb8,
        0x23, 0xd7, 0x0d, 0xe5, 0x2c,
    ];

    #[test]
    fn p2pkh_layout() {
        assert_eq!(
            p2pkh(&PKH).to_hex(),
            "76a9143d5143a9336eaf44990a0b4249fcb823d70de52c88ac"
        );
    }

    #[test]
    fn asset_transfer_golden_bytes() {
        let script =
            asset_transfer(&PKH, ChainSymbol::Ravencoin, "SATORI", Subunits::ONE_UNIT).unwrap();
        assert_eq!(
            script.to_hex(),
            "76a9143d5143a9336eaf44990a0b4249fcb823d70de52c88ac\
             c013\
             72766e74065341544f524900e1f50500000000\
             75"
        );
    }

    #[test]
    fn evrmore_tag_in_envelope() {
        let script =
            asset_transfer(&PKH, ChainSymbol::Evrmore, "SATORI", Subunits::new(1)).unwrap();
        assert_eq!(&script.as_bytes()[27..30], b"evr");
    }

    #[test]
    fn asset_name_limits() {
        assert!(asset_transfer(&PKH, ChainSymbol::Ravencoin, "", Subunits::new(1)).is_err());
        let long = "A".repeat(MAX_ASSET_NAME_LEN + 1);
        assert!(matches!(
            asset_transfer(&PKH, ChainSymbol::Ravencoin, &long, Subunits::new(1)),
            Err(TransactionError::InvalidAssetName(_))
        ));
    }

    #[test]
    fn memo_script() {
        let script = null_data(b"hello");
        assert_eq!(script.to_hex(), "6a0568656c6c6f");
        assert_eq!(
            script.classify(),
            ScriptKind::NullData {
                payload: b"hello".to_vec()
            }
        );
    }

    #[test]
    fn long_memo_uses_pushdata1() {
        let script = null_data(&[7u8; 80]);
        assert_eq!(&script.as_bytes()[..3], &[OP_RETURN, OP_PUSHDATA1, 80]);
        assert_eq!(script.len(), 83);
    }

    #[test]
    fn classify_scripts() {
        assert_eq!(p2pkh(&PKH).classify(), ScriptKind::P2pkh { pubkey_hash: PKH });
        let transfer =
            asset_transfer(&PKH, ChainSymbol::Ravencoin, "SATORI", Subunits::new(42)).unwrap();
        assert_eq!(
            transfer.classify(),
            ScriptKind::AssetTransfer {
                pubkey_hash: PKH,
                tag: *b"rvn",
                name: "SATORI".into(),
                amount: Subunits::new(42),
            }
        );
        assert_eq!(classify(&[0x51]), ScriptKind::Unknown);
    }

    #[test]
    fn truncated_asset_script_is_unknown() {
        let transfer =
            asset_transfer(&PKH, ChainSymbol::Ravencoin, "SATORI", Subunits::new(42)).unwrap();
        let bytes = transfer.as_bytes();
        assert_eq!(classify(&bytes[..bytes.len() - 1]), ScriptKind::Unknown);
    }
}
