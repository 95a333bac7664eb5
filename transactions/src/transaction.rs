//! The wire transaction model and its exact binary encoding.

use satchel_crypto::sha256d;
use satchel_types::{OutPoint, Subunits, TxId};

use crate::encode::{write_bytes, write_varint, Reader};
use crate::error::TransactionError;
use crate::script::Script;

pub const TX_VERSION: i32 = 2;
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub prevout: OutPoint,
    /// Unlocking script; empty until the input is signed.
    pub script_sig: Script,
    pub sequence: u32,
}

impl TxIn {
    pub fn unsigned(prevout: OutPoint) -> Self {
        Self {
            prevout,
            script_sig: Script::default(),
            sequence: SEQUENCE_FINAL,
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.script_sig.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: Subunits,
    pub script_pubkey: Script,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }
}

impl Transaction {
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(10 + self.inputs.len() * 150 + self.outputs.len() * 40);
        buf.extend_from_slice(&self.version.to_le_bytes());
        write_varint(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(input.prevout.txid.as_bytes());
            buf.extend_from_slice(&input.prevout.vout.to_le_bytes());
            write_bytes(&mut buf, input.script_sig.as_bytes());
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_varint(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.raw().to_le_bytes());
            write_bytes(&mut buf, output.script_pubkey.as_bytes());
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    /// Parse a serialized transaction. The whole buffer must be consumed.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut r = Reader::new(bytes);
        let version = r.read_i32()?;

        let input_count = r.read_varint()?;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            let txid = TxId::new(r.read_array()?);
            let vout = r.read_u32()?;
            let script_sig = Script::new(r.read_bytes()?);
            let sequence = r.read_u32()?;
            inputs.push(TxIn {
                prevout: OutPoint::new(txid, vout),
                script_sig,
                sequence,
            });
        }

        let output_count = r.read_varint()?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            let value = Subunits::new(r.read_u64()?);
            let script_pubkey = Script::new(r.read_bytes()?);
            outputs.push(TxOut {
                value,
                script_pubkey,
            });
        }

        let lock_time = r.read_u32()?;
        if r.remaining() > 0 {
            return Err(TransactionError::TrailingBytes {
                count: r.remaining(),
            });
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    pub fn txid(&self) -> TxId {
        TxId::new(sha256d(&self.serialize()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    pub fn from_hex(s: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TransactionError::InvalidHex(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    /// Sum of all output values (asset outputs carry zero).
    pub fn output_value(&self) -> Subunits {
        self.outputs.iter().map(|o| o.value).sum()
    }

    pub fn is_fully_signed(&self) -> bool {
        !self.inputs.is_empty() && self.inputs.iter().all(TxIn::is_signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{null_data, p2pkh};

    fn sample() -> Transaction {
        Transaction {
            version: TX_VERSION,
            inputs: vec![
                TxIn::unsigned(OutPoint::new(TxId::new([1u8; 32]), 0)),
                TxIn {
                    prevout: OutPoint::new(TxId::new([2u8; 32]), 3),
                    script_sig: Script::new(vec![0x01, 0xff]),
                    sequence: 7,
                },
            ],
            outputs: vec![
                TxOut {
                    value: Subunits::new(12_345),
                    script_pubkey: p2pkh(&[9u8; 20]),
                },
                TxOut {
                    value: Subunits::ZERO,
                    script_pubkey: null_data(b"memo"),
                },
            ],
            lock_time: 0,
        }
    }

    #[test]
    fn serialize_roundtrip_is_byte_identical() {
        let tx = sample();
        let bytes = tx.serialize();
        let parsed = Transaction::deserialize(&bytes).unwrap();
        assert_eq!(parsed, tx);
        assert_eq!(parsed.serialize(), bytes);
        assert_eq!(parsed.txid(), tx.txid());
    }

    #[test]
    fn empty_transaction_layout() {
        let tx = Transaction::default();
        assert_eq!(hex::encode(tx.serialize()), "02000000000000000000");
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = sample().serialize();
        bytes.push(0);
        assert_eq!(
            Transaction::deserialize(&bytes),
            Err(TransactionError::TrailingBytes { count: 1 })
        );
    }

    #[test]
    fn truncated_rejected() {
        let bytes = sample().serialize();
        assert!(matches!(
            Transaction::deserialize(&bytes[..bytes.len() - 2]),
            Err(TransactionError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn hex_roundtrip() {
        let tx = sample();
        assert_eq!(Transaction::from_hex(&tx.to_hex()).unwrap(), tx);
        assert!(matches!(
            Transaction::from_hex("zz"),
            Err(TransactionError::InvalidHex(_))
        ));
    }

    #[test]
    fn signed_state() {
        let tx = sample();
        assert!(!tx.is_fully_signed());
        assert_eq!(tx.output_value(), Subunits::new(12_345));
    }
}
