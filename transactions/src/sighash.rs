//! Legacy signature hashing.
//!
//! `Full` commits to every input and every output. `ExtensibleInputs` commits to
//! the signed input and every output only, so further inputs can be appended
//! later without invalidating the signature.

use serde::{Deserialize, Serialize};

use satchel_crypto::sha256d;

use crate::error::TransactionError;
use crate::script::Script;
use crate::transaction::Transaction;

const SIGHASH_ALL: u8 = 0x01;
const SIGHASH_ANYONECANPAY: u8 = 0x80;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SighashMode {
    /// Commit to all inputs and outputs.
    Full,
    /// Commit to this input and all outputs.
    ExtensibleInputs,
}

impl SighashMode {
    pub fn flag(&self) -> u8 {
        match self {
            Self::Full => SIGHASH_ALL,
            Self::ExtensibleInputs => SIGHASH_ALL | SIGHASH_ANYONECANPAY,
        }
    }

    pub fn from_flag(flag: u8) -> Result<Self, TransactionError> {
        match flag {
            SIGHASH_ALL => Ok(Self::Full),
            f if f == SIGHASH_ALL | SIGHASH_ANYONECANPAY => Ok(Self::ExtensibleInputs),
            other => Err(TransactionError::UnknownSighashFlag(other)),
        }
    }
}

/// Digest signed for input `index`, with `script_code` standing in for that
/// input's unlocking script.
pub fn signature_hash(
    tx: &Transaction,
    index: usize,
    script_code: &Script,
    mode: SighashMode,
) -> Result<[u8; 32], TransactionError> {
    if index >= tx.inputs.len() {
        return Err(TransactionError::InputIndexOutOfRange {
            index,
            count: tx.inputs.len(),
        });
    }

    let mut copy = tx.clone();
    for (i, input) in copy.inputs.iter_mut().enumerate() {
        input.script_sig = if i == index {
            script_code.clone()
        } else {
            Script::default()
        };
    }
    if mode == SighashMode::ExtensibleInputs {
        let signed = copy.inputs.swap_remove(index);
        copy.inputs = vec![signed];
    }

    let mut preimage = copy.serialize();
    preimage.extend_from_slice(&(mode.flag() as u32).to_le_bytes());
    Ok(sha256d(&preimage))
}
