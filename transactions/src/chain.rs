//! Per-chain capabilities: key derivation, address scripts and input signing.
//!
//! Ravencoin and Evrmore share the transaction format and differ only in
//! address version bytes and the asset envelope tag, so both implementations
//! delegate to the provided trait methods.

use satchel_crypto::{
    address_from_pubkey, decode_address, hash160, keypair_from_seed, sign_digest, verify_digest,
};
use satchel_types::{Address, ChainSymbol, KeyPair, Network, PublicKey, Subunits, UnspentOutput};

use crate::error::TransactionError;
use crate::script::{self, push_data, Script, ScriptKind};
use crate::sighash::{signature_hash, SighashMode};
use crate::transaction::Transaction;

pub trait ChainOps {
    fn symbol(&self) -> ChainSymbol;

    fn network(&self) -> Network;

    fn derive_keypair(&self, seed: &[u8; 32]) -> Result<KeyPair, TransactionError> {
        Ok(keypair_from_seed(seed)?)
    }

    fn address_of(&self, public: &PublicKey) -> Address {
        address_from_pubkey(public, self.symbol(), self.network())
    }

    fn validate_address(&self, address: &str) -> bool {
        decode_address(address, self.symbol(), self.network()).is_ok()
    }

    fn pubkey_hash(&self, address: &str) -> Result<[u8; 20], TransactionError> {
        Ok(decode_address(address, self.symbol(), self.network())?)
    }

    /// Currency locking script paying `address`.
    fn script_from_address(&self, address: &str) -> Result<Script, TransactionError> {
        Ok(script::p2pkh(&self.pubkey_hash(address)?))
    }

    /// Asset transfer script paying `amount` of `asset` to `address`.
    fn asset_script_from_address(
        &self,
        address: &str,
        asset: &str,
        amount: Subunits,
    ) -> Result<Script, TransactionError> {
        script::asset_transfer(&self.pubkey_hash(address)?, self.symbol(), asset, amount)
    }

    /// Locking script of an output held by `owner`, used as the script code
    /// when signing the input that spends it.
    fn spend_script(
        &self,
        utxo: &UnspentOutput,
        owner: &Address,
    ) -> Result<Script, TransactionError> {
        match &utxo.asset_name {
            Some(name) => self.asset_script_from_address(owner.as_str(), name, utxo.value),
            None => self.script_from_address(owner.as_str()),
        }
    }

    /// Sign input `index` of `tx` in place.
    fn sign_input(
        &self,
        tx: &mut Transaction,
        index: usize,
        spend_script: &Script,
        keys: &KeyPair,
        mode: SighashMode,
    ) -> Result<(), TransactionError> {
        let digest = signature_hash(tx, index, spend_script, mode)?;
        let mut sig = sign_digest(&digest, &keys.private)?;
        sig.push(mode.flag());

        let mut unlocking = Vec::with_capacity(sig.len() + 35);
        push_data(&mut unlocking, &sig);
        push_data(&mut unlocking, keys.public.as_bytes());
        tx.inputs[index].script_sig = Script::new(unlocking);
        Ok(())
    }
}

/// Check the signature on input `index` against the script it spends.
///
/// Returns the sighash mode the input was signed with.
pub fn verify_input(
    tx: &Transaction,
    index: usize,
    spend_script: &Script,
) -> Result<SighashMode, TransactionError> {
    let input = tx.inputs.get(index).ok_or(TransactionError::InputIndexOutOfRange {
        index,
        count: tx.inputs.len(),
    })?;
    let malformed = || TransactionError::MalformedUnlockingScript(index);

    let (sig, pubkey) = split_unlocking(input.script_sig.as_bytes()).ok_or_else(malformed)?;
    let (flag, der) = sig.split_last().ok_or_else(malformed)?;
    let mode = SighashMode::from_flag(*flag)?;
    let pubkey = PublicKey(pubkey.try_into().map_err(|_| malformed())?);

    let expected_hash = match spend_script.classify() {
        ScriptKind::P2pkh { pubkey_hash } | ScriptKind::AssetTransfer { pubkey_hash, .. } => {
            pubkey_hash
        }
        _ => return Err(malformed()),
    };
    if hash160(pubkey.as_bytes()) != expected_hash {
        return Err(malformed());
    }

    let digest = signature_hash(tx, index, spend_script, mode)?;
    if verify_digest(&digest, der, &pubkey) {
        Ok(mode)
    } else {
        Err(malformed())
    }
}

fn split_unlocking(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let sig_len = *bytes.first()? as usize;
    let sig = bytes.get(1..1 + sig_len)?;
    let key_len = *bytes.get(1 + sig_len)? as usize;
    let key = bytes.get(2 + sig_len..2 + sig_len + key_len)?;
    if 2 + sig_len + key_len != bytes.len() {
        return None;
    }
    Some((sig, key))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ravencoin {
    pub network: Network,
}

impl ChainOps for Ravencoin {
    fn symbol(&self) -> ChainSymbol {
        ChainSymbol::Ravencoin
    }

    fn network(&self) -> Network {
        self.network
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Evrmore {
    pub network: Network,
}

impl ChainOps for Evrmore {
    fn symbol(&self) -> ChainSymbol {
        ChainSymbol::Evrmore
    }

    fn network(&self) -> Network {
        self.network
    }
}

/// Either chain, chosen at runtime from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnyChain {
    Ravencoin(Ravencoin),
    Evrmore(Evrmore),
}

impl AnyChain {
    pub fn new(symbol: ChainSymbol, network: Network) -> Self {
        match symbol {
            ChainSymbol::Ravencoin => Self::Ravencoin(Ravencoin { network }),
            ChainSymbol::Evrmore => Self::Evrmore(Evrmore { network }),
        }
    }
}

impl ChainOps for AnyChain {
    fn symbol(&self) -> ChainSymbol {
        match self {
            Self::Ravencoin(c) => c.symbol(),
            Self::Evrmore(c) => c.symbol(),
        }
    }

    fn network(&self) -> Network {
        match self {
            Self::Ravencoin(c) => c.network(),
            Self::Evrmore(c) => c.network(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{TxIn, TxOut};
    use satchel_types::{OutPoint, TxId};

    fn signed_fixture(mode: SighashMode) -> (Transaction, Script) {
        let chain = Ravencoin::default();
        let keys = chain.derive_keypair(&[11u8; 32]).unwrap();
        let owner = chain.address_of(&keys.public);
        let outpoint = OutPoint::new(TxId::new([1u8; 32]), 0);
        let utxo = UnspentOutput::currency(outpoint, Subunits::new(5000), 1);
        let spend = chain.spend_script(&utxo, &owner).unwrap();
        let mut tx = Transaction {
            inputs: vec![TxIn::unsigned(utxo.outpoint)],
            outputs: vec![TxOut {
                value: Subunits::new(4000),
                script_pubkey: chain.script_from_address(owner.as_str()).unwrap(),
            }],
            ..Transaction::default()
        };
        chain.sign_input(&mut tx, 0, &spend, &keys, mode).unwrap();
        (tx, spend)
    }

    #[test]
    fn signed_input_verifies() {
        let (tx, spend) = signed_fixture(SighashMode::Full);
        assert_eq!(verify_input(&tx, 0, &spend).unwrap(), SighashMode::Full);
    }

    #[test]
    fn extensible_signature_survives_appended_input() {
        let (mut tx, spend) = signed_fixture(SighashMode::ExtensibleInputs);
        tx.inputs
            .push(TxIn::unsigned(OutPoint::new(TxId::new([2u8; 32]), 4)));
        assert_eq!(
            verify_input(&tx, 0, &spend).unwrap(),
            SighashMode::ExtensibleInputs
        );
    }

    #[test]
    fn full_signature_breaks_on_appended_input() {
        let (mut tx, spend) = signed_fixture(SighashMode::Full);
        tx.inputs
            .push(TxIn::unsigned(OutPoint::new(TxId::new([2u8; 32]), 4)));
        assert!(verify_input(&tx, 0, &spend).is_err());
    }

    #[test]
    fn tampered_output_fails_verification() {
        let (mut tx, spend) = signed_fixture(SighashMode::ExtensibleInputs);
        tx.outputs[0].value = Subunits::new(4001);
        assert!(matches!(
            verify_input(&tx, 0, &spend),
            Err(TransactionError::MalformedUnlockingScript(0))
        ));
    }

    #[test]
    fn chain_rejects_foreign_address() {
        let rvn = Ravencoin::default();
        let evr = Evrmore::default();
        let keys = rvn.derive_keypair(&[3u8; 32]).unwrap();
        let rvn_addr = rvn.address_of(&keys.public);
        assert!(rvn.validate_address(rvn_addr.as_str()));
        assert!(!evr.validate_address(rvn_addr.as_str()));
        assert!(evr.script_from_address(rvn_addr.as_str()).is_err());
    }

    #[test]
    fn any_chain_dispatch() {
        let chain = AnyChain::new(ChainSymbol::Evrmore, Network::Testnet);
        assert_eq!(chain.symbol(), ChainSymbol::Evrmore);
        assert_eq!(chain.network(), Network::Testnet);
    }

    #[test]
    fn asset_spend_script_embeds_amount() {
        let chain = Evrmore::default();
        let keys = chain.derive_keypair(&[8u8; 32]).unwrap();
        let owner = chain.address_of(&keys.public);
        let utxo = UnspentOutput::asset(
            OutPoint::new(TxId::new([1u8; 32]), 2),
            "SATORI",
            Subunits::new(77),
            5,
        );
        match chain.spend_script(&utxo, &owner).unwrap().classify() {
            ScriptKind::AssetTransfer { tag, amount, .. } => {
                assert_eq!(&tag, b"evr");
                assert_eq!(amount, Subunits::new(77));
            }
            other => panic!("unexpected script kind {other:?}"),
        }
    }
}
