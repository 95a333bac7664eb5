//! Transaction assembly: gathered inputs and compiled outputs become an
//! unsigned draft, which is then signed input by input.

use std::collections::HashSet;

use satchel_types::{Address, GatheredInputSet, KeyPair, Subunits, UnspentOutput};
use tracing::debug;

use crate::chain::ChainOps;
use crate::error::TransactionError;
use crate::output::CompiledOutput;
use crate::script::Script;
use crate::sighash::SighashMode;
use crate::transaction::{Transaction, TxIn};

/// An assembled transaction awaiting signatures.
///
/// Inputs are laid out currency first, then asset, and `spend_scripts[i]` is
/// the locking script spent by input `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionDraft {
    pub currency_inputs: GatheredInputSet,
    pub asset_inputs: GatheredInputSet,
    pub outputs: Vec<CompiledOutput>,
    pub spend_scripts: Vec<Script>,
    pub tx: Transaction,
}

/// Build an unsigned draft.
///
/// When `spend_scripts` is `None` they are derived from `owner`, which must hold
/// every input.
pub fn assemble<C: ChainOps + ?Sized>(
    chain: &C,
    owner: &Address,
    currency_inputs: GatheredInputSet,
    asset_inputs: GatheredInputSet,
    spend_scripts: Option<Vec<Script>>,
    outputs: Vec<CompiledOutput>,
) -> Result<TransactionDraft, TransactionError> {
    if let Some(utxo) = currency_inputs.utxos.iter().find(|u| u.is_asset()) {
        return Err(TransactionError::InputMismatch(format!(
            "{} holds an asset but was gathered as currency",
            utxo.outpoint
        )));
    }
    if let Some(utxo) = asset_inputs.utxos.iter().find(|u| !u.is_asset()) {
        return Err(TransactionError::InputMismatch(format!(
            "{} holds currency but was gathered as an asset",
            utxo.outpoint
        )));
    }

    let mut seen = HashSet::new();
    for outpoint in currency_inputs.outpoints().chain(asset_inputs.outpoints()) {
        if !seen.insert(*outpoint) {
            return Err(TransactionError::InputMismatch(format!(
                "{outpoint} gathered twice"
            )));
        }
    }

    let all_inputs: Vec<&UnspentOutput> = currency_inputs
        .utxos
        .iter()
        .chain(asset_inputs.utxos.iter())
        .collect();
    let spend_scripts = match spend_scripts {
        Some(scripts) if scripts.len() != all_inputs.len() => {
            return Err(TransactionError::InputMismatch(format!(
                "{} spend scripts for {} inputs",
                scripts.len(),
                all_inputs.len()
            )));
        }
        Some(scripts) => scripts,
        None => all_inputs
            .iter()
            .map(|utxo| chain.spend_script(utxo, owner))
            .collect::<Result<_, _>>()?,
    };

    let tx = Transaction {
        inputs: all_inputs
            .iter()
            .map(|utxo| TxIn::unsigned(utxo.outpoint))
            .collect(),
        outputs: outputs
            .iter()
            .map(|o| o.to_tx_out(chain))
            .collect::<Result<_, _>>()?,
        ..Transaction::default()
    };

    debug!(
        inputs = tx.inputs.len(),
        outputs = tx.outputs.len(),
        "assembled transaction draft"
    );

    Ok(TransactionDraft {
        currency_inputs,
        asset_inputs,
        outputs,
        spend_scripts,
        tx,
    })
}

impl TransactionDraft {
    pub fn currency_in(&self) -> Subunits {
        self.currency_inputs.total
    }

    pub fn currency_out(&self) -> Subunits {
        self.outputs.iter().map(CompiledOutput::currency_value).sum()
    }

    pub fn asset_in(&self) -> Subunits {
        self.asset_inputs.total
    }

    pub fn asset_out(&self) -> Subunits {
        self.outputs.iter().map(CompiledOutput::asset_value).sum()
    }

    /// Currency left to miners, `None` if outputs exceed inputs.
    pub fn implied_fee(&self) -> Option<Subunits> {
        self.currency_in().checked_sub(self.currency_out())
    }

    /// Check that assets balance exactly and currency inputs pay at least
    /// `min_fee` over the currency outputs.
    pub fn ensure_balanced(&self, min_fee: Subunits) -> Result<(), TransactionError> {
        if self.asset_in() != self.asset_out() {
            return Err(TransactionError::InputMismatch(format!(
                "asset inputs {} do not match asset outputs {}",
                self.asset_in(),
                self.asset_out()
            )));
        }
        let spent = self.currency_out().saturating_add(min_fee);
        if self.currency_in() < spent {
            return Err(TransactionError::NegativeChange {
                gathered: self.currency_in().raw(),
                spent: spent.raw(),
            });
        }
        Ok(())
    }

    /// Sign every input with `keys` under `mode`.
    pub fn sign<C: ChainOps + ?Sized>(
        self,
        chain: &C,
        keys: &KeyPair,
        mode: SighashMode,
    ) -> Result<Transaction, TransactionError> {
        let mut tx = self.tx;
        for (index, script) in self.spend_scripts.iter().enumerate() {
            chain.sign_input(&mut tx, index, script, keys, mode)?;
        }
        Ok(tx)
    }
}

/// Append an input spending `utxo` and sign only that input.
///
/// Signatures already present survive when they were made with
/// [`SighashMode::ExtensibleInputs`].
pub fn append_signed_input<C: ChainOps + ?Sized>(
    chain: &C,
    tx: &mut Transaction,
    utxo: &UnspentOutput,
    spend_script: &Script,
    keys: &KeyPair,
    mode: SighashMode,
) -> Result<(), TransactionError> {
    if tx.inputs.iter().any(|i| i.prevout == utxo.outpoint) {
        return Err(TransactionError::InputMismatch(format!(
            "{} already spent by this transaction",
            utxo.outpoint
        )));
    }
    tx.inputs.push(TxIn::unsigned(utxo.outpoint));
    let index = tx.inputs.len() - 1;
    chain.sign_input(tx, index, spend_script, keys, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{verify_input, Ravencoin};
    use crate::output::{asset_change, asset_payments, currency_change};
    use satchel_types::{OutPoint, TxId};

    struct Fixture {
        chain: Ravencoin,
        keys: KeyPair,
        owner: Address,
    }

    fn fixture() -> Fixture {
        let chain = Ravencoin::default();
        let keys = chain.derive_keypair(&[21u8; 32]).unwrap();
        let owner = chain.address_of(&keys.public);
        Fixture { chain, keys, owner }
    }

    fn op(n: u8) -> OutPoint {
        OutPoint::new(TxId::new([n; 32]), 0)
    }

    fn currency(n: u8, value: u64) -> GatheredInputSet {
        GatheredInputSet::new(vec![UnspentOutput::currency(op(n), Subunits::new(value), 1)])
    }

    fn satori(n: u8, value: u64) -> GatheredInputSet {
        GatheredInputSet::new(vec![UnspentOutput::asset(op(n), "SATORI", Subunits::new(value), 1)])
    }

    #[test]
    fn currency_inputs_precede_asset_inputs() {
        let f = fixture();
        let draft =
            assemble(&f.chain, &f.owner, currency(1, 10_000), satori(2, 50), None, vec![]).unwrap();
        assert_eq!(draft.tx.inputs[0].prevout, op(1));
        assert_eq!(draft.tx.inputs[1].prevout, op(2));
        assert_eq!(draft.spend_scripts.len(), 2);
    }

    #[test]
    fn duplicate_outpoint_rejected() {
        let f = fixture();
        let utxo = UnspentOutput::currency(op(1), Subunits::new(10), 1);
        let set = GatheredInputSet::new(vec![utxo.clone(), utxo]);
        assert!(matches!(
            assemble(&f.chain, &f.owner, set, GatheredInputSet::empty(), None, vec![]),
            Err(TransactionError::InputMismatch(_))
        ));
    }

    #[test]
    fn asset_in_currency_set_rejected() {
        let f = fixture();
        let set = satori(1, 10);
        let empty = GatheredInputSet::empty();
        assert!(assemble(&f.chain, &f.owner, set, empty, None, vec![]).is_err());
    }

    #[test]
    fn spend_script_count_must_match() {
        let f = fixture();
        let set = currency(1, 10);
        assert!(assemble(
            &f.chain,
            &f.owner,
            set,
            GatheredInputSet::empty(),
            Some(vec![]),
            vec![]
        )
        .is_err());
    }

    #[test]
    fn balanced_asset_send_signs_and_verifies() {
        let f = fixture();
        let recipient = f.chain.address_of(&f.chain.derive_keypair(&[22u8; 32]).unwrap().public);
        let currency = currency(1, 100_000);
        let asset = satori(2, 500);
        let fee = Subunits::new(1_000);

        let mut outputs = asset_payments("SATORI", &[(recipient, Subunits::new(300))]);
        outputs.extend(asset_change(&f.owner, "SATORI", Subunits::new(300), asset.total).unwrap());
        outputs.extend(currency_change(&f.owner, Subunits::ZERO, currency.total, fee));

        let draft = assemble(&f.chain, &f.owner, currency, asset, None, outputs).unwrap();
        draft.ensure_balanced(fee).unwrap();
        assert_eq!(draft.implied_fee(), Some(fee));

        let scripts = draft.spend_scripts.clone();
        let tx = draft.sign(&f.chain, &f.keys, SighashMode::Full).unwrap();
        assert!(tx.is_fully_signed());
        for (i, script) in scripts.iter().enumerate() {
            assert_eq!(verify_input(&tx, i, script).unwrap(), SighashMode::Full);
        }
    }

    #[test]
    fn unbalanced_currency_detected() {
        let f = fixture();
        let outputs = vec![CompiledOutput::CurrencyPayment {
            address: f.owner.clone(),
            amount: Subunits::new(90),
        }];
        let draft = assemble(
            &f.chain,
            &f.owner,
            currency(1, 100),
            GatheredInputSet::empty(),
            None,
            outputs,
        )
        .unwrap();
        assert!(matches!(
            draft.ensure_balanced(Subunits::new(20)),
            Err(TransactionError::NegativeChange { gathered: 100, spent: 110 })
        ));
    }

    #[test]
    fn appended_input_keeps_extensible_signatures() {
        let f = fixture();
        let outputs = asset_payments("SATORI", &[(f.owner.clone(), Subunits::new(5))]);
        let draft =
            assemble(&f.chain, &f.owner, GatheredInputSet::empty(), satori(2, 5), None, outputs)
                .unwrap();
        let first_script = draft.spend_scripts[0].clone();
        let mut tx = draft
            .sign(&f.chain, &f.keys, SighashMode::ExtensibleInputs)
            .unwrap();

        let extra = UnspentOutput::currency(op(3), Subunits::new(9_000), 1);
        let extra_script = f.chain.spend_script(&extra, &f.owner).unwrap();
        append_signed_input(&f.chain, &mut tx, &extra, &extra_script, &f.keys, SighashMode::Full)
            .unwrap();

        assert_eq!(tx.inputs.len(), 2);
        assert!(verify_input(&tx, 0, &first_script).is_ok());
        assert!(verify_input(&tx, 1, &extra_script).is_ok());
        let mode = SighashMode::Full;
        let again = append_signed_input(&f.chain, &mut tx, &extra, &extra_script, &f.keys, mode);
        assert!(again.is_err());
    }
}
