//! Split-fee partial transactions.
//!
//! An originator holding the asset but too little currency signs every input
//! with [`SighashMode::ExtensibleInputs`] and fixes every output up front,
//! including the asset fee and the currency change owed to the completer. The
//! completer checks that the last two outputs match the quote, appends the one
//! currency output the quote reserved, signs it fully and broadcasts.
//!
//! Output layout of an originated transaction:
//!
//! ```text
//! [payments..] [asset change]? [protocol fee -> completer] [currency change -> completer]
//! ```

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use satchel_transactions::output::{self, CompiledOutput};
use satchel_transactions::{assemble, ChainOps, ScriptKind, SighashMode, Transaction};
use satchel_types::{Address, FeeRate, GatheredInputSet, KeyPair, ProtocolParams, Subunits, TxId};

use crate::error::{FailureKind, WalletError};
use crate::network::FeeQuote;
use crate::result::TransactionResult;

/// What an originator hands to a completer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialTransactionEnvelope {
    #[serde(with = "hex_bytes")]
    pub serialized_transaction: Vec<u8>,
    pub fee_sats_reserved: Subunits,
    pub reported_fee_sats: Subunits,
    pub completer_address: Address,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

impl PartialTransactionEnvelope {
    pub fn transaction(&self) -> Result<Transaction, WalletError> {
        Ok(Transaction::deserialize(&self.serialized_transaction)?)
    }

    pub fn to_json(&self) -> Result<String, WalletError> {
        serde_json::to_string(self).map_err(|e| WalletError::InvalidParameters(e.to_string()))
    }

    pub fn from_json(s: &str) -> Result<Self, WalletError> {
        serde_json::from_str(s).map_err(|e| WalletError::InvalidParameters(e.to_string()))
    }
}

/// Builds and signs the originator half.
pub struct Originator<'a, C: ChainOps + ?Sized> {
    pub chain: &'a C,
    pub keys: &'a KeyPair,
    pub own_address: &'a Address,
    pub asset_name: &'a str,
    pub params: &'a ProtocolParams,
    pub fee_rate: FeeRate,
}

impl<C: ChainOps + ?Sized> Originator<'_, C> {
    /// Append the completer's asset fee and currency change to `leading`,
    /// then sign every input as extensible.
    ///
    /// The fee estimate counts the input the completer will append.
    pub fn originate(
        &self,
        currency_inputs: GatheredInputSet,
        asset_inputs: GatheredInputSet,
        leading: Vec<CompiledOutput>,
        quote: &FeeQuote,
    ) -> Result<PartialTransactionEnvelope, WalletError> {
        let reserved = quote.fee_sats_reserved;
        if reserved.is_zero() || !self.chain.validate_address(quote.completer_address.as_str()) {
            return Err(WalletError::InvalidParameters(
                "fee quote lacks a reserved amount or a valid completer address".into(),
            ));
        }

        let mut outputs = leading;
        outputs.push(CompiledOutput::AssetPayment {
            address: quote.completer_address.clone(),
            asset: self.asset_name.to_string(),
            amount: self.params.protocol_fee,
        });

        let input_count = currency_inputs.len() + asset_inputs.len() + 1;
        let fee = self.fee_rate.estimated_fee(input_count, outputs.len());
        let destination = self
            .chain
            .script_from_address(quote.completer_address.as_str())?;
        let (change, residual) =
            output::redirected_change(destination, Subunits::ZERO, reserved, fee).ok_or(
                WalletError::InsufficientFunds {
                    needed: fee,
                    available: reserved,
                },
            )?;
        outputs.push(change);

        let reported = reserved.saturating_sub(residual);
        if reported >= self.params.completer_fee_ceiling {
            return Err(WalletError::FeeMismatch {
                reported,
                reserved,
            });
        }

        let draft = assemble(
            self.chain,
            self.own_address,
            currency_inputs,
            asset_inputs,
            None,
            outputs,
        )?;
        if draft.asset_in() < draft.asset_out() {
            return Err(WalletError::NegativeChange {
                gathered: draft.asset_in().raw(),
                spent: draft.asset_out().raw(),
            });
        }
        if draft.asset_in() > draft.asset_out() {
            return Err(WalletError::InvalidParameters(format!(
                "{} asset subunits would be burned",
                (draft.asset_in() - draft.asset_out()).raw()
            )));
        }

        let tx = draft.sign(self.chain, self.keys, SighashMode::ExtensibleInputs)?;
        info!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            reserved = %reserved,
            reported_fee = %reported,
            "originated partial transaction"
        );

        Ok(PartialTransactionEnvelope {
            serialized_transaction: tx.serialize(),
            fee_sats_reserved: reserved,
            reported_fee_sats: reported,
            completer_address: quote.completer_address.clone(),
        })
    }
}

/// Checks an envelope before the completer adds anything to it.
pub struct Completer<'a, C: ChainOps + ?Sized> {
    pub chain: &'a C,
    /// Where the completer's quote asked to be paid.
    pub own_address: &'a Address,
    pub asset_name: &'a str,
    pub params: &'a ProtocolParams,
}

impl<C: ChainOps + ?Sized> Completer<'_, C> {
    /// Verify the reported fee and the last two outputs, returning the
    /// decoded transaction. Any mismatch fails closed.
    ///
    /// The claim must pay `protocol_fee` of the asset and the change must pay
    /// `reserved - reported` in currency, both to `own_address`.
    pub fn verify(
        &self,
        envelope: &PartialTransactionEnvelope,
    ) -> Result<Transaction, WalletError> {
        let reported = envelope.reported_fee_sats;
        let reserved = envelope.fee_sats_reserved;
        let fee_mismatch = || {
            warn!(reported = %reported, reserved = %reserved, "rejected partial transaction fee");
            WalletError::FeeMismatch { reported, reserved }
        };
        let claim_mismatch = |reason: String| {
            warn!(%reason, "rejected partial transaction claim");
            WalletError::ClaimMismatch(reason)
        };

        if reported >= self.params.completer_fee_ceiling || reported >= reserved {
            return Err(fee_mismatch());
        }
        if &envelope.completer_address != self.own_address {
            return Err(claim_mismatch(format!(
                "envelope names completer {}",
                envelope.completer_address
            )));
        }
        let own_hash = self.chain.pubkey_hash(self.own_address.as_str())?;

        let tx = envelope.transaction()?;
        let [.., claim, change] = tx.outputs.as_slice() else {
            return Err(claim_mismatch(format!(
                "{} outputs, need at least 2",
                tx.outputs.len()
            )));
        };

        if change.value != reserved - reported {
            return Err(fee_mismatch());
        }
        match change.script_pubkey.classify() {
            ScriptKind::P2pkh { pubkey_hash } if pubkey_hash == own_hash => {}
            _ => return Err(claim_mismatch("last output does not pay the completer".into())),
        }

        let tag = self.chain.symbol().asset_tag();
        match claim.script_pubkey.classify() {
            ScriptKind::AssetTransfer {
                pubkey_hash,
                tag: claim_tag,
                name,
                amount,
            } if pubkey_hash == own_hash
                && claim_tag == tag
                && name == self.asset_name
                && amount == self.params.protocol_fee => {}
            _ => {
                return Err(claim_mismatch(format!(
                    "second-to-last output does not pay {} {} to the completer",
                    self.params.protocol_fee, self.asset_name
                )))
            }
        }

        Ok(tx)
    }
}

/// Progress of one partial send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NeedQuote,
    Originated,
    InFlight,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Tracks a partial send from quote to broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialSession {
    state: SessionState,
    envelope: Option<PartialTransactionEnvelope>,
    txid: Option<TxId>,
    failure: Option<FailureKind>,
}

impl Default for PartialSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::NeedQuote,
            envelope: None,
            txid: None,
            failure: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn envelope(&self) -> Option<&PartialTransactionEnvelope> {
        self.envelope.as_ref()
    }

    pub fn txid(&self) -> Option<TxId> {
        self.txid
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }

    fn transition(&mut self, expected: SessionState, to: SessionState) -> Result<(), WalletError> {
        if self.state != expected {
            return Err(WalletError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn originated(&mut self, envelope: PartialTransactionEnvelope) -> Result<(), WalletError> {
        self.transition(SessionState::NeedQuote, SessionState::Originated)?;
        self.envelope = Some(envelope);
        Ok(())
    }

    /// The envelope has been handed to the completer.
    pub fn dispatched(&mut self) -> Result<(), WalletError> {
        self.transition(SessionState::Originated, SessionState::InFlight)
    }

    pub fn completed(&mut self, txid: TxId) -> Result<(), WalletError> {
        self.transition(SessionState::InFlight, SessionState::Completed)?;
        self.txid = Some(txid);
        Ok(())
    }

    /// Advance from the result of an originating send or sweep.
    ///
    /// A quote request leaves the session waiting, an envelope originates it
    /// and a failure ends it.
    pub fn record(&mut self, result: &TransactionResult) -> Result<(), WalletError> {
        if result.is_quote_required() {
            if self.state != SessionState::NeedQuote {
                return Err(WalletError::InvalidTransition {
                    from: self.state,
                    to: SessionState::NeedQuote,
                });
            }
            return Ok(());
        }
        match (result.envelope(), result.kind) {
            (Some(envelope), _) => self.originated(envelope.clone()),
            (None, Some(kind)) => self.fail(kind),
            (None, None) => Err(WalletError::InvalidParameters(
                "result carries no partial transaction".into(),
            )),
        }
    }

    pub fn fail(&mut self, kind: FailureKind) -> Result<(), WalletError> {
        if self.state.is_terminal() {
            return Err(WalletError::InvalidTransition {
                from: self.state,
                to: SessionState::Failed,
            });
        }
        self.state = SessionState::Failed;
        self.failure = Some(kind);
        Ok(())
    }
}
