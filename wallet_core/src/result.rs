//! The uniform result returned by every orchestrator operation.

use serde::{Deserialize, Serialize};

use satchel_types::{Subunits, TxId};

use crate::error::{FailureKind, WalletError};
use crate::partial::{PartialTransactionEnvelope, SessionState};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TransactionPayload {
    TxId(TxId),
    Partial(PartialTransactionEnvelope),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub success: bool,
    pub payload: Option<TransactionPayload>,
    pub message: String,
    pub reported_fee_sats: Option<Subunits>,
    /// Why no payload was produced. `QuoteRequired` accompanies `success`.
    pub kind: Option<FailureKind>,
    /// Where the split-fee protocol stands, for results that take part in it.
    pub session: Option<SessionState>,
}

impl TransactionResult {
    pub fn broadcast(txid: TxId) -> Self {
        Self {
            success: true,
            payload: Some(TransactionPayload::TxId(txid)),
            message: format!("broadcast {txid}"),
            reported_fee_sats: None,
            kind: None,
            session: None,
        }
    }

    pub fn partial(envelope: PartialTransactionEnvelope) -> Self {
        let reported = envelope.reported_fee_sats;
        Self {
            success: true,
            payload: Some(TransactionPayload::Partial(envelope)),
            message: "partial transaction requires a completer to pay the fee".into(),
            reported_fee_sats: Some(reported),
            kind: None,
            session: Some(SessionState::Originated),
        }
    }

    /// Not a failure: fetch a fee quote and call again.
    pub fn quote_required() -> Self {
        Self {
            success: true,
            payload: None,
            message: "fee quote required, try again with a quote".into(),
            reported_fee_sats: None,
            kind: Some(FailureKind::QuoteRequired),
            session: Some(SessionState::NeedQuote),
        }
    }

    pub fn failed(err: &WalletError) -> Self {
        if matches!(err, WalletError::QuoteRequired) {
            return Self::quote_required();
        }
        Self {
            success: false,
            payload: None,
            message: format!("send failed: {err}"),
            reported_fee_sats: None,
            kind: Some(err.kind()),
            session: None,
        }
    }

    pub fn with_session(mut self, state: SessionState) -> Self {
        self.session = Some(state);
        self
    }

    pub fn from_outcome(outcome: Result<Self, WalletError>) -> Self {
        outcome.unwrap_or_else(|e| Self::failed(&e))
    }

    pub fn txid(&self) -> Option<TxId> {
        match &self.payload {
            Some(TransactionPayload::TxId(txid)) => Some(*txid),
            _ => None,
        }
    }

    pub fn envelope(&self) -> Option<&PartialTransactionEnvelope> {
        match &self.payload {
            Some(TransactionPayload::Partial(envelope)) => Some(envelope),
            _ => None,
        }
    }

    pub fn is_quote_required(&self) -> bool {
        self.success && self.kind == Some(FailureKind::QuoteRequired)
    }
}
