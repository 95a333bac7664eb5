//! Unspent outputs as observed by the network collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::amount::Subunits;
use crate::hash::TxId;

/// Reference to one output of a prior transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxId,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: TxId, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// An unspent output held by the wallet.
///
/// For currency outputs `value` is the currency amount; for asset outputs it is
/// the asset amount (the currency value of an asset output is zero).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub outpoint: OutPoint,
    pub value: Subunits,
    #[serde(default)]
    pub asset_name: Option<String>,
    /// Block height of the confirming block, `0` while unconfirmed.
    #[serde(default)]
    pub height: u32,
}

impl UnspentOutput {
    pub fn currency(outpoint: OutPoint, value: Subunits, height: u32) -> Self {
        Self {
            outpoint,
            value,
            asset_name: None,
            height,
        }
    }

    pub fn asset(
        outpoint: OutPoint,
        name: impl Into<String>,
        value: Subunits,
        height: u32,
    ) -> Self {
        Self {
            outpoint,
            value,
            asset_name: Some(name.into()),
            height,
        }
    }

    pub fn is_asset(&self) -> bool {
        self.asset_name.is_some()
    }

    /// Whether this output holds `name`.
    pub fn holds_asset(&self, name: &str) -> bool {
        self.asset_name.as_deref() == Some(name)
    }

    pub fn is_confirmed(&self) -> bool {
        self.height > 0
    }
}

/// Inputs chosen by a selection pass, in selection order, with their total.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatheredInputSet {
    pub utxos: Vec<UnspentOutput>,
    pub total: Subunits,
}

impl GatheredInputSet {
    pub fn new(utxos: Vec<UnspentOutput>) -> Self {
        let total = utxos.iter().map(|u| u.value).sum();
        Self { utxos, total }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn push(&mut self, utxo: UnspentOutput) {
        self.total = self.total.saturating_add(utxo.value);
        self.utxos.push(utxo);
    }

    pub fn outpoints(&self) -> impl Iterator<Item = &OutPoint> {
        self.utxos.iter().map(|u| &u.outpoint)
    }
}
