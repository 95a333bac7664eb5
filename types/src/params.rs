//! Protocol parameters shared by the originator and completer roles.

use serde::{Deserialize, Serialize};

use crate::amount::Subunits;

/// Most recipients a single distribution transaction may pay.
pub const MAX_DISTRIBUTION_RECIPIENTS: usize = 1000;

/// Largest memo payload accepted in a return-data output.
pub const MAX_MEMO_BYTES: usize = 80;

/// Longest asset name the chains accept.
pub const MAX_ASSET_NAME_LEN: usize = 30;

/// Default colored asset moved by the wallet.
pub const DEFAULT_ASSET_NAME: &str = "SATORI";

/// Parameters both parties of a partial transaction must agree on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Asset paid to whoever completes a partial transaction.
    pub protocol_fee: Subunits,
    /// Completers refuse any reported fee at or above this bound.
    pub completer_fee_ceiling: Subunits,
    /// Upper bound on recipients per distribution.
    pub max_recipients: usize,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            protocol_fee: Subunits::ONE_UNIT,
            completer_fee_ceiling: Subunits::ONE_UNIT,
            max_recipients: MAX_DISTRIBUTION_RECIPIENTS,
        }
    }
}

impl ProtocolParams {
    /// Parameters with a protocol fee of `units` whole asset units.
    pub fn with_protocol_fee_units(units: u64) -> Option<Self> {
        Some(Self {
            protocol_fee: Subunits::from_units(units)?,
            ..Self::default()
        })
    }
}
