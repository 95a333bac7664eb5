//! Collaborator contracts for the chain network and the fee-quote server.
//!
//! Both are blocking request/response interfaces. Timeouts, retries and
//! reconnection belong to the implementations.

use serde::{Deserialize, Serialize};

use satchel_types::{Address, ChainSymbol, Subunits, TxId};

use crate::error::WalletError;
use crate::state::WalletState;

pub trait NetworkClient {
    /// Current balances and unspent outputs of `address`.
    fn fetch_wallet_state(&self, address: &Address) -> Result<WalletState, WalletError>;

    /// Submit a raw transaction, returning its id.
    fn broadcast(&self, tx_hex: &str) -> Result<TxId, WalletError>;

    /// Whether the client can reach the network. The orchestrator does not
    /// broadcast while this is false.
    fn connected(&self) -> bool;
}

/// A completer's commitment to pay the currency fee of a partial transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    /// Value of the one currency output the completer will spend.
    pub fee_sats_reserved: Subunits,
    /// Where the completer takes its asset fee and currency change.
    pub completer_address: Address,
}

pub trait FeeQuoteService {
    fn request_quote(&self, chain: ChainSymbol) -> Result<FeeQuote, WalletError>;
}
