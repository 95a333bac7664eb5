//! Wallet core for Satchel.
//!
//! Moves a colored asset and the base currency of a UTXO chain:
//! - Input selection with a fee-aware fixed point
//! - Split-fee partial transactions (originator and completer halves)
//! - A per-wallet orchestrator for send, distribute, sweep and complete
//! - TOML configuration and a uniform result type

pub mod config;
pub mod error;
pub mod network;
pub mod orchestrator;
pub mod partial;
pub mod result;
pub mod selection;
pub mod state;

pub use config::WalletConfig;
pub use error::{FailureKind, WalletError};
pub use network::{FeeQuote, FeeQuoteService, NetworkClient};
pub use orchestrator::{SendRequest, TransactionOrchestrator};
pub use partial::{Completer, Originator, PartialSession, PartialTransactionEnvelope, SessionState};
pub use result::{TransactionPayload, TransactionResult};
pub use selection::{select_asset, select_currency, select_exact, CurrencyTarget, SelectionOrder};
pub use state::WalletState;
