//! Nullable network: serve a fixed wallet state and record broadcasts.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use satchel_transactions::Transaction;
use satchel_types::{Address, OutPoint, TxId};
use satchel_wallet_core::{NetworkClient, WalletError, WalletState};

/// A test network that records broadcasts instead of sending them.
///
/// The served state does not change on broadcast. Call
/// [`NullNetwork::confirm_broadcasts`] to drop spent outputs the way a real
/// node would once the transactions are seen.
///
/// The connection flag is only reported through `connected()`. Refusing to
/// broadcast while disconnected is the caller's job.
pub struct NullNetwork {
    state: RefCell<WalletState>,
    /// Hex of every transaction "broadcast" so far.
    broadcasts: RefCell<Vec<String>>,
    /// Message for the next broadcast failure, if one is armed.
    fail_next: RefCell<Option<String>>,
    /// Message for the next fetch failure, if one is armed.
    fail_next_fetch: RefCell<Option<String>>,
    connected: Cell<bool>,
    fetches: Cell<usize>,
}

impl NullNetwork {
    pub fn new(state: WalletState) -> Self {
        Self {
            state: RefCell::new(state),
            broadcasts: RefCell::new(Vec::new()),
            fail_next: RefCell::new(None),
            fail_next_fetch: RefCell::new(None),
            connected: Cell::new(true),
            fetches: Cell::new(0),
        }
    }

    /// Replace the state served to the wallet.
    pub fn set_state(&self, state: WalletState) {
        *self.state.borrow_mut() = state;
    }

    /// Make the next broadcast fail with `message`.
    pub fn fail_next_broadcast(&self, message: impl Into<String>) {
        *self.fail_next.borrow_mut() = Some(message.into());
    }

    /// Make the next state fetch fail with `message`.
    pub fn fail_next_fetch(&self, message: impl Into<String>) {
        *self.fail_next_fetch.borrow_mut() = Some(message.into());
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }

    /// Get all broadcast transaction hexes (for assertions).
    pub fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.borrow().clone()
    }

    /// Decoded form of every broadcast.
    pub fn broadcast_transactions(&self) -> Vec<Transaction> {
        self.broadcasts
            .borrow()
            .iter()
            .filter_map(|hex| Transaction::from_hex(hex).ok())
            .collect()
    }

    pub fn last_broadcast(&self) -> Option<Transaction> {
        self.broadcast_transactions().pop()
    }

    /// Number of state fetches served.
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }

    /// Remove every output spent by a recorded broadcast from the served state.
    pub fn confirm_broadcasts(&self) {
        let spent: HashSet<OutPoint> = self
            .broadcast_transactions()
            .iter()
            .flat_map(|tx| tx.inputs.iter().map(|i| i.prevout))
            .collect();
        let next = self.state.borrow().without_spent(&spent);
        self.set_state(next);
    }

    /// Clear recorded broadcasts and any armed failures.
    pub fn reset(&self) {
        self.broadcasts.borrow_mut().clear();
        self.fail_next.borrow_mut().take();
        self.fail_next_fetch.borrow_mut().take();
    }
}

impl NetworkClient for NullNetwork {
    fn fetch_wallet_state(&self, _address: &Address) -> Result<WalletState, WalletError> {
        if let Some(message) = self.fail_next_fetch.borrow_mut().take() {
            return Err(WalletError::Network(message));
        }
        self.fetches.set(self.fetches.get() + 1);
        Ok(self.state.borrow().clone())
    }

    fn broadcast(&self, tx_hex: &str) -> Result<TxId, WalletError> {
        if let Some(message) = self.fail_next.borrow_mut().take() {
            return Err(WalletError::BroadcastFailure(message));
        }
        let tx = Transaction::from_hex(tx_hex)
            .map_err(|e| WalletError::BroadcastFailure(format!("rejected: {e}")))?;
        self.broadcasts.borrow_mut().push(tx_hex.to_string());
        Ok(tx.txid())
    }

    fn connected(&self) -> bool {
        self.connected.get()
    }
}

impl Default for NullNetwork {
    fn default() -> Self {
        Self::new(WalletState::default())
    }
}
