//! Nullable fee quote service.

use std::cell::Cell;

use satchel_types::{Address, ChainSymbol, Subunits};
use satchel_wallet_core::{FeeQuote, FeeQuoteService, WalletError};

/// Hands out the same quote every time and counts requests.
pub struct NullQuoteService {
    quote: FeeQuote,
    available: Cell<bool>,
    requests: Cell<usize>,
}

impl NullQuoteService {
    pub fn new(fee_sats_reserved: Subunits, completer_address: Address) -> Self {
        Self {
            quote: FeeQuote {
                fee_sats_reserved,
                completer_address,
            },
            available: Cell::new(true),
            requests: Cell::new(0),
        }
    }

    pub fn quote(&self) -> &FeeQuote {
        &self.quote
    }

    /// Make every following request fail.
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    pub fn request_count(&self) -> usize {
        self.requests.get()
    }
}

impl FeeQuoteService for NullQuoteService {
    fn request_quote(&self, _chain: ChainSymbol) -> Result<FeeQuote, WalletError> {
        self.requests.set(self.requests.get() + 1);
        if !self.available.get() {
            return Err(WalletError::Network("quote service unavailable".into()));
        }
        Ok(self.quote.clone())
    }
}
