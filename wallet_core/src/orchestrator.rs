//! The transaction orchestrator: one entry point per payment intent.
//!
//! Every build runs under a single per-wallet lock. The snapshot is refreshed
//! from the network first, and outputs spent by this wallet stay hidden from
//! later builds until the network stops reporting them.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use satchel_transactions::output::{self, CompiledOutput};
use satchel_transactions::{append_signed_input, assemble, ChainOps, SighashMode, Transaction};
use satchel_types::{
    is_divisibility_valid, Address, GatheredInputSet, KeyPair, OutPoint, ProtocolParams, Subunits,
    TxId, UnspentOutput,
};

use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::network::{FeeQuote, FeeQuoteService, NetworkClient};
use crate::partial::{
    Completer, Originator, PartialSession, PartialTransactionEnvelope, SessionState,
};
use crate::result::TransactionResult;
use crate::selection::{
    select_asset, select_currency, select_exact, CurrencyTarget, SelectionOrder,
};
use crate::state::WalletState;

/// Decimal places of the base currency.
const CURRENCY_DIVISIBILITY: u8 = 8;

/// An asset send to one address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendRequest {
    /// Decimal asset amount, e.g. `"5"` or `"0.25"`.
    pub amount: String,
    pub address: String,
    /// Take the protocol fee out of `amount` when a partial is needed.
    pub pull_fee_from_amount: bool,
}

impl SendRequest {
    pub fn new(amount: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            address: address.into(),
            pull_fee_from_amount: false,
        }
    }

    pub fn pull_fee_from_amount(mut self) -> Self {
        self.pull_fee_from_amount = true;
        self
    }
}

struct Inner {
    state: WalletState,
    pending_spent: HashSet<OutPoint>,
    rng: StdRng,
}

pub struct TransactionOrchestrator<C: ChainOps, N: NetworkClient> {
    config: WalletConfig,
    chain: C,
    keys: KeyPair,
    address: Address,
    network: N,
    params: ProtocolParams,
    reserve: Subunits,
    inner: Mutex<Inner>,
}

impl<C: ChainOps, N: NetworkClient> TransactionOrchestrator<C, N> {
    pub fn new(
        config: WalletConfig,
        chain: C,
        keys: KeyPair,
        network: N,
    ) -> Result<Self, WalletError> {
        Self::with_rng(config, chain, keys, network, StdRng::from_entropy())
    }

    /// Like [`Self::new`] with a fixed random source for selection order.
    pub fn with_rng(
        config: WalletConfig,
        chain: C,
        keys: KeyPair,
        network: N,
        rng: StdRng,
    ) -> Result<Self, WalletError> {
        config.validate()?;
        if chain.symbol() != config.chain || chain.network() != config.network {
            return Err(WalletError::Config(format!(
                "configured for {} {} but given {} {}",
                config.chain,
                config.network.as_str(),
                chain.symbol(),
                chain.network().as_str()
            )));
        }
        let address = chain.address_of(&keys.public);
        let params = config.protocol_params()?;
        let reserve = config.reserve_subunits()?;
        Ok(Self {
            config,
            chain,
            keys,
            address,
            network,
            params,
            reserve,
            inner: Mutex::new(Inner {
                state: WalletState::default(),
                pending_spent: HashSet::new(),
                rng,
            }),
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// The current snapshot.
    pub fn state(&self) -> WalletState {
        self.lock().state.clone()
    }

    /// Replace the snapshot with a fresh one from the network.
    pub fn refresh(&self) -> Result<WalletState, WalletError> {
        let mut inner = self.lock();
        self.refresh_locked(&mut inner)?;
        Ok(inner.state.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn refresh_locked(&self, inner: &mut Inner) -> Result<(), WalletError> {
        let fetched = self.network.fetch_wallet_state(&self.address)?;
        let listed: HashSet<OutPoint> = fetched
            .unspent_currency
            .iter()
            .chain(fetched.unspent_assets.iter())
            .map(|u| u.outpoint)
            .collect();
        inner.pending_spent.retain(|op| listed.contains(op));
        inner.state = fetched.without_spent(&inner.pending_spent);
        debug!(
            currency = %inner.state.currency,
            asset = %inner.state.asset,
            hidden = inner.pending_spent.len(),
            "refreshed wallet state"
        );
        Ok(())
    }

    fn order(&self) -> SelectionOrder {
        SelectionOrder::from_random_flag(self.config.random_selection)
    }

    fn parse_amount(&self, amount: &str, divisibility: u8) -> Result<Subunits, WalletError> {
        if !is_divisibility_valid(amount, divisibility) {
            return Err(WalletError::InvalidParameters(format!(
                "amount {amount:?} is not valid at {divisibility} decimal places"
            )));
        }
        let value = Subunits::parse_decimal(amount)?;
        if value.is_zero() {
            return Err(WalletError::InvalidParameters("amount must be positive".into()));
        }
        Ok(value)
    }

    fn parse_address(&self, address: &str) -> Result<Address, WalletError> {
        if !self.chain.validate_address(address) {
            return Err(WalletError::InvalidParameters(format!(
                "{address:?} is not a {} {} address",
                self.chain.symbol(),
                self.chain.network().as_str()
            )));
        }
        Ok(Address::new(address))
    }

    fn asset_outputs(&self, state: &WalletState) -> Vec<UnspentOutput> {
        state.asset_outputs(&self.config.asset_name).cloned().collect()
    }

    fn originator(&self) -> Originator<'_, C> {
        Originator {
            chain: &self.chain,
            keys: &self.keys,
            own_address: &self.address,
            asset_name: &self.config.asset_name,
            params: &self.params,
            fee_rate: self.config.fee_rate,
        }
    }

    /// Gather fee-paying currency, add change, sign fully and broadcast.
    ///
    /// `outputs` are the non-change outputs; `memo` goes after the change.
    fn fund_and_broadcast(
        &self,
        inner: &mut Inner,
        asset_inputs: GatheredInputSet,
        mut outputs: Vec<CompiledOutput>,
        currency_spent: Subunits,
        memo: Option<CompiledOutput>,
    ) -> Result<TxId, WalletError> {
        let counted_outputs = outputs.len() + usize::from(memo.is_some());
        let target = CurrencyTarget {
            target: currency_spent,
            reserved_inputs: asset_inputs.len(),
            reserved_outputs: counted_outputs,
            reserve_floor: self.reserve,
            fee_rate: self.config.fee_rate,
        };
        let currency_inputs = select_currency(
            &inner.state.unspent_currency,
            target,
            self.order(),
            &mut inner.rng,
        )?;

        let fee = self
            .config
            .fee_rate
            .estimated_fee(currency_inputs.len() + asset_inputs.len(), counted_outputs);
        outputs.extend(output::currency_change(
            &self.address,
            currency_spent,
            currency_inputs.total,
            fee,
        ));
        outputs.extend(memo);

        let draft = assemble(
            &self.chain,
            &self.address,
            currency_inputs,
            asset_inputs,
            None,
            outputs,
        )?;
        draft.ensure_balanced(fee)?;
        let tx = draft.sign(&self.chain, &self.keys, SighashMode::Full)?;
        self.broadcast(inner, &tx)
    }

    fn broadcast(&self, inner: &mut Inner, tx: &Transaction) -> Result<TxId, WalletError> {
        if !self.network.connected() {
            warn!(txid = %tx.txid(), "not broadcasting while disconnected");
            return Err(WalletError::Network("not connected".into()));
        }
        let expected = tx.txid();
        let txid = self.network.broadcast(&tx.to_hex())?;
        if txid != expected {
            warn!(%txid, %expected, "network reported a different txid");
        }

        let spent: Vec<OutPoint> = tx.inputs.iter().map(|i| i.prevout).collect();
        inner.pending_spent.extend(spent.iter().copied());
        inner.state = inner.state.without_spent(&inner.pending_spent);
        info!(%txid, inputs = spent.len(), outputs = tx.outputs.len(), "broadcast transaction");
        Ok(txid)
    }

    // -------------------------------------------------------------------------
    // Asset send
    // -------------------------------------------------------------------------

    /// Send the configured asset to one address.
    ///
    /// With enough currency the transaction is broadcast directly. Otherwise a
    /// fee quote is needed: without one the result asks for it, with one the
    /// result carries a partial transaction for the completer.
    pub fn send(&self, request: &SendRequest, quote: Option<&FeeQuote>) -> TransactionResult {
        TransactionResult::from_outcome(self.try_send(request, quote))
    }

    fn try_send(
        &self,
        request: &SendRequest,
        quote: Option<&FeeQuote>,
    ) -> Result<TransactionResult, WalletError> {
        let amount = self.parse_amount(&request.amount, self.config.asset_divisibility)?;
        let to = self.parse_address(&request.address)?;

        let mut inner = self.lock();
        self.refresh_locked(&mut inner)?;

        if inner.state.currency < self.reserve {
            let quote = quote.ok_or(WalletError::QuoteRequired)?;
            return self.originate_send(&mut inner, amount, to, request.pull_fee_from_amount, quote);
        }

        let asset_inputs = select_asset(
            &self.asset_outputs(&inner.state),
            &self.config.asset_name,
            amount,
            self.order(),
            &mut inner.rng,
        )?;
        let mut outputs = output::asset_payments(&self.config.asset_name, &[(to, amount)]);
        outputs.extend(output::asset_change(
            &self.address,
            &self.config.asset_name,
            amount,
            asset_inputs.total,
        )?);
        let txid =
            self.fund_and_broadcast(&mut inner, asset_inputs, outputs, Subunits::ZERO, None)?;
        Ok(TransactionResult::broadcast(txid))
    }

    fn originate_send(
        &self,
        inner: &mut Inner,
        amount: Subunits,
        to: Address,
        pull_fee_from_amount: bool,
        quote: &FeeQuote,
    ) -> Result<TransactionResult, WalletError> {
        let fee = self.params.protocol_fee;
        let amount = if pull_fee_from_amount {
            amount
                .checked_sub(fee)
                .filter(|a| !a.is_zero())
                .ok_or_else(|| {
                    WalletError::InvalidParameters(format!(
                        "amount does not cover the protocol fee of {fee}"
                    ))
                })?
        } else {
            amount
        };
        let total = amount
            .checked_add(fee)
            .ok_or(WalletError::Types(satchel_types::TypesError::AmountOverflow))?;

        let asset_inputs = select_asset(
            &self.asset_outputs(&inner.state),
            &self.config.asset_name,
            total,
            self.order(),
            &mut inner.rng,
        )?;
        let mut leading = output::asset_payments(&self.config.asset_name, &[(to, amount)]);
        leading.extend(output::asset_change(
            &self.address,
            &self.config.asset_name,
            total,
            asset_inputs.total,
        )?);

        let envelope =
            self.originator()
                .originate(GatheredInputSet::empty(), asset_inputs, leading, quote)?;
        Ok(TransactionResult::partial(envelope))
    }

    /// Send, fetching a fee quote from `quotes` when the first attempt asks for one.
    pub fn send_with_quotes<Q: FeeQuoteService>(
        &self,
        request: &SendRequest,
        quotes: &Q,
    ) -> TransactionResult {
        let first = self.send(request, None);
        if !first.is_quote_required() {
            return first;
        }
        match quotes.request_quote(self.chain.symbol()) {
            Ok(quote) => self.send(request, Some(&quote)),
            Err(e) => TransactionResult::failed(&e),
        }
    }

    // -------------------------------------------------------------------------
    // Currency sends
    // -------------------------------------------------------------------------

    /// Send base currency to one address.
    pub fn send_currency(&self, amount: &str, address: &str) -> TransactionResult {
        TransactionResult::from_outcome(self.try_send_currency(amount, address))
    }

    fn try_send_currency(
        &self,
        amount: &str,
        address: &str,
    ) -> Result<TransactionResult, WalletError> {
        let amount = self.parse_amount(amount, CURRENCY_DIVISIBILITY)?;
        let to = self.parse_address(address)?;

        let mut inner = self.lock();
        self.refresh_locked(&mut inner)?;
        let outputs = output::currency_payments(&[(to, amount)]);
        let txid =
            self.fund_and_broadcast(&mut inner, GatheredInputSet::empty(), outputs, amount, None)?;
        Ok(TransactionResult::broadcast(txid))
    }

    /// Send the asset and base currency to one address in one transaction.
    pub fn send_asset_and_currency(
        &self,
        asset_amount: &str,
        currency_amount: &str,
        address: &str,
    ) -> TransactionResult {
        TransactionResult::from_outcome(self.try_send_asset_and_currency(
            asset_amount,
            currency_amount,
            address,
        ))
    }

    fn try_send_asset_and_currency(
        &self,
        asset_amount: &str,
        currency_amount: &str,
        address: &str,
    ) -> Result<TransactionResult, WalletError> {
        let asset_amount = self.parse_amount(asset_amount, self.config.asset_divisibility)?;
        let currency_amount = self.parse_amount(currency_amount, CURRENCY_DIVISIBILITY)?;
        let to = self.parse_address(address)?;

        let mut inner = self.lock();
        self.refresh_locked(&mut inner)?;
        let asset_inputs = select_asset(
            &self.asset_outputs(&inner.state),
            &self.config.asset_name,
            asset_amount,
            self.order(),
            &mut inner.rng,
        )?;
        let mut outputs =
            output::asset_payments(&self.config.asset_name, &[(to.clone(), asset_amount)]);
        outputs.extend(output::currency_payments(&[(to, currency_amount)]));
        outputs.extend(output::asset_change(
            &self.address,
            &self.config.asset_name,
            asset_amount,
            asset_inputs.total,
        )?);
        let txid =
            self.fund_and_broadcast(&mut inner, asset_inputs, outputs, currency_amount, None)?;
        Ok(TransactionResult::broadcast(txid))
    }

    // -------------------------------------------------------------------------
    // Distribution
    // -------------------------------------------------------------------------

    /// Pay the asset to many recipients in one transaction, with an optional memo.
    ///
    /// `recipients` holds `(address, decimal amount)` pairs; each address may
    /// appear once.
    pub fn distribute(
        &self,
        recipients: &[(String, String)],
        memo: Option<&str>,
    ) -> TransactionResult {
        TransactionResult::from_outcome(self.try_distribute(recipients, memo))
    }

    fn try_distribute(
        &self,
        recipients: &[(String, String)],
        memo: Option<&str>,
    ) -> Result<TransactionResult, WalletError> {
        if recipients.is_empty() || recipients.len() > self.params.max_recipients {
            return Err(WalletError::InvalidParameters(format!(
                "{} recipients, expected 1 to {}",
                recipients.len(),
                self.params.max_recipients
            )));
        }

        let mut seen = HashSet::new();
        let mut payments = Vec::with_capacity(recipients.len());
        for (address, amount) in recipients {
            let to = self.parse_address(address)?;
            if !seen.insert(to.clone()) {
                return Err(WalletError::InvalidParameters(format!(
                    "{address} listed more than once"
                )));
            }
            payments.push((to, self.parse_amount(amount, self.config.asset_divisibility)?));
        }
        let total = payments
            .iter()
            .try_fold(Subunits::ZERO, |acc, (_, a)| acc.checked_add(*a))
            .ok_or(WalletError::Types(satchel_types::TypesError::AmountOverflow))?;
        let memo = memo.map(|note| output::memo(note.as_bytes())).transpose()?;

        let mut inner = self.lock();
        self.refresh_locked(&mut inner)?;
        let asset_inputs = select_asset(
            &self.asset_outputs(&inner.state),
            &self.config.asset_name,
            total,
            self.order(),
            &mut inner.rng,
        )?;
        let mut outputs = output::asset_payments(&self.config.asset_name, &payments);
        outputs.extend(output::asset_change(
            &self.address,
            &self.config.asset_name,
            total,
            asset_inputs.total,
        )?);
        let txid =
            self.fund_and_broadcast(&mut inner, asset_inputs, outputs, Subunits::ZERO, memo)?;
        info!(%txid, recipients = payments.len(), total = %total, "distributed asset");
        Ok(TransactionResult::broadcast(txid))
    }

    // -------------------------------------------------------------------------
    // Sweep
    // -------------------------------------------------------------------------

    /// Move every held output of both denominations to `address`.
    ///
    /// The fee comes out of the swept currency. Below the reserve the sweep
    /// becomes a partial transaction and needs a quote.
    pub fn sweep(&self, address: &str, quote: Option<&FeeQuote>) -> TransactionResult {
        TransactionResult::from_outcome(self.try_sweep(address, quote))
    }

    fn try_sweep(
        &self,
        address: &str,
        quote: Option<&FeeQuote>,
    ) -> Result<TransactionResult, WalletError> {
        let to = self.parse_address(address)?;

        let mut inner = self.lock();
        self.refresh_locked(&mut inner)?;

        let currency_inputs = GatheredInputSet::new(
            inner
                .state
                .unspent_currency
                .iter()
                .filter(|u| !u.value.is_zero())
                .cloned()
                .collect(),
        );
        let asset_inputs = GatheredInputSet::new(
            self.asset_outputs(&inner.state)
                .into_iter()
                .filter(|u| !u.value.is_zero())
                .collect(),
        );

        if inner.state.currency < self.reserve {
            let quote = quote.ok_or(WalletError::QuoteRequired)?;
            let swept_asset = asset_inputs
                .total
                .checked_sub(self.params.protocol_fee)
                .ok_or_else(|| WalletError::InsufficientAsset {
                    asset: self.config.asset_name.clone(),
                    needed: self.params.protocol_fee,
                    available: asset_inputs.total,
                })?;

            let mut leading = Vec::new();
            if !currency_inputs.total.is_zero() {
                leading.extend(output::currency_payments(&[(to.clone(), currency_inputs.total)]));
            }
            if !swept_asset.is_zero() {
                leading.extend(output::asset_payments(
                    &self.config.asset_name,
                    &[(to, swept_asset)],
                ));
            }
            let envelope = self
                .originator()
                .originate(currency_inputs, asset_inputs, leading, quote)?;
            return Ok(TransactionResult::partial(envelope));
        }

        let mut outputs = Vec::new();
        if !asset_inputs.total.is_zero() {
            outputs.extend(output::asset_payments(
                &self.config.asset_name,
                &[(to.clone(), asset_inputs.total)],
            ));
        }
        let fee = self
            .config
            .fee_rate
            .estimated_fee(currency_inputs.len() + asset_inputs.len(), outputs.len() + 1);
        let swept_currency =
            currency_inputs
                .total
                .checked_sub(fee)
                .ok_or(WalletError::InsufficientFunds {
                    needed: fee,
                    available: currency_inputs.total,
                })?;
        if !swept_currency.is_zero() {
            outputs.extend(output::currency_payments(&[(to, swept_currency)]));
        }

        let draft = assemble(
            &self.chain,
            &self.address,
            currency_inputs,
            asset_inputs,
            None,
            outputs,
        )?;
        draft.ensure_balanced(fee)?;
        let tx = draft.sign(&self.chain, &self.keys, SighashMode::Full)?;
        let txid = self.broadcast(&mut inner, &tx)?;
        Ok(TransactionResult::broadcast(txid))
    }

    // -------------------------------------------------------------------------
    // Completer
    // -------------------------------------------------------------------------

    /// Finish a partial transaction by spending the reserved currency output.
    pub fn complete(&self, envelope: &PartialTransactionEnvelope) -> TransactionResult {
        let mut session = PartialSession::new();
        match session.originated(envelope.clone()) {
            Ok(()) => self.complete_session(&mut session),
            Err(e) => TransactionResult::failed(&e),
        }
    }

    /// Finish the envelope held by `session`, moving it to `Completed` or
    /// `Failed`.
    pub fn complete_session(&self, session: &mut PartialSession) -> TransactionResult {
        match self.try_complete_session(session) {
            Ok(txid) => TransactionResult::broadcast(txid).with_session(session.state()),
            Err(e) => {
                if let Err(stuck) = session.fail(e.kind()) {
                    warn!(error = %stuck, "session already finished");
                }
                TransactionResult::failed(&e).with_session(session.state())
            }
        }
    }

    fn try_complete_session(&self, session: &mut PartialSession) -> Result<TxId, WalletError> {
        if session.state() == SessionState::Originated {
            session.dispatched()?;
        }
        let envelope = match (session.state(), session.envelope()) {
            (SessionState::InFlight, Some(envelope)) => envelope.clone(),
            (from, _) => {
                return Err(WalletError::InvalidTransition {
                    from,
                    to: SessionState::Completed,
                })
            }
        };
        let txid = self.try_complete(&envelope)?;
        session.completed(txid)?;
        Ok(txid)
    }

    fn try_complete(&self, envelope: &PartialTransactionEnvelope) -> Result<TxId, WalletError> {
        let completer = Completer {
            chain: &self.chain,
            own_address: &self.address,
            asset_name: &self.config.asset_name,
            params: &self.params,
        };
        let mut tx = completer.verify(envelope)?;

        let mut inner = self.lock();
        self.refresh_locked(&mut inner)?;
        let reserved = envelope.fee_sats_reserved;
        let utxo = select_exact(&inner.state.unspent_currency, reserved)
            .cloned()
            .ok_or(WalletError::ReservedOutputMissing(reserved))?;

        let spend_script = self.chain.spend_script(&utxo, &self.address)?;
        append_signed_input(
            &self.chain,
            &mut tx,
            &utxo,
            &spend_script,
            &self.keys,
            SighashMode::Full,
        )?;
        let txid = self.broadcast(&mut inner, &tx)?;
        info!(%txid, reported_fee = %envelope.reported_fee_sats, "completed partial transaction");
        Ok(txid)
    }
}
