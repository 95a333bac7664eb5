//! Output compilation: payment intents become typed outputs, and typed outputs
//! become wire outputs for a given chain.
//!
//! Change outputs are only produced when the amount left over is positive.
//! Currency change can be redirected to a caller-supplied script, in which case
//! the residual amount is handed back so it can be reported to a counterparty.

use satchel_types::params::MAX_MEMO_BYTES;
use satchel_types::{Address, Subunits};

use crate::chain::ChainOps;
use crate::error::TransactionError;
use crate::script::{null_data, Script};
use crate::transaction::TxOut;

/// Where currency change goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeDestination {
    Address(Address),
    Script(Script),
}

/// A typed transaction output, prior to script compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompiledOutput {
    CurrencyPayment {
        address: Address,
        amount: Subunits,
    },
    AssetPayment {
        address: Address,
        asset: String,
        amount: Subunits,
    },
    CurrencyChange {
        destination: ChangeDestination,
        amount: Subunits,
    },
    AssetChange {
        address: Address,
        asset: String,
        amount: Subunits,
    },
    Memo {
        payload: Vec<u8>,
    },
}

impl CompiledOutput {
    /// Currency carried by this output.
    pub fn currency_value(&self) -> Subunits {
        match self {
            Self::CurrencyPayment { amount, .. } | Self::CurrencyChange { amount, .. } => *amount,
            _ => Subunits::ZERO,
        }
    }

    /// Asset carried by this output.
    pub fn asset_value(&self) -> Subunits {
        match self {
            Self::AssetPayment { amount, .. } | Self::AssetChange { amount, .. } => *amount,
            _ => Subunits::ZERO,
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Self::CurrencyChange { .. } | Self::AssetChange { .. })
    }

    /// Compile to a wire output for `chain`.
    pub fn to_tx_out<C: ChainOps + ?Sized>(&self, chain: &C) -> Result<TxOut, TransactionError> {
        let (value, script_pubkey) = match self {
            Self::CurrencyPayment { address, amount } => {
                (*amount, chain.script_from_address(address.as_str())?)
            }
            Self::CurrencyChange {
                destination,
                amount,
            } => {
                let script = match destination {
                    ChangeDestination::Address(address) => {
                        chain.script_from_address(address.as_str())?
                    }
                    ChangeDestination::Script(script) => script.clone(),
                };
                (*amount, script)
            }
            Self::AssetPayment {
                address,
                asset,
                amount,
            }
            | Self::AssetChange {
                address,
                asset,
                amount,
            } => (
                Subunits::ZERO,
                chain.asset_script_from_address(address.as_str(), asset, *amount)?,
            ),
            Self::Memo { payload } => (Subunits::ZERO, null_data(payload)),
        };
        Ok(TxOut {
            value,
            script_pubkey,
        })
    }
}

/// One currency payment per recipient, in order.
pub fn currency_payments(recipients: &[(Address, Subunits)]) -> Vec<CompiledOutput> {
    recipients
        .iter()
        .map(|(address, amount)| CompiledOutput::CurrencyPayment {
            address: address.clone(),
            amount: *amount,
        })
        .collect()
}

/// One asset payment per recipient, in order.
pub fn asset_payments(asset: &str, recipients: &[(Address, Subunits)]) -> Vec<CompiledOutput> {
    recipients
        .iter()
        .map(|(address, amount)| CompiledOutput::AssetPayment {
            address: address.clone(),
            asset: asset.to_string(),
            amount: *amount,
        })
        .collect()
}

/// Asset change of `gathered - spent` back to `own`.
///
/// `None` when nothing is left over; an error when `spent` exceeds `gathered`.
pub fn asset_change(
    own: &Address,
    asset: &str,
    spent: Subunits,
    gathered: Subunits,
) -> Result<Option<CompiledOutput>, TransactionError> {
    let change = gathered
        .checked_sub(spent)
        .ok_or(TransactionError::NegativeChange {
            gathered: gathered.raw(),
            spent: spent.raw(),
        })?;
    if change.is_zero() {
        return Ok(None);
    }
    Ok(Some(CompiledOutput::AssetChange {
        address: own.clone(),
        asset: asset.to_string(),
        amount: change,
    }))
}

fn residual(gathered: Subunits, spent: Subunits, fee: Subunits) -> Option<Subunits> {
    gathered
        .checked_sub(spent)
        .and_then(|r| r.checked_sub(fee))
        .filter(|r| !r.is_zero())
}

/// Currency change of `gathered - spent - fee` back to `own`, or `None` when
/// that is zero or negative.
pub fn currency_change(
    own: &Address,
    spent: Subunits,
    gathered: Subunits,
    fee: Subunits,
) -> Option<CompiledOutput> {
    residual(gathered, spent, fee).map(|amount| CompiledOutput::CurrencyChange {
        destination: ChangeDestination::Address(own.clone()),
        amount,
    })
}

/// Currency change sent to an explicit script, returned with the residual.
pub fn redirected_change(
    destination: Script,
    spent: Subunits,
    gathered: Subunits,
    fee: Subunits,
) -> Option<(CompiledOutput, Subunits)> {
    residual(gathered, spent, fee).map(|amount| {
        (
            CompiledOutput::CurrencyChange {
                destination: ChangeDestination::Script(destination),
                amount,
            },
            amount,
        )
    })
}

/// Zero-value return-data output carrying `payload`.
pub fn memo(payload: &[u8]) -> Result<CompiledOutput, TransactionError> {
    if payload.len() > MAX_MEMO_BYTES {
        return Err(TransactionError::MemoTooLarge {
            len: payload.len(),
            max: MAX_MEMO_BYTES,
        });
    }
    Ok(CompiledOutput::Memo {
        payload: payload.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainOps, Ravencoin};
    use crate::script::ScriptKind;

    fn address(seed: u8) -> Address {
        let chain = Ravencoin::default();
        chain.address_of(&chain.derive_keypair(&[seed; 32]).unwrap().public)
    }

    #[test]
    fn payments_preserve_order() {
        let recipients = vec![
            (address(1), Subunits::new(10)),
            (address(2), Subunits::new(20)),
        ];
        let outputs = asset_payments("SATORI", &recipients);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].asset_value(), Subunits::new(20));
        assert_eq!(outputs[1].currency_value(), Subunits::ZERO);
        assert_eq!(currency_payments(&recipients)[0].currency_value(), Subunits::new(10));
    }

    #[test]
    fn asset_change_suppressed_when_exact() {
        let own = address(1);
        assert_eq!(
            asset_change(&own, "SATORI", Subunits::new(5), Subunits::new(5)).unwrap(),
            None
        );
        let change = asset_change(&own, "SATORI", Subunits::new(5), Subunits::new(8))
            .unwrap()
            .unwrap();
        assert_eq!(change.asset_value(), Subunits::new(3));
    }

    #[test]
    fn asset_change_negative_is_error() {
        assert_eq!(
            asset_change(&address(1), "SATORI", Subunits::new(9), Subunits::new(8)),
            Err(TransactionError::NegativeChange { gathered: 8, spent: 9 })
        );
    }

    #[test]
    fn currency_change_suppressed_at_or_below_zero() {
        let own = address(1);
        let change_after = |spent| {
            currency_change(&own, Subunits::new(spent), Subunits::new(100), Subunits::new(30))
        };
        assert!(change_after(70).is_none());
        assert!(change_after(80).is_none());
        let change = change_after(60).unwrap();
        assert_eq!(change.currency_value(), Subunits::new(10));
        assert!(change.is_change());
    }

    #[test]
    fn redirected_change_reports_residual() {
        let script = Script::new(vec![0x51]);
        let (output, residual) = redirected_change(
            script.clone(),
            Subunits::ZERO,
            Subunits::new(1_000_000),
            Subunits::new(400),
        )
        .unwrap();
        assert_eq!(residual, Subunits::new(999_600));
        let tx_out = output.to_tx_out(&Ravencoin::default()).unwrap();
        assert_eq!(tx_out.script_pubkey, script);
        assert_eq!(tx_out.value, residual);
    }

    #[test]
    fn memo_limits() {
        assert!(memo(&[0u8; MAX_MEMO_BYTES]).is_ok());
        assert_eq!(
            memo(&[0u8; MAX_MEMO_BYTES + 1]),
            Err(TransactionError::MemoTooLarge { len: 81, max: 80 })
        );
        let out = memo(b"note").unwrap().to_tx_out(&Ravencoin::default()).unwrap();
        assert_eq!(out.value, Subunits::ZERO);
        assert!(matches!(out.script_pubkey.classify(), ScriptKind::NullData { .. }));
    }

    #[test]
    fn asset_output_carries_no_currency() {
        let out = CompiledOutput::AssetPayment {
            address: address(3),
            asset: "SATORI".into(),
            amount: Subunits::new(500),
        }
        .to_tx_out(&Ravencoin::default())
        .unwrap();
        assert_eq!(out.value, Subunits::ZERO);
        assert!(matches!(
            out.script_pubkey.classify(),
            ScriptKind::AssetTransfer { amount, .. } if amount == Subunits::new(500)
        ));
    }
}
