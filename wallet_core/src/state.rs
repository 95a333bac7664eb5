//! The wallet's view of its unspent outputs.
//!
//! A `WalletState` is an immutable snapshot. Refreshing or spending replaces
//! the whole value rather than editing fields in place.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use satchel_types::{OutPoint, Subunits, UnspentOutput};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    /// Currency balance reported by the network.
    pub currency: Subunits,
    /// Balance of the configured asset reported by the network.
    pub asset: Subunits,
    pub unspent_currency: Vec<UnspentOutput>,
    pub unspent_assets: Vec<UnspentOutput>,
}

impl WalletState {
    /// Snapshot whose balances are the sums of the given outputs.
    pub fn from_unspent(
        unspent_currency: Vec<UnspentOutput>,
        unspent_assets: Vec<UnspentOutput>,
        asset_name: &str,
    ) -> Self {
        let currency = unspent_currency.iter().map(|u| u.value).sum();
        let asset = unspent_assets
            .iter()
            .filter(|u| u.holds_asset(asset_name))
            .map(|u| u.value)
            .sum();
        Self {
            currency,
            asset,
            unspent_currency,
            unspent_assets,
        }
    }

    /// Outputs holding `asset_name`.
    pub fn asset_outputs<'a>(
        &'a self,
        asset_name: &'a str,
    ) -> impl Iterator<Item = &'a UnspentOutput> {
        self.unspent_assets.iter().filter(move |u| u.holds_asset(asset_name))
    }

    /// A new snapshot with `spent` outputs removed and balances reduced.
    pub fn without_spent(&self, spent: &HashSet<OutPoint>) -> Self {
        let (gone_currency, unspent_currency): (Vec<_>, Vec<_>) = self
            .unspent_currency
            .iter()
            .cloned()
            .partition(|u| spent.contains(&u.outpoint));
        let (gone_assets, unspent_assets): (Vec<_>, Vec<_>) = self
            .unspent_assets
            .iter()
            .cloned()
            .partition(|u| spent.contains(&u.outpoint));

        let spent_currency: Subunits = gone_currency.iter().map(|u| u.value).sum();
        let spent_asset: Subunits = gone_assets.iter().map(|u| u.value).sum();
        Self {
            currency: self.currency.saturating_sub(spent_currency),
            asset: self.asset.saturating_sub(spent_asset),
            unspent_currency,
            unspent_assets,
        }
    }
}
