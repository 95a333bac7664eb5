//! Unspent output selection.
//!
//! Candidates with zero value are ignored. Outputs are taken smallest first,
//! or in uniformly random order to make address linkage harder to infer.
//! Currency selection treats the fee as part of the target: every added
//! input grows the estimated fee, so the loop runs until the gathered total
//! covers `target + fee(current input count)`.

use rand::Rng;
use tracing::debug;

use satchel_types::{FeeRate, GatheredInputSet, Subunits, UnspentOutput};

use crate::error::WalletError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionOrder {
    #[default]
    SmallestFirst,
    Random,
}

impl SelectionOrder {
    pub fn from_random_flag(random: bool) -> Self {
        if random {
            Self::Random
        } else {
            Self::SmallestFirst
        }
    }
}

/// Parameters for a currency selection.
#[derive(Clone, Copy, Debug)]
pub struct CurrencyTarget {
    pub target: Subunits,
    /// Inputs already in the transaction (e.g. asset inputs).
    pub reserved_inputs: usize,
    /// Outputs counted by the fee estimate.
    pub reserved_outputs: usize,
    /// Currency that must stay available beyond `target`.
    pub reserve_floor: Subunits,
    pub fee_rate: FeeRate,
}

impl CurrencyTarget {
    /// Total the gathered inputs must reach once `gathered` inputs are chosen.
    pub fn requirement(&self, gathered: usize) -> Subunits {
        self.target.saturating_add(
            self.fee_rate
                .estimated_fee(gathered + self.reserved_inputs, self.reserved_outputs),
        )
    }
}

struct Candidates<'r, R: Rng + ?Sized> {
    pool: Vec<UnspentOutput>,
    order: SelectionOrder,
    rng: &'r mut R,
}

impl<R: Rng + ?Sized> Candidates<'_, R> {
    fn next(&mut self) -> Option<UnspentOutput> {
        if self.pool.is_empty() {
            return None;
        }
        let index = match self.order {
            SelectionOrder::SmallestFirst => 0,
            SelectionOrder::Random => self.rng.gen_range(0..self.pool.len()),
        };
        Some(self.pool.remove(index))
    }
}

/// Total of `pool`, rejecting sets whose value cannot exist on chain.
fn pool_total(pool: &[UnspentOutput]) -> Result<Subunits, WalletError> {
    pool.iter()
        .try_fold(Subunits::ZERO, |acc, u| acc.checked_add(u.value))
        .ok_or_else(|| {
            WalletError::InvalidParameters("unspent output values overflow 64 bits".into())
        })
}

fn sorted_pool<'a>(utxos: impl Iterator<Item = &'a UnspentOutput>) -> Vec<UnspentOutput> {
    let mut pool: Vec<UnspentOutput> = utxos.filter(|u| !u.value.is_zero()).cloned().collect();
    pool.sort_by_key(|u| (u.value, u.outpoint));
    pool
}

/// Gather currency outputs covering `params.target` plus the fee.
///
/// Fails without selecting anything when the available total is below
/// `target + reserve_floor`.
pub fn select_currency<R: Rng + ?Sized>(
    utxos: &[UnspentOutput],
    params: CurrencyTarget,
    order: SelectionOrder,
    rng: &mut R,
) -> Result<GatheredInputSet, WalletError> {
    let pool = sorted_pool(utxos.iter().filter(|u| !u.is_asset()));
    let available = pool_total(&pool)?;
    let floor = params.target.saturating_add(params.reserve_floor);
    if available < floor {
        return Err(WalletError::InsufficientFunds {
            needed: floor,
            available,
        });
    }

    let mut candidates = Candidates { pool, order, rng };
    let mut gathered = GatheredInputSet::empty();
    while gathered.total < params.requirement(gathered.len()) {
        match candidates.next() {
            Some(utxo) => gathered.push(utxo),
            None => {
                return Err(WalletError::InsufficientFunds {
                    needed: params.requirement(gathered.len()),
                    available,
                })
            }
        }
    }

    debug!(
        inputs = gathered.len(),
        gathered = %gathered.total,
        target = %params.target,
        "selected currency inputs"
    );
    Ok(gathered)
}

/// Gather outputs of `asset_name` covering `target`.
pub fn select_asset<R: Rng + ?Sized>(
    utxos: &[UnspentOutput],
    asset_name: &str,
    target: Subunits,
    order: SelectionOrder,
    rng: &mut R,
) -> Result<GatheredInputSet, WalletError> {
    let pool = sorted_pool(utxos.iter().filter(|u| u.holds_asset(asset_name)));
    let available = pool_total(&pool)?;
    if available < target {
        return Err(WalletError::InsufficientAsset {
            asset: asset_name.to_string(),
            needed: target,
            available,
        });
    }

    let mut candidates = Candidates { pool, order, rng };
    let mut gathered = GatheredInputSet::empty();
    while gathered.total < target {
        match candidates.next() {
            Some(utxo) => gathered.push(utxo),
            None => break,
        }
    }

    debug!(
        asset = asset_name,
        inputs = gathered.len(),
        gathered = %gathered.total,
        target = %target,
        "selected asset inputs"
    );
    Ok(gathered)
}

/// The first currency output worth exactly `value`.
pub fn select_exact(utxos: &[UnspentOutput], value: Subunits) -> Option<&UnspentOutput> {
    utxos.iter().find(|u| !u.is_asset() && u.value == value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use satchel_types::{OutPoint, TxId};

    fn op_n(n: u8) -> OutPoint {
        OutPoint::new(TxId::new([n; 32]), 0)
    }

    fn currency(values: &[u64]) -> Vec<UnspentOutput> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| UnspentOutput::currency(op_n(i as u8 + 1), Subunits::new(*v), 1))
            .collect()
    }

    fn params(target: u64, reserve: u64, rate: u64) -> CurrencyTarget {
        CurrencyTarget {
            target: Subunits::new(target),
            reserved_inputs: 0,
            reserved_outputs: 1,
            reserve_floor: Subunits::new(reserve),
            fee_rate: FeeRate::new(rate),
        }
    }

    fn smallest_first(
        utxos: &[UnspentOutput],
        params: CurrencyTarget,
    ) -> Result<GatheredInputSet, WalletError> {
        let mut rng = StdRng::seed_from_u64(1);
        select_currency(utxos, params, SelectionOrder::SmallestFirst, &mut rng)
    }

    fn satori(
        utxos: &[UnspentOutput],
        target: u64,
        rng: &mut StdRng,
    ) -> Result<GatheredInputSet, WalletError> {
        let target = Subunits::new(target);
        select_asset(utxos, "SATORI", target, SelectionOrder::SmallestFirst, rng)
    }

    #[test]
    fn single_output_covers_target_and_fee() {
        let utxos = currency(&[50_000]);
        let set = smallest_first(&utxos, params(10_000, 1_000, 1)).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.total, Subunits::new(50_000));
    }

    #[test]
    fn smallest_first_until_fee_fixed_point() {
        // fee is 226 at one input, 374 at two, 522 at three
        let utxos = currency(&[5_000, 300, 200, 0]);
        let set = smallest_first(&utxos, params(300, 0, 1)).unwrap();
        let values: Vec<u64> = set.utxos.iter().map(|u| u.value.raw()).collect();
        assert_eq!(values, vec![200, 300, 5_000]);
    }

    #[test]
    fn reserve_floor_fails_before_selection() {
        let utxos = currency(&[500, 500]);
        let err = smallest_first(&utxos, params(900, 200, 0)).unwrap_err();
        assert_eq!(
            err,
            WalletError::InsufficientFunds {
                needed: Subunits::new(1_100),
                available: Subunits::new(1_000)
            }
        );
    }

    #[test]
    fn fee_exhausts_candidates() {
        let utxos = currency(&[100, 100]);
        assert!(matches!(
            smallest_first(&utxos, params(150, 0, 1)),
            Err(WalletError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn zero_target_without_fee_selects_nothing() {
        let utxos = currency(&[100]);
        let set = smallest_first(&utxos, params(0, 0, 0)).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn random_order_still_covers_target() {
        let utxos = currency(&[10, 20, 30, 40, 50, 60]);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let set =
                select_currency(&utxos, params(100, 0, 0), SelectionOrder::Random, &mut rng)
                    .unwrap();
            assert!(set.total >= Subunits::new(100));
        }
    }

    #[test]
    fn asset_selection_filters_by_name() {
        let utxos = vec![
            UnspentOutput::asset(op_n(1), "SATORI", Subunits::new(3), 1),
            UnspentOutput::asset(op_n(2), "OTHER", Subunits::new(50), 1),
            UnspentOutput::asset(op_n(3), "SATORI", Subunits::new(4), 1),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let set = satori(&utxos, 6, &mut rng).unwrap();
        assert_eq!(set.total, Subunits::new(7));
        assert!(matches!(
            satori(&utxos, 8, &mut rng),
            Err(WalletError::InsufficientAsset { .. })
        ));
        assert!(satori(&utxos, 0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn overflowing_values_are_rejected() {
        let huge = u64::MAX / 2 + 1;
        let utxos = currency(&[huge, huge]);
        assert!(matches!(
            smallest_first(&utxos, params(100, 0, 1)),
            Err(WalletError::InvalidParameters(_))
        ));

        let assets = vec![
            UnspentOutput::asset(op_n(1), "SATORI", Subunits::new(huge), 1),
            UnspentOutput::asset(op_n(2), "SATORI", Subunits::new(huge), 1),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            satori(&assets, 1, &mut rng),
            Err(WalletError::InvalidParameters(_))
        ));
    }

    #[test]
    fn exact_match_only() {
        let utxos = currency(&[99_999, 100_001, 100_000]);
        assert_eq!(
            select_exact(&utxos, Subunits::new(100_000)).map(|u| u.value),
            Some(Subunits::new(100_000))
        );
        assert!(select_exact(&utxos, Subunits::new(100)).is_none());
    }
}
