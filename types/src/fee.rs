//! Size-based fee estimation.
//!
//! `fee = rate × (BASE + INPUT × inputs + OUTPUT × outputs)`.
//! The output count excludes the currency change output; the base size already
//! reserves room for it.

use serde::{Deserialize, Serialize};

use crate::amount::Subunits;

/// Transaction header, locktime and one change output, in bytes.
pub const BASE_TX_BYTES: u64 = 44;
/// A signed P2PKH input with a compressed key.
pub const INPUT_BYTES: u64 = 148;
/// A P2PKH output.
pub const OUTPUT_BYTES: u64 = 34;

/// Fee rate in subunits per estimated byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeRate(u64);

impl FeeRate {
    /// 0.01 currency per kilobyte.
    pub const DEFAULT: Self = Self(1_000);

    pub fn new(subunits_per_byte: u64) -> Self {
        Self(subunits_per_byte)
    }

    pub fn per_byte(&self) -> u64 {
        self.0
    }

    /// Estimated serialized size for the given counts.
    pub fn estimated_size(input_count: usize, output_count: usize) -> u64 {
        BASE_TX_BYTES
            .saturating_add(INPUT_BYTES.saturating_mul(input_count as u64))
            .saturating_add(OUTPUT_BYTES.saturating_mul(output_count as u64))
    }

    /// Estimated miner fee for a transaction with the given counts.
    pub fn estimated_fee(&self, input_count: usize, output_count: usize) -> Subunits {
        Subunits::new(
            self.0
                .saturating_mul(Self::estimated_size(input_count, output_count)),
        )
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_input_single_output_at_unit_rate() {
        assert_eq!(FeeRate::new(1).estimated_fee(1, 1), Subunits::new(226));
    }

    #[test]
    fn fee_grows_with_each_input() {
        let rate = FeeRate::new(10);
        let one = rate.estimated_fee(1, 2);
        let two = rate.estimated_fee(2, 2);
        assert_eq!(two.raw() - one.raw(), INPUT_BYTES * 10);
    }

    #[test]
    fn default_rate() {
        assert_eq!(FeeRate::default().per_byte(), 1_000);
        assert_eq!(FeeRate::default().estimated_fee(0, 0), Subunits::new(44_000));
    }
}
