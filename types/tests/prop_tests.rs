use proptest::prelude::*;

use satchel_types::{is_divisibility_valid, FeeRate, Subunits, TxId, SUBUNITS_PER_UNIT};

proptest! {
    /// Rendering at full precision and parsing back yields the same subunits.
    #[test]
    fn decimal_string_roundtrip(raw in 0u64..u64::MAX / 2) {
        let amount = Subunits::new(raw);
        let rendered = amount.to_decimal_string(8);
        prop_assert_eq!(Subunits::parse_decimal(&rendered).unwrap(), amount);
    }

    /// Whole-unit strings always parse to units × 1e8.
    #[test]
    fn whole_units_parse(units in 0u64..100_000_000_000) {
        let parsed = Subunits::parse_decimal(&units.to_string()).unwrap();
        prop_assert_eq!(parsed.raw(), units * SUBUNITS_PER_UNIT);
    }

    /// An amount rendered at divisibility d is valid at d.
    #[test]
    fn rendered_amount_respects_divisibility(raw in 0u64..1_000_000_000_000, d in 0u8..=8) {
        let rendered = Subunits::new(raw).to_decimal_string(d);
        prop_assert!(is_divisibility_valid(&rendered, d));
    }

    /// The estimated fee never decreases when an input is added.
    #[test]
    fn fee_monotonic_in_inputs(
        rate in 0u64..10_000,
        inputs in 0usize..500,
        outputs in 0usize..500,
    ) {
        let fee = FeeRate::new(rate);
        prop_assert!(fee.estimated_fee(inputs + 1, outputs) >= fee.estimated_fee(inputs, outputs));
    }

    /// TxId hex roundtrip.
    #[test]
    fn txid_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let txid = TxId::new(bytes);
        prop_assert_eq!(TxId::from_hex(&txid.to_hex()).unwrap(), txid);
    }

    /// TxId::is_zero is true only for all-zero bytes.
    #[test]
    fn txid_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        prop_assert_eq!(TxId::new(bytes).is_zero(), bytes == [0u8; 32]);
    }
}
