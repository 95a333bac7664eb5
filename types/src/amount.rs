//! Subunit amounts for the base currency and the colored asset.
//!
//! Both denominations are accounted in integer subunits (1e-8 of a whole unit).
//! Asset divisibility only restricts which decimal amounts are acceptable; the
//! on-chain unit is always the same 1e-8 subunit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use crate::error::TypesError;

/// Subunits per whole unit of currency or asset.
pub const SUBUNITS_PER_UNIT: u64 = 100_000_000;

/// Maximum number of decimal places any amount may carry.
pub const MAX_DECIMALS: u8 = 8;

/// An amount in integer subunits.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Subunits(u64);

impl Subunits {
    pub const ZERO: Self = Self(0);

    /// One whole unit (1e8 subunits).
    pub const ONE_UNIT: Self = Self(SUBUNITS_PER_UNIT);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Whole units converted to subunits, `None` on overflow.
    pub fn from_units(units: u64) -> Option<Self> {
        units.checked_mul(SUBUNITS_PER_UNIT).map(Self)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Parse a non-negative decimal string (`"12"`, `"0.015"`) into subunits.
    pub fn parse_decimal(amount: &str) -> Result<Self, TypesError> {
        let (whole, frac) = split_decimal(amount)?;
        if frac.len() > MAX_DECIMALS as usize {
            return Err(TypesError::PrecisionExceeded {
                digits: frac.len(),
                max: MAX_DECIMALS,
            });
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| TypesError::AmountOverflow)?
        };
        let mut frac_value: u64 = 0;
        for (i, digit) in frac.bytes().enumerate() {
            let scale = 10u64.pow(MAX_DECIMALS as u32 - 1 - i as u32);
            frac_value += (digit - b'0') as u64 * scale;
        }

        whole
            .checked_mul(SUBUNITS_PER_UNIT)
            .and_then(|w| w.checked_add(frac_value))
            .map(Self)
            .ok_or(TypesError::AmountOverflow)
    }

    /// Render as a decimal string truncated to `divisibility` places.
    ///
    /// Trailing zeros are trimmed, so `150_000_000` renders as `"1.5"`.
    pub fn to_decimal_string(&self, divisibility: u8) -> String {
        let divisibility = divisibility.min(MAX_DECIMALS);
        let whole = self.0 / SUBUNITS_PER_UNIT;
        let frac = self.0 % SUBUNITS_PER_UNIT;
        if divisibility == 0 {
            return whole.to_string();
        }
        let frac = format!("{:08}", frac);
        let frac = frac[..divisibility as usize].trim_end_matches('0');
        if frac.is_empty() {
            whole.to_string()
        } else {
            format!("{whole}.{frac}")
        }
    }
}

/// Whether `amount` parses and uses no more decimal places than `divisibility`.
///
/// Trailing zeros do not count against the limit (`"2.50"` is valid at
/// divisibility 1).
pub fn is_divisibility_valid(amount: &str, divisibility: u8) -> bool {
    if divisibility > MAX_DECIMALS {
        return false;
    }
    let Ok((_, frac)) = split_decimal(amount) else {
        return false;
    };
    frac.trim_end_matches('0').len() <= divisibility as usize
        && Subunits::parse_decimal(amount).is_ok()
}

fn split_decimal(amount: &str) -> Result<(&str, &str), TypesError> {
    let trimmed = amount.trim();
    let invalid = || TypesError::InvalidAmount(amount.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => {
            if f.is_empty() {
                return Err(invalid());
            }
            (w, f)
        }
        None => (trimmed, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    Ok((whole, frac))
}

/// Saturates at `u64::MAX`; use [`Subunits::checked_add`] where overflow must be seen.
impl Add for Subunits {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl Sub for Subunits {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Subunits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl<'a> Sum<&'a Subunits> for Subunits {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc.saturating_add(*x))
    }
}

impl fmt::Display for Subunits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
