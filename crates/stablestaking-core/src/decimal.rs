//! Fixed-precision decimal used for shares, staked totals and reward ratios.
//!
//! A `Dec` is an unsigned 256-bit integer counting units of `10^-18` (a "wad"). Every
//! multiplication and division goes through a 512-bit intermediate and truncates toward zero,
//! so replicas computing the same expression get the same bits and realistic chain amounts
//! never overflow mid-calculation.

use std::fmt;
use std::str::FromStr;

use primitive_types::{U256, U512};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::Amount;
use crate::{Result, StakingError};

const WAD: u64 = 1_000_000_000_000_000_000;
const SCALE: U256 = U256([WAD, 0, 0, 0]);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(U256);

impl Dec {
    /// Number of fractional digits.
    pub const PRECISION: u32 = 18;

    pub const ZERO: Dec = Dec(U256([0, 0, 0, 0]));
    pub const ONE: Dec = Dec(SCALE);
    pub const MAX: Dec = Dec(U256::MAX);

    /// Raw value in units of `10^-18`.
    pub fn from_atomics(atomics: U256) -> Dec {
        Dec(atomics)
    }

    pub fn atomics(&self) -> U256 {
        self.0
    }

    pub fn from_amount(amount: Amount) -> Result<Dec> {
        U256::from(amount)
            .checked_mul(SCALE)
            .map(Dec)
            .ok_or_else(|| StakingError::Overflow(format!("amount {amount} exceeds decimal range")))
    }

    /// Integer part, truncated toward zero.
    pub fn truncate_to_amount(self) -> Result<Amount> {
        let whole = self.0 / SCALE;
        if whole > U256::from(Amount::MAX) {
            return Err(StakingError::Overflow(format!(
                "decimal {self} exceeds amount range"
            )));
        }
        Ok(whole.low_u128())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Dec) -> Result<Dec> {
        self.0
            .checked_add(rhs.0)
            .map(Dec)
            .ok_or_else(|| StakingError::Overflow(format!("{self} + {rhs}")))
    }

    pub fn checked_sub(self, rhs: Dec) -> Result<Dec> {
        self.0
            .checked_sub(rhs.0)
            .map(Dec)
            .ok_or_else(|| StakingError::Overflow(format!("{self} - {rhs} underflows")))
    }

    pub fn checked_mul(self, rhs: Dec) -> Result<Dec> {
        narrow(self.0.full_mul(rhs.0) / U512::from(SCALE))
            .ok_or_else(|| StakingError::Overflow(format!("{self} * {rhs}")))
    }

    pub fn checked_quo(self, rhs: Dec) -> Result<Dec> {
        if rhs.is_zero() {
            return Err(StakingError::InvalidInput("division by zero".into()));
        }
        narrow(self.0.full_mul(SCALE) / U512::from(rhs.0))
            .ok_or_else(|| StakingError::Overflow(format!("{self} / {rhs}")))
    }

    /// `self * num / denom`, multiplying first and truncating once at the end.
    pub fn mul_quo(self, num: Dec, denom: Dec) -> Result<Dec> {
        if denom.is_zero() {
            return Err(StakingError::InvalidInput("division by zero".into()));
        }
        narrow(self.0.full_mul(num.0) / U512::from(denom.0))
            .ok_or_else(|| StakingError::Overflow(format!("{self} * {num} / {denom}")))
    }
}

fn narrow(wide: U512) -> Option<Dec> {
    U256::try_from(wide).ok().map(Dec)
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let frac = (self.0 % SCALE).low_u64();
        write!(f, "{whole}.{frac:018}")
    }
}

impl FromStr for Dec {
    type Err = StakingError;

    fn from_str(s: &str) -> Result<Dec> {
        let invalid =
            |why: &str| StakingError::InvalidInput(format!("invalid decimal {s:?}: {why}"));
        let t = s.trim();
        let (whole, frac) = t.split_once('.').unwrap_or((t, ""));
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("expected unsigned digits"));
        }
        if frac.len() > Self::PRECISION as usize {
            return Err(invalid("more than 18 fractional digits"));
        }

        let whole = U256::from_dec_str(whole).map_err(|e| invalid(&format!("{e:?}")))?;
        let frac_atomics = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<18}")
                .parse::<u64>()
                .map_err(|e| invalid(&e.to_string()))?
        };
        whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(U256::from(frac_atomics)))
            .map(Dec)
            .ok_or_else(|| StakingError::Overflow(format!("decimal {s:?} out of range")))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Dec, D::Error> {
        let s = String::deserialize(deserializer)?;
        Dec::from_str(&s).map_err(serde::de::Error::custom)
    }
}
