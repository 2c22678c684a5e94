use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decimal::Dec;
use crate::hash::{sha256_domain, MODULE_ADDRESS_DOMAIN_V1};
use crate::{Result, StakingError};

/// Integer token amount in a denom's smallest unit.
pub type Amount = u128;

/// Account address.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Deterministic account owned by a module: first 20 bytes of `H(domain || name)`.
    pub fn module(name: &str) -> Self {
        let h = sha256_domain(MODULE_ADDRESS_DOMAIN_V1, name.as_bytes());
        Self(hex::encode(&h.0[..20]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token denomination (e.g. `uusd`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Denom(String);

impl Denom {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Denom {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: Denom,
    pub amount: Amount,
}

impl Coin {
    pub fn new(denom: impl Into<Denom>, amount: Amount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecCoin {
    pub denom: Denom,
    pub amount: Dec,
}

impl DecCoin {
    pub fn new(denom: impl Into<Denom>, amount: Dec) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

/// Named epoch cycle driven by the external scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpochIdentifier {
    Day,
    Week,
}

impl EpochIdentifier {
    pub const ALL: [EpochIdentifier; 2] = [EpochIdentifier::Day, EpochIdentifier::Week];

    pub fn as_str(self) -> &'static str {
        match self {
            EpochIdentifier::Day => "day",
            EpochIdentifier::Week => "week",
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            EpochIdentifier::Day => Duration::from_secs(86_400),
            EpochIdentifier::Week => Duration::from_secs(604_800),
        }
    }
}

impl fmt::Display for EpochIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EpochIdentifier {
    type Err = StakingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "day" => Ok(EpochIdentifier::Day),
            "week" => Ok(EpochIdentifier::Week),
            other => Err(StakingError::UnknownEpochIdentifier(other.to_string())),
        }
    }
}

/// Aggregate state of one denom's pool.
///
/// Invariant: `total_staked == 0 <=> total_shares == 0`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingPool {
    pub denom: Denom,
    pub total_staked: Dec,
    pub total_shares: Dec,
}

/// A staker's position in one pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStake {
    pub address: Address,
    pub denom: Denom,
    pub shares: Dec,
    /// Reward epoch at which the position was last modified.
    pub epoch: u64,
}

/// Principal waiting for release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingInfo {
    pub address: Address,
    pub denom: Denom,
    pub amount: Dec,
    /// Unbonding epoch at or after which `amount` is released.
    pub unbond_epoch: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerShares {
    pub address: Address,
    pub shares: Dec,
}

/// Participants and totals of one pool, captured at a reward-epoch boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSnapshot {
    pub denom: Denom,
    pub epoch: u64,
    pub total_staked: Dec,
    pub total_shares: Dec,
    /// Ordered by address.
    pub stakers: Vec<StakerShares>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeResponse {
    pub staker: Address,
    pub amount: DecCoin,
    pub shares: Dec,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeResponse {
    pub staker: Address,
    pub amount: DecCoin,
    pub unbond_epoch: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_identifier_parses_known_names_only() {
        assert_eq!("day".parse::<EpochIdentifier>().unwrap(), EpochIdentifier::Day);
        assert_eq!("week".parse::<EpochIdentifier>().unwrap(), EpochIdentifier::Week);
        assert!(matches!(
            "month".parse::<EpochIdentifier>(),
            Err(StakingError::UnknownEpochIdentifier(s)) if s == "month"
        ));
        assert!("Day".parse::<EpochIdentifier>().is_err());
    }

    #[test]
    fn epoch_identifier_serde_is_lowercase() {
        let json = serde_json::to_string(&EpochIdentifier::Week).unwrap();
        assert_eq!(json, "\"week\"");
    }

    #[test]
    fn module_addresses_are_stable_and_distinct() {
        let a = Address::module("stablestaking");
        let b = Address::module("stablestaking");
        let c = Address::module("stablestaking_rewards");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 40);
    }
}
