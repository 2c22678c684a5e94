//! Governance-controlled module parameters.
//!
//! Parameters are an explicit, versioned record handed to every operation through
//! [`crate::Ctx`]; the ledger itself holds no parameter state.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::LedgerConfig;
use crate::decimal::Dec;
use crate::math::epochs_covering;
use crate::types::{Denom, EpochIdentifier};
use crate::{Result, StakingError};

pub const DEFAULT_REWARD_RATE: &str = "0.05";
pub const DEFAULT_UNBONDING_DURATION: Duration = Duration::from_secs(14 * 86_400);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Positive decimal string used by the epoch reward projection.
    pub reward_rate: String,
    pub unbonding_duration: Duration,
    /// Denoms accepted for new stakes; the first one drives the reward projection.
    pub supported_tokens: Vec<Denom>,
    pub reward_epoch_identifier: EpochIdentifier,
    pub unbonding_epoch_identifier: EpochIdentifier,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            reward_rate: DEFAULT_REWARD_RATE.to_string(),
            unbonding_duration: DEFAULT_UNBONDING_DURATION,
            supported_tokens: vec![Denom::new("uusd"), Denom::new("ukhd")],
            reward_epoch_identifier: EpochIdentifier::Week,
            unbonding_epoch_identifier: EpochIdentifier::Day,
        }
    }
}

impl Params {
    /// Reject (never clamp) any value outside what `config` permits.
    pub fn validate(&self, config: &LedgerConfig) -> Result<()> {
        self.reward_rate()?;

        let (min, max) = (config.min_unbonding_duration, config.max_unbonding_duration);
        if self.unbonding_duration < min || self.unbonding_duration > max {
            return Err(StakingError::UnbondingDurationOutOfBounds {
                actual: self.unbonding_duration,
                min,
                max,
            });
        }

        if self.supported_tokens.is_empty() {
            return Err(StakingError::EmptySupportedTokens);
        }
        for denom in &self.supported_tokens {
            if !config.is_allowed(denom) {
                return Err(StakingError::UnsupportedToken(denom.clone()));
            }
        }
        Ok(())
    }

    pub fn reward_rate(&self) -> Result<Dec> {
        let rate = Dec::from_str(&self.reward_rate)
            .map_err(|e| StakingError::InvalidRewardRate(format!("{:?}: {e}", self.reward_rate)))?;
        if !rate.is_positive() {
            return Err(StakingError::InvalidRewardRate(format!(
                "{:?} must be positive",
                self.reward_rate
            )));
        }
        Ok(rate)
    }

    pub fn is_supported(&self, denom: &Denom) -> bool {
        self.supported_tokens.contains(denom)
    }

    /// Supported denoms in ascending order, without duplicates.
    pub fn supported_set(&self) -> BTreeSet<&Denom> {
        self.supported_tokens.iter().collect()
    }

    /// Unbonding duration in whole epochs of the unbonding identifier, rounded up.
    pub fn unbonding_period_epochs(&self) -> Result<u64> {
        epochs_covering(
            self.unbonding_duration,
            self.unbonding_epoch_identifier.duration(),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedParams {
    /// Bumped on every accepted update.
    pub version: u64,
    pub params: Params,
}

impl std::ops::Deref for VersionedParams {
    type Target = Params;

    fn deref(&self) -> &Params {
        &self.params
    }
}

/// Holder of the current parameter record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamStore {
    current: VersionedParams,
}

impl ParamStore {
    pub fn new(params: Params, config: &LedgerConfig) -> Result<Self> {
        params.validate(config)?;
        Ok(Self {
            current: VersionedParams { version: 0, params },
        })
    }

    pub fn current(&self) -> &VersionedParams {
        &self.current
    }

    /// Replace the parameters. On `Err` the store is unchanged.
    pub fn set_params(&mut self, params: Params, config: &LedgerConfig) -> Result<u64> {
        params.validate(config)?;
        let version = self
            .current
            .version
            .checked_add(1)
            .ok_or_else(|| StakingError::Overflow("params version overflow".into()))?;
        self.current = VersionedParams { version, params };
        info!(version, "stablestaking params updated");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LedgerConfig {
        LedgerConfig::default()
    }

    #[test]
    fn default_params_are_valid() {
        let p = Params::default();
        assert!(p.validate(&config()).is_ok());
        assert_eq!(p.unbonding_period_epochs().unwrap(), 14);
        assert_eq!(p.reward_rate().unwrap().to_string(), "0.050000000000000000");
    }

    #[test]
    fn reward_rate_must_be_positive_decimal() {
        for bad in ["0", "-0.1", "abc", ""] {
            let p = Params {
                reward_rate: bad.to_string(),
                ..Params::default()
            };
            assert!(
                matches!(p.validate(&config()), Err(StakingError::InvalidRewardRate(_))),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn unbonding_duration_bounds_are_enforced() {
        let too_short = Params {
            unbonding_duration: Duration::from_secs(60),
            ..Params::default()
        };
        assert!(matches!(
            too_short.validate(&config()),
            Err(StakingError::UnbondingDurationOutOfBounds { .. })
        ));
        let too_long = Params {
            unbonding_duration: Duration::from_secs(29 * 86_400),
            ..Params::default()
        };
        assert!(too_long.validate(&config()).is_err());
    }

    #[test]
    fn supported_tokens_must_be_allowed_and_non_empty() {
        let empty = Params {
            supported_tokens: vec![],
            ..Params::default()
        };
        assert_eq!(empty.validate(&config()), Err(StakingError::EmptySupportedTokens));

        let foreign = Params {
            supported_tokens: vec![Denom::new("uusd"), Denom::new("stable1")],
            ..Params::default()
        };
        assert_eq!(
            foreign.validate(&config()),
            Err(StakingError::UnsupportedToken(Denom::new("stable1")))
        );
    }

    #[test]
    fn period_uses_unbonding_identifier() {
        let p = Params {
            unbonding_epoch_identifier: EpochIdentifier::Week,
            ..Params::default()
        };
        assert_eq!(p.unbonding_period_epochs().unwrap(), 2);

        let p = Params {
            unbonding_duration: Duration::from_secs(10 * 86_400),
            unbonding_epoch_identifier: EpochIdentifier::Week,
            ..Params::default()
        };
        assert_eq!(p.unbonding_period_epochs().unwrap(), 2);
    }

    #[test]
    fn rejected_update_leaves_store_unchanged() {
        let cfg = config();
        let mut store = ParamStore::new(Params::default(), &cfg).unwrap();
        let before = store.current().clone();

        let bad = Params {
            reward_rate: "0".into(),
            ..Params::default()
        };
        assert!(store.set_params(bad, &cfg).is_err());
        assert_eq!(store.current(), &before);

        let good = Params {
            reward_rate: "0.1".into(),
            ..Params::default()
        };
        assert_eq!(store.set_params(good, &cfg).unwrap(), 1);
        assert_eq!(store.current().version, 1);
        assert_eq!(store.current().reward_rate, "0.1");
    }

    #[test]
    fn params_json_round_trip() {
        let p = Params::default();
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"reward_epoch_identifier\":\"week\""));
        let back: Params = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
