//! Static ledger wiring.
//!
//! Unlike [`crate::params::Params`], which governance may change at runtime, the values here
//! are fixed for the life of a deployment: the denom allow-list, the module accounts and the
//! bounds a governance-set unbonding duration must respect.
//!
//! # Configuration Sources
//!
//! - Environment variables (prefixed with `STABLESTAKING_`)
//! - Serialized form (JSON) via serde
//! - Programmatic defaults and [`LedgerConfigBuilder`]
//!
//! # Example
//!
//! ```rust,ignore
//! use stablestaking_core::config::LedgerConfig;
//!
//! let config = LedgerConfig::builder()
//!     .allowed_denoms(["uusd", "ukhd"])
//!     .reward_denom("note")
//!     .build()?;
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{Address, Denom};
use crate::{Result, StakingError};

pub const DEFAULT_ESCROW_ACCOUNT: &str = "stablestaking";
pub const DEFAULT_REWARD_ACCOUNT: &str = "stablestaking_rewards";
pub const DEFAULT_REWARD_DENOM: &str = "note";

const DAY: Duration = Duration::from_secs(86_400);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Denoms that may ever be listed in `Params::supported_tokens`.
    pub allowed_denoms: Vec<Denom>,

    /// Chain base unit in which rewards are held and paid.
    pub reward_denom: Denom,

    /// Module account name holding staked principal.
    pub escrow_account: String,

    /// Module account name funding rewards.
    pub reward_account: String,

    /// Lower bound for `Params::unbonding_duration`.
    pub min_unbonding_duration: Duration,

    /// Upper bound for `Params::unbonding_duration`.
    pub max_unbonding_duration: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            allowed_denoms: vec![Denom::new("uusd"), Denom::new("ukhd"), Denom::new("ueur")],
            reward_denom: Denom::new(DEFAULT_REWARD_DENOM),
            escrow_account: DEFAULT_ESCROW_ACCOUNT.to_string(),
            reward_account: DEFAULT_REWARD_ACCOUNT.to_string(),
            min_unbonding_duration: DAY,
            max_unbonding_duration: DAY * 28,
        }
    }
}

impl LedgerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> LedgerConfigBuilder {
        LedgerConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Looks for variables prefixed with `STABLESTAKING_`:
    /// - `STABLESTAKING_ALLOWED_DENOMS` - Comma-separated denom allow-list
    /// - `STABLESTAKING_REWARD_DENOM` - Denom rewards are paid in
    /// - `STABLESTAKING_MIN_UNBONDING_SECS` - Lower unbonding bound in seconds
    /// - `STABLESTAKING_MAX_UNBONDING_SECS` - Upper unbonding bound in seconds
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(list) = get("STABLESTAKING_ALLOWED_DENOMS") {
            config.allowed_denoms = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Denom::new)
                .collect();
        }

        if let Some(denom) = get("STABLESTAKING_REWARD_DENOM") {
            config.reward_denom = Denom::new(denom.trim());
        }

        if let Some(secs) = get("STABLESTAKING_MIN_UNBONDING_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                StakingError::ConfigError(format!("Invalid STABLESTAKING_MIN_UNBONDING_SECS: {}", e))
            })?;
            config.min_unbonding_duration = Duration::from_secs(secs);
        }

        if let Some(secs) = get("STABLESTAKING_MAX_UNBONDING_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                StakingError::ConfigError(format!("Invalid STABLESTAKING_MAX_UNBONDING_SECS: {}", e))
            })?;
            config.max_unbonding_duration = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.allowed_denoms.is_empty() {
            return Err(StakingError::ConfigError(
                "allowed_denoms must not be empty".into(),
            ));
        }

        let mut seen = BTreeSet::new();
        for denom in &self.allowed_denoms {
            if denom.as_str().is_empty() {
                return Err(StakingError::ConfigError("empty denom in allowed_denoms".into()));
            }
            if !seen.insert(denom) {
                return Err(StakingError::ConfigError(format!(
                    "duplicate denom in allowed_denoms: {denom}"
                )));
            }
        }

        if self.reward_denom.as_str().is_empty() {
            return Err(StakingError::ConfigError("reward_denom must be set".into()));
        }

        if self.escrow_account.is_empty() || self.reward_account.is_empty() {
            return Err(StakingError::ConfigError(
                "module account names must be set".into(),
            ));
        }
        if self.escrow_account == self.reward_account {
            return Err(StakingError::ConfigError(
                "escrow and reward accounts must differ".into(),
            ));
        }

        if self.min_unbonding_duration.is_zero() {
            return Err(StakingError::ConfigError(
                "min_unbonding_duration must be greater than 0".into(),
            ));
        }
        if self.min_unbonding_duration > self.max_unbonding_duration {
            return Err(StakingError::ConfigError(
                "min_unbonding_duration must not exceed max_unbonding_duration".into(),
            ));
        }

        Ok(())
    }

    pub fn is_allowed(&self, denom: &Denom) -> bool {
        self.allowed_denoms.contains(denom)
    }

    pub fn escrow_address(&self) -> Address {
        Address::module(&self.escrow_account)
    }

    pub fn reward_address(&self) -> Address {
        Address::module(&self.reward_account)
    }
}

/// Builder for LedgerConfig.
#[derive(Default)]
pub struct LedgerConfigBuilder {
    config: LedgerConfig,
}

impl LedgerConfigBuilder {
    pub fn allowed_denoms<I, S>(mut self, denoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_denoms = denoms.into_iter().map(|d| Denom::new(d)).collect();
        self
    }

    pub fn reward_denom(mut self, denom: impl Into<String>) -> Self {
        self.config.reward_denom = Denom::new(denom);
        self
    }

    pub fn escrow_account(mut self, name: impl Into<String>) -> Self {
        self.config.escrow_account = name.into();
        self
    }

    pub fn reward_account(mut self, name: impl Into<String>) -> Self {
        self.config.reward_account = name.into();
        self
    }

    pub fn unbonding_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.config.min_unbonding_duration = min;
        self.config.max_unbonding_duration = max;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<LedgerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_allowed(&Denom::new("uusd")));
        assert!(!config.is_allowed(&Denom::new("stable1")));
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = LedgerConfig::builder()
            .allowed_denoms(["uusd"])
            .reward_denom("note")
            .unbonding_bounds(DAY, DAY * 7)
            .build()
            .unwrap();
        assert_eq!(config.allowed_denoms, vec![Denom::new("uusd")]);
        assert_eq!(config.max_unbonding_duration, DAY * 7);
    }

    #[test]
    fn invalid_config_rejected() {
        assert!(LedgerConfig::builder().allowed_denoms(Vec::<String>::new()).build().is_err());
        assert!(LedgerConfig::builder().allowed_denoms(["uusd", "uusd"]).build().is_err());
        assert!(LedgerConfig::builder()
            .unbonding_bounds(DAY * 2, DAY)
            .build()
            .is_err());
        assert!(LedgerConfig::builder()
            .escrow_account("same")
            .reward_account("same")
            .build()
            .is_err());
    }

    #[test]
    fn env_overrides_are_applied() {
        let vars: HashMap<&str, &str> = [
            ("STABLESTAKING_ALLOWED_DENOMS", "uusd, ukhd"),
            ("STABLESTAKING_REWARD_DENOM", "unote"),
            ("STABLESTAKING_MAX_UNBONDING_SECS", "1209600"),
        ]
        .into_iter()
        .collect();
        let config = LedgerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.allowed_denoms, vec![Denom::new("uusd"), Denom::new("ukhd")]);
        assert_eq!(config.reward_denom, Denom::new("unote"));
        assert_eq!(config.max_unbonding_duration, DAY * 14);
    }

    #[test]
    fn env_parse_errors_are_config_errors() {
        let err = LedgerConfig::from_lookup(|k| {
            (k == "STABLESTAKING_MIN_UNBONDING_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, StakingError::ConfigError(_)));
    }
}
