//! Stable staking ledger.
//!
//! Users lock tokens of several supported denominations into shared per-denom pools and
//! receive proportional shares. Withdrawals wait out an unbonding period measured in epochs,
//! and rewards are paid from a module-held balance using the participation snapshot taken
//! one reward epoch earlier.
//!
//! Design goals:
//! - Deterministic: ordered keyspaces, fixed-precision decimals, truncation toward zero
//! - Validate first, then commit (a returned `Err` never leaves a partial mutation)
//! - IO-free core; token transfers and the epoch clock come in through [`BankKeeper`] and
//!   [`EpochKeeper`]

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod components;
pub mod config;
pub mod decimal;
pub mod events;
pub mod genesis;
pub mod hash;
pub mod invariant_rail;
pub mod invariants;
pub mod keeper;
pub mod math;
pub mod params;
pub mod pool;
pub mod query;
pub mod rewards;
pub mod store;
pub mod types;
pub mod unbonding;

pub use components::{MemBank, MemEpochs};
pub use config::LedgerConfig;
pub use decimal::Dec;
pub use events::StakingEvent;
pub use genesis::GenesisState;
pub use invariant_rail::{first_invariant_counterexample, LedgerAction, Simulation};
pub use invariants::{InvariantCounterexample, InvariantId, InvariantViolation};
pub use keeper::{Ctx, StakingLedger};
pub use params::{ParamStore, Params, VersionedParams};
pub use rewards::DistributionOutcome;
pub use types::{
    Address, Amount, Coin, DecCoin, Denom, EpochIdentifier, EpochSnapshot, StakeResponse,
    StakerShares, StakingPool, UnbondingInfo, UnstakeResponse, UserStake,
};

/// 32-byte hash newtype used for state commitments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Hash32(pub [u8; 32]);

/// Errors returned by the staking ledger.
///
/// Transfer failures after validation has passed are not represented here: they abort the
/// state transition (see [`keeper`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StakingError {
    // Validation errors
    #[error("unsupported token: {0}")]
    UnsupportedDenom(Denom),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("unstake amount exceeds user's share: {0}")]
    InsufficientShares(Dec),

    #[error("insufficient funds: {address} has {available}{denom}, needs {required}{denom}")]
    InsufficientFunds {
        address: Address,
        denom: Denom,
        available: Amount,
        required: Amount,
    },

    #[error("not found pool for denom {0}")]
    PoolNotFound(Denom),

    #[error("pool for denom {0} has nothing staked")]
    EmptyPool(Denom),

    #[error("no stake found for {address} in {denom}")]
    StakeNotFound { address: Address, denom: Denom },

    #[error("no unbonding found for {address} in {denom}")]
    UnbondingNotFound { address: Address, denom: Denom },

    #[error("no snapshot found for denom {denom} at epoch {epoch:?}")]
    SnapshotNotFound { denom: Denom, epoch: Option<u64> },

    // Parameter errors
    #[error("invalid reward rate: {0}")]
    InvalidRewardRate(String),

    #[error("unbonding duration {actual:?} outside bounds [{min:?}, {max:?}]")]
    UnbondingDurationOutOfBounds {
        actual: Duration,
        min: Duration,
        max: Duration,
    },

    #[error("supported token {0} is not in the allow-list")]
    UnsupportedToken(Denom),

    #[error("supported tokens must not be empty")]
    EmptySupportedTokens,

    #[error("unknown epoch identifier: {0}")]
    UnknownEpochIdentifier(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Arithmetic / internal
    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("invariant violated: {0}")]
    InvariantViolated(String),
}

pub type Result<T> = std::result::Result<T, StakingError>;

/// Failure reported by the token transfer service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankError {
    #[error("insufficient balance: {address} has {available}{denom}, needs {required}{denom}")]
    InsufficientBalance {
        address: Address,
        denom: Denom,
        available: Amount,
        required: Amount,
    },

    #[error("balance overflow for {address} in {denom}")]
    Overflow { address: Address, denom: Denom },

    #[error("account {0} cannot send or receive")]
    AccountFrozen(Address),
}

/// Token transfer service backing the ledger's escrow and reward accounts.
pub trait BankKeeper {
    /// Postconditions:
    /// - Returns 0 for accounts that never held `denom`.
    fn balance(&self, address: &Address, denom: &Denom) -> Amount;

    /// Preconditions:
    /// - `coin.amount > 0`.
    ///
    /// Postconditions:
    /// - On `Ok`, `from` is debited and `to` credited by exactly `coin.amount`.
    /// - On `Err`, no balance changed.
    fn send(
        &mut self,
        from: &Address,
        to: &Address,
        coin: &Coin,
    ) -> std::result::Result<(), BankError>;
}

/// Read-only view of the external epoch scheduler.
pub trait EpochKeeper {
    /// Postconditions:
    /// - Monotonically non-decreasing across calls for a fixed identifier.
    fn current_epoch(&self, identifier: EpochIdentifier) -> u64;
}

/// Callbacks invoked by the epoch scheduler once per identifier-named period.
pub trait EpochHooks {
    /// Called before epoch `epoch` of `identifier` starts.
    fn before_epoch_start(
        &mut self,
        ctx: &mut Ctx<'_>,
        identifier: &str,
        epoch: u64,
    ) -> Result<()>;

    /// Called after epoch `epoch` of `identifier` ended.
    ///
    /// Postconditions:
    /// - Repeating a call for an already-processed `(identifier, epoch)` is a no-op.
    /// - An `Err` leaves the implementor's state unchanged.
    fn after_epoch_end(&mut self, ctx: &mut Ctx<'_>, identifier: &str, epoch: u64) -> Result<()>;
}
