//! Pool ledger: share issuance and redemption.
//!
//! Both directions use the same instantaneous ratio `total_shares / total_staked`, and nothing
//! ever credits a pool without issuing shares, so once bootstrapped a pool's ratio stays at 1.

use crate::decimal::Dec;
use crate::types::{Denom, StakingPool};
use crate::{Result, StakingError};

impl StakingPool {
    pub fn empty(denom: Denom) -> Self {
        Self {
            denom,
            total_staked: Dec::ZERO,
            total_shares: Dec::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_staked.is_zero()
    }

    /// Shares minted for depositing `amount`: 1:1 into an empty pool, pro-rata otherwise.
    pub fn shares_for_deposit(&self, amount: Dec) -> Result<Dec> {
        if self.total_staked.is_zero() || self.total_shares.is_zero() {
            return Ok(amount);
        }
        amount.mul_quo(self.total_shares, self.total_staked)
    }

    /// Shares burned for withdrawing `amount`.
    ///
    /// Preconditions:
    /// - `total_staked > 0` (otherwise `EmptyPool`).
    pub fn shares_for_withdrawal(&self, amount: Dec) -> Result<Dec> {
        if self.total_staked.is_zero() {
            return Err(StakingError::EmptyPool(self.denom.clone()));
        }
        amount.mul_quo(self.total_shares, self.total_staked)
    }

    /// Value of `shares` at the current ratio.
    pub fn value_of_shares(&self, shares: Dec) -> Result<Dec> {
        if self.total_shares.is_zero() {
            return Ok(Dec::ZERO);
        }
        shares.mul_quo(self.total_staked, self.total_shares)
    }

    /// Pool after a deposit of `amount` minting `shares`.
    pub fn deposited(&self, amount: Dec, shares: Dec) -> Result<StakingPool> {
        Ok(StakingPool {
            denom: self.denom.clone(),
            total_staked: self.total_staked.checked_add(amount)?,
            total_shares: self.total_shares.checked_add(shares)?,
        })
    }

    /// Pool after a withdrawal of `amount` burning `shares`.
    pub fn withdrawn(&self, amount: Dec, shares: Dec) -> Result<StakingPool> {
        if amount > self.total_staked || shares > self.total_shares {
            return Err(StakingError::InvariantViolated(format!(
                "pool {} would go negative",
                self.denom
            )));
        }
        let total_staked = self.total_staked.checked_sub(amount)?;
        let total_shares = self.total_shares.checked_sub(shares)?;
        Ok(StakingPool {
            denom: self.denom.clone(),
            total_staked,
            total_shares,
        })
    }
}
