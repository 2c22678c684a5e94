//! Read-only queries. None of these mutate the ledger.

use crate::decimal::Dec;
use crate::keeper::StakingLedger;
use crate::params::{Params, VersionedParams};
use crate::types::{
    Address, Amount, DecCoin, Denom, EpochSnapshot, StakingPool, UnbondingInfo, UserStake,
};
use crate::{Result, StakingError};

impl StakingLedger {
    pub fn pool(&self, denom: &Denom) -> Option<&StakingPool> {
        self.store.pool(denom)
    }

    pub fn query_pool(&self, denom: &Denom) -> Result<StakingPool> {
        self.pool(denom)
            .cloned()
            .ok_or_else(|| StakingError::PoolNotFound(denom.clone()))
    }

    /// All pools, ordered by denom.
    pub fn query_pools(&self) -> Vec<StakingPool> {
        self.store.pools().cloned().collect()
    }

    pub fn user_stake(&self, address: &Address, denom: &Denom) -> Option<&UserStake> {
        self.store.user_stake(address, denom)
    }

    pub fn query_user_stake(&self, address: &Address, denom: &Denom) -> Result<UserStake> {
        self.user_stake(address, denom)
            .cloned()
            .ok_or_else(|| StakingError::StakeNotFound {
                address: address.clone(),
                denom: denom.clone(),
            })
    }

    /// Staked value per denom at each pool's current ratio, ordered by denom.
    ///
    /// Positions that have been fully unstaked are left out.
    pub fn query_user_total_stake(&self, address: &Address) -> Result<Vec<DecCoin>> {
        let mut out = Vec::new();
        for pool in self.store.pools() {
            let Some(stake) = self.store.user_stake(address, &pool.denom) else {
                continue;
            };
            if stake.shares.is_zero() {
                continue;
            }
            out.push(DecCoin::new(
                pool.denom.clone(),
                pool.value_of_shares(stake.shares)?,
            ));
        }
        Ok(out)
    }

    pub fn unbonding_info(&self, address: &Address, denom: &Denom) -> Option<&UnbondingInfo> {
        self.store.unbonding(address, denom)
    }

    pub fn query_unbonding(&self, address: &Address, denom: &Denom) -> Result<UnbondingInfo> {
        self.unbonding_info(address, denom)
            .cloned()
            .ok_or_else(|| StakingError::UnbondingNotFound {
                address: address.clone(),
                denom: denom.clone(),
            })
    }

    /// Pending unbondings of `address`, ordered by denom.
    pub fn query_user_total_unbonding(&self, address: &Address) -> Vec<UnbondingInfo> {
        self.store.unbondings_of(address).cloned().collect()
    }

    pub fn query_params<'p>(&self, params: &'p VersionedParams) -> &'p Params {
        &params.params
    }

    pub fn query_latest_snapshot(&self, denom: &Denom) -> Result<EpochSnapshot> {
        self.store
            .latest_snapshot(denom)
            .cloned()
            .ok_or_else(|| StakingError::SnapshotNotFound {
                denom: denom.clone(),
                epoch: None,
            })
    }

    pub fn query_snapshot_at(&self, denom: &Denom, epoch: u64) -> Result<EpochSnapshot> {
        self.store
            .snapshot_at(denom, epoch)
            .cloned()
            .ok_or_else(|| StakingError::SnapshotNotFound {
                denom: denom.clone(),
                epoch: Some(epoch),
            })
    }

    pub fn query_epoch_reward(&self, params: &Params) -> Result<Amount> {
        self.epoch_reward(params)
    }

    /// Total principal still owed to stakers in `denom`: staked plus pending unbonding.
    pub fn escrow_liability(&self, denom: &Denom) -> Result<Dec> {
        let mut total = self
            .store
            .pool(denom)
            .map(|p| p.total_staked)
            .unwrap_or(Dec::ZERO);
        for u in self.store.all_unbondings().filter(|u| &u.denom == denom) {
            total = total.checked_add(u.amount)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{MemBank, MemEpochs};
    use crate::config::LedgerConfig;
    use crate::keeper::Ctx;
    use crate::params::ParamStore;
    use crate::types::Coin;

    #[test]
    fn queries_report_missing_records() {
        let ledger = StakingLedger::new(LedgerConfig::default()).unwrap();
        let who = Address::new("nobody");
        let uusd = Denom::new("uusd");
        assert_eq!(
            ledger.query_pool(&uusd).unwrap_err().to_string(),
            "not found pool for denom uusd"
        );
        assert!(matches!(
            ledger.query_user_stake(&who, &uusd),
            Err(StakingError::StakeNotFound { .. })
        ));
        assert!(matches!(
            ledger.query_unbonding(&who, &uusd),
            Err(StakingError::UnbondingNotFound { .. })
        ));
        assert!(matches!(
            ledger.query_snapshot_at(&uusd, 3),
            Err(StakingError::SnapshotNotFound { epoch: Some(3), .. })
        ));
        assert!(ledger.query_pools().is_empty());
        assert!(ledger.query_user_total_stake(&who).unwrap().is_empty());
    }

    #[test]
    fn totals_are_sorted_and_skip_empty_positions() {
        let config = LedgerConfig::default();
        let params = ParamStore::new(Params::default(), &config).unwrap();
        let mut ledger = StakingLedger::new(config).unwrap();
        let mut bank = MemBank::new();
        let epochs = MemEpochs::new();
        let who = Address::new("staker");
        bank.mint(&who, &Coin::new("uusd", 1_000)).unwrap();
        bank.mint(&who, &Coin::new("ukhd", 1_000)).unwrap();

        let mut ctx = Ctx::new(params.current(), &mut bank, &epochs);
        ledger.stake_tokens(&mut ctx, &who, Coin::new("uusd", 700)).unwrap();
        ledger.stake_tokens(&mut ctx, &who, Coin::new("ukhd", 100)).unwrap();

        let totals = ledger.query_user_total_stake(&who).unwrap();
        let denoms: Vec<_> = totals.iter().map(|c| c.denom.as_str()).collect();
        assert_eq!(denoms, vec!["ukhd", "uusd"]);

        ledger.unstake_tokens(&mut ctx, &who, Coin::new("ukhd", 100)).unwrap();
        let totals = ledger.query_user_total_stake(&who).unwrap();
        assert_eq!(totals, vec![DecCoin::new("uusd", Dec::from_amount(700).unwrap())]);

        assert_eq!(
            ledger.escrow_liability(&Denom::new("ukhd")).unwrap(),
            Dec::from_amount(100).unwrap()
        );
        assert_eq!(ledger.query_params(params.current()).reward_rate, "0.05");
    }
}
