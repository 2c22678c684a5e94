//! Epoch snapshots and the lagged reward distributor.
//!
//! At every reward-epoch boundary the hook first records who was staked before the epoch
//! (positions touched during the epoch are left out), then pays the reward account's balance
//! out against the snapshot recorded one boundary earlier. Payouts are split across pools by
//! staked amount and within a pool by shares, each truncated; the remainder stays in the
//! reward account.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};

use crate::decimal::Dec;
use crate::events::StakingEvent;
use crate::keeper::{fault, Ctx, StakingLedger};
use crate::math::{add_amount, pro_rata_floor, sub_amount};
use crate::params::Params;
use crate::types::{Address, Amount, Coin, Denom, EpochSnapshot, StakerShares};
use crate::Result;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistributionOutcome {
    /// Reward-account balance at the start of the distribution.
    pub reward_balance: Amount,
    /// Sum of `total_staked` over the snapshots that took part.
    pub total_staked: Dec,
    pub paid_total: Amount,
    /// Truncation remainder left in the reward account: `reward_balance - paid_total`.
    pub dust: Amount,
}

struct Payout {
    staker: Address,
    pool_denom: Denom,
    amount: Amount,
}

/// Everything a distribution will do, computed before any token moves.
pub(crate) struct DistributionPlan {
    outcome: DistributionOutcome,
    /// `None` when there is nothing to distribute at all.
    payouts: Option<Vec<Payout>>,
}

impl StakingLedger {
    /// Record the participants of every supported, non-empty pool as of `epoch`.
    ///
    /// Only positions last modified before `epoch` are included. The new set replaces the
    /// latest snapshots wholesale (pools that emptied drop out) and is archived under `epoch`.
    /// Returns the set it replaced.
    #[instrument(skip(self, ctx))]
    pub fn snapshot_current_epoch(
        &mut self,
        ctx: &Ctx<'_>,
        epoch: u64,
    ) -> BTreeMap<Denom, EpochSnapshot> {
        let taken = self.collect_snapshots(ctx, epoch);
        self.commit_snapshots(epoch, taken)
    }

    pub(crate) fn collect_snapshots(
        &self,
        ctx: &Ctx<'_>,
        epoch: u64,
    ) -> BTreeMap<Denom, EpochSnapshot> {
        let mut taken = BTreeMap::new();
        for denom in ctx.params.supported_set() {
            let Some(pool) = self.store.pool(denom) else {
                continue;
            };
            if pool.is_empty() {
                continue;
            }
            let stakers: Vec<StakerShares> = self
                .store
                .positions_in(denom)
                .filter(|s| s.epoch < epoch)
                .map(|s| StakerShares {
                    address: s.address.clone(),
                    shares: s.shares,
                })
                .collect();
            debug!(%denom, stakers = stakers.len(), "pool snapshot");
            taken.insert(
                denom.clone(),
                EpochSnapshot {
                    denom: denom.clone(),
                    epoch,
                    total_staked: pool.total_staked,
                    total_shares: pool.total_shares,
                    stakers,
                },
            );
        }
        taken
    }

    pub(crate) fn commit_snapshots(
        &mut self,
        epoch: u64,
        taken: BTreeMap<Denom, EpochSnapshot>,
    ) -> BTreeMap<Denom, EpochSnapshot> {
        for snap in taken.values() {
            self.emit(StakingEvent::SnapshotTaken {
                denom: snap.denom.clone(),
                epoch,
                total_staked: snap.total_staked,
                stakers: snap.stakers.len(),
            });
        }
        info!(epoch, pools = taken.len(), "epoch snapshot taken");
        self.store.replace_latest_snapshots(epoch, taken)
    }

    /// Pay the reward account's balance out against `snapshots`.
    ///
    /// Iterates pools by denom and stakers by address. Zero payouts are skipped. Every amount
    /// is computed before the first transfer, so an `Err` leaves ledger and balances untouched.
    ///
    /// # Panics
    ///
    /// If a transfer out of the reward account fails.
    #[instrument(skip(self, ctx, snapshots), fields(pools = snapshots.len()))]
    pub fn distribute_rewards_to_last_epoch_stakers(
        &mut self,
        ctx: &mut Ctx<'_>,
        snapshots: &BTreeMap<Denom, EpochSnapshot>,
    ) -> Result<DistributionOutcome> {
        let plan = self.plan_distribution(ctx, snapshots)?;
        Ok(self.execute_distribution(ctx, plan))
    }

    /// Pool share is `trunc((pool staked / staked across pools) * balance)`; a staker's share
    /// of it is `trunc((shares / pool shares) * pool reward)`.
    pub(crate) fn plan_distribution(
        &self,
        ctx: &Ctx<'_>,
        snapshots: &BTreeMap<Denom, EpochSnapshot>,
    ) -> Result<DistributionPlan> {
        let reward_account = self.config.reward_address();
        let reward_balance = ctx.bank.balance(&reward_account, &self.config.reward_denom);
        if reward_balance == 0 {
            return Ok(DistributionPlan {
                outcome: DistributionOutcome::default(),
                payouts: None,
            });
        }

        let mut total_staked = Dec::ZERO;
        for snap in snapshots.values().filter(|s| s.total_staked.is_positive()) {
            total_staked = total_staked.checked_add(snap.total_staked)?;
        }
        if total_staked.is_zero() {
            return Ok(DistributionPlan {
                outcome: DistributionOutcome {
                    reward_balance,
                    dust: reward_balance,
                    ..DistributionOutcome::default()
                },
                payouts: None,
            });
        }

        let balance = Dec::from_amount(reward_balance)?;
        let mut payouts = Vec::new();
        let mut paid_total: Amount = 0;
        for snap in snapshots.values().filter(|s| s.total_staked.is_positive()) {
            let pool_reward = pro_rata_floor(snap.total_staked, total_staked, balance)?;
            if pool_reward == 0 || snap.total_shares.is_zero() {
                continue;
            }
            let pool_reward = Dec::from_amount(pool_reward)?;
            for staker in &snap.stakers {
                let amount = pro_rata_floor(staker.shares, snap.total_shares, pool_reward)?;
                if amount == 0 {
                    continue;
                }
                paid_total = add_amount(paid_total, amount)?;
                payouts.push(Payout {
                    staker: staker.address.clone(),
                    pool_denom: snap.denom.clone(),
                    amount,
                });
            }
        }
        let dust = sub_amount(reward_balance, paid_total)?;

        Ok(DistributionPlan {
            outcome: DistributionOutcome {
                reward_balance,
                total_staked,
                paid_total,
                dust,
            },
            payouts: Some(payouts),
        })
    }

    /// Carry out a plan. Cannot fail short of a transfer fault.
    pub(crate) fn execute_distribution(
        &mut self,
        ctx: &mut Ctx<'_>,
        plan: DistributionPlan,
    ) -> DistributionOutcome {
        let DistributionPlan { outcome, payouts } = plan;
        let Some(payouts) = payouts else {
            if outcome.reward_balance == 0 {
                debug!("reward account empty, nothing to distribute");
            } else {
                warn!(
                    reward_balance = outcome.reward_balance,
                    "no eligible pools, rewards carried over"
                );
            }
            return outcome;
        };

        let reward_account = self.config.reward_address();
        let reward_denom = self.config.reward_denom.clone();
        for p in payouts {
            let coin = Coin::new(reward_denom.clone(), p.amount);
            if let Err(e) = ctx.bank.send(&reward_account, &p.staker, &coin) {
                fault("reward payout", &e);
            }
            debug!(staker = %p.staker, pool = %p.pool_denom, amount = p.amount, "reward paid");
            self.emit(StakingEvent::RewardPaid {
                staker: p.staker,
                denom: reward_denom.clone(),
                pool_denom: p.pool_denom,
                amount: p.amount,
            });
        }

        self.emit(StakingEvent::RewardsDistributed {
            reward_balance: outcome.reward_balance,
            paid_total: outcome.paid_total,
            dust: outcome.dust,
        });
        info!(
            reward_balance = outcome.reward_balance,
            paid_total = outcome.paid_total,
            dust = outcome.dust,
            "rewards distributed"
        );
        outcome
    }

    /// Projection `first_supported_pool.total_staked * reward_rate`, truncated.
    ///
    /// Zero when the first supported denom has no pool yet.
    pub fn epoch_reward(&self, params: &Params) -> Result<Amount> {
        let rate = params.reward_rate()?;
        let Some(pool) = params
            .supported_tokens
            .first()
            .and_then(|d| self.store.pool(d))
        else {
            return Ok(0);
        };
        pool.total_staked.checked_mul(rate)?.truncate_to_amount()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{MemBank, MemEpochs};
    use crate::config::LedgerConfig;
    use crate::params::ParamStore;
    use crate::{BankKeeper, EpochHooks};

    struct Env {
        ledger: StakingLedger,
        bank: MemBank,
        epochs: MemEpochs,
        params: ParamStore,
    }

    impl Env {
        fn new() -> Self {
            let config = LedgerConfig::default();
            let params = ParamStore::new(Params::default(), &config).unwrap();
            Self {
                ledger: StakingLedger::new(config).unwrap(),
                bank: MemBank::new(),
                epochs: MemEpochs::new(),
                params,
            }
        }

        fn stake(&mut self, who: &str, denom: &str, amount: Amount) {
            let addr = Address::new(who);
            self.bank.mint(&addr, &Coin::new(denom, amount)).unwrap();
            let mut ctx = Ctx::new(self.params.current(), &mut self.bank, &self.epochs);
            self.ledger
                .stake_tokens(&mut ctx, &addr, Coin::new(denom, amount))
                .unwrap();
        }

        fn fund_rewards(&mut self, amount: Amount) {
            let acct = self.ledger.config().reward_address();
            let denom = self.ledger.config().reward_denom.clone();
            self.bank.mint(&acct, &Coin::new(denom, amount)).unwrap();
        }

        fn snapshot(&mut self, epoch: u64) -> BTreeMap<Denom, EpochSnapshot> {
            let ctx = Ctx::new(self.params.current(), &mut self.bank, &self.epochs);
            self.ledger.snapshot_current_epoch(&ctx, epoch)
        }

        fn distribute(&mut self, snaps: &BTreeMap<Denom, EpochSnapshot>) -> DistributionOutcome {
            let mut ctx = Ctx::new(self.params.current(), &mut self.bank, &self.epochs);
            self.ledger
                .distribute_rewards_to_last_epoch_stakers(&mut ctx, snaps)
                .unwrap()
        }

        fn rewards_of(&self, who: &str) -> Amount {
            self.bank
                .balance(&Address::new(who), &self.ledger.config().reward_denom)
        }
    }

    #[test]
    fn snapshot_excludes_positions_touched_this_epoch() {
        let mut env = Env::new();
        env.stake("alice", "uusd", 100);
        env.snapshot(0);
        let snap = env.ledger.store().latest_snapshot(&"uusd".into()).unwrap();
        assert!(snap.stakers.is_empty());
        assert_eq!(snap.total_staked, Dec::from_amount(100).unwrap());

        env.snapshot(1);
        let snap = env.ledger.store().latest_snapshot(&"uusd".into()).unwrap();
        assert_eq!(snap.stakers.len(), 1);
        assert_eq!(snap.stakers[0].address, Address::new("alice"));
        assert!(env.ledger.store().snapshot_at(&"uusd".into(), 0).is_some());
    }

    #[test]
    fn single_pool_single_staker_receives_everything() {
        let mut env = Env::new();
        env.stake("alice", "uusd", 1_000);
        env.snapshot(1);
        env.fund_rewards(100);
        let snaps = env.ledger.store().latest_snapshots().clone();
        let out = env.distribute(&snaps);
        assert_eq!(out.paid_total, 100);
        assert_eq!(out.dust, 0);
        assert_eq!(env.rewards_of("alice"), 100);
    }

    #[test]
    fn rewards_split_across_pools_by_stake_then_by_shares() {
        let mut env = Env::new();
        env.stake("alice", "uusd", 300);
        env.stake("bob", "uusd", 100);
        env.stake("carol", "ukhd", 600);
        env.snapshot(1);
        env.fund_rewards(1_000);
        let snaps = env.ledger.store().latest_snapshots().clone();
        let out = env.distribute(&snaps);

        // uusd pool: 400/1000 * 1000 = 400 -> alice 300, bob 100; ukhd pool: 600 -> carol.
        assert_eq!(env.rewards_of("alice"), 300);
        assert_eq!(env.rewards_of("bob"), 100);
        assert_eq!(env.rewards_of("carol"), 600);
        assert_eq!(out.paid_total, 1_000);
    }

    #[test]
    fn truncation_dust_stays_in_reward_account() {
        let mut env = Env::new();
        env.stake("alice", "uusd", 1);
        env.stake("bob", "uusd", 1);
        env.stake("carol", "uusd", 1);
        env.snapshot(1);
        env.fund_rewards(10);
        let snaps = env.ledger.store().latest_snapshots().clone();
        let out = env.distribute(&snaps);
        assert_eq!(out.paid_total, 9);
        assert_eq!(out.dust, 1);
        let reward_acct = env.ledger.config().reward_address();
        assert_eq!(
            env.bank.balance(&reward_acct, &env.ledger.config().reward_denom),
            1
        );
    }

    #[test]
    fn empty_reward_account_is_a_no_op() {
        let mut env = Env::new();
        env.stake("alice", "uusd", 10);
        env.snapshot(1);
        let snaps = env.ledger.store().latest_snapshots().clone();
        env.ledger.take_events();
        let out = env.distribute(&snaps);
        assert_eq!(out, DistributionOutcome::default());
        assert!(env.ledger.take_events().is_empty());
    }

    #[test]
    fn no_snapshots_leaves_balance_untouched() {
        let mut env = Env::new();
        env.fund_rewards(50);
        let out = env.distribute(&BTreeMap::new());
        assert_eq!(out.paid_total, 0);
        assert_eq!(out.dust, 50);
    }

    #[test]
    fn epoch_reward_projects_first_supported_pool() {
        let mut env = Env::new();
        let params = env.params.current().params.clone();
        assert_eq!(env.ledger.epoch_reward(&params).unwrap(), 0);
        env.stake("alice", "uusd", 1_000);
        env.stake("bob", "ukhd", 5_000);
        assert_eq!(env.ledger.epoch_reward(&params).unwrap(), 50);
    }

    #[test]
    fn failed_reward_hook_leaves_ledger_untouched() {
        let mut env = Env::new();
        for denom in ["uusd", "ukhd"] {
            env.ledger.store.put_pool(crate::types::StakingPool {
                denom: Denom::new(denom),
                total_staked: Dec::MAX,
                total_shares: Dec::MAX,
            });
        }
        env.fund_rewards(100);
        {
            let mut ctx = Ctx::new(env.params.current(), &mut env.bank, &env.epochs);
            env.ledger.after_epoch_end(&mut ctx, "week", 0).unwrap();
        }
        env.ledger.take_events();
        let before = env.ledger.state_hash();

        // Summing the two previous snapshots overflows while planning.
        let mut ctx = Ctx::new(env.params.current(), &mut env.bank, &env.epochs);
        let err = env.ledger.after_epoch_end(&mut ctx, "week", 1).unwrap_err();
        assert!(matches!(err, crate::StakingError::Overflow(_)));

        assert_eq!(env.ledger.state_hash(), before);
        assert!(env.ledger.take_events().is_empty());
        assert_eq!(env.ledger.store().last_snapshot_epoch(), Some(0));
        assert_eq!(
            env.ledger
                .store()
                .latest_snapshot(&"uusd".into())
                .map(|s| s.epoch),
            Some(0)
        );
        let reward_acct = env.ledger.config().reward_address();
        assert_eq!(
            env.bank.balance(&reward_acct, &env.ledger.config().reward_denom),
            100
        );
    }

    #[test]
    fn divides_before_scaling_the_balance() {
        let mut env = Env::new();
        env.stake("alice", "uusd", 1);
        env.stake("bob", "ukhd", 2);
        env.snapshot(1);
        env.fund_rewards(3);
        let snaps = env.ledger.store().latest_snapshots().clone();
        let out = env.distribute(&snaps);

        // 1/3 and 2/3 truncate to 18 places before multiplying by 3.
        assert_eq!(env.rewards_of("alice"), 0);
        assert_eq!(env.rewards_of("bob"), 1);
        assert_eq!(out.paid_total, 1);
        assert_eq!(out.dust, 2);
    }
}
