//! The staking ledger and its inbound operations.
//!
//! Every operation validates and computes all new records first, then commits. Token transfer
//! failures after that point are faults: the ledger logs them and panics so the host aborts the
//! whole state transition instead of persisting a world where escrow and claims disagree.

use std::str::FromStr;

use tracing::{debug, error, info, instrument, warn};

use crate::config::LedgerConfig;
use crate::decimal::Dec;
use crate::events::StakingEvent;
use crate::params::VersionedParams;
use crate::store::LedgerStore;
use crate::types::{
    Address, Coin, DecCoin, EpochIdentifier, StakeResponse, StakingPool, UnstakeResponse,
    UserStake,
};
use crate::{BankError, BankKeeper, EpochHooks, EpochKeeper, Result, StakingError};

/// Per-call environment: current parameters plus the external collaborators.
pub struct Ctx<'a> {
    pub params: &'a VersionedParams,
    pub bank: &'a mut dyn BankKeeper,
    pub epochs: &'a dyn EpochKeeper,
}

impl<'a> Ctx<'a> {
    pub fn new(
        params: &'a VersionedParams,
        bank: &'a mut dyn BankKeeper,
        epochs: &'a dyn EpochKeeper,
    ) -> Self {
        Self {
            params,
            bank,
            epochs,
        }
    }

    pub fn reward_epoch(&self) -> u64 {
        self.epochs
            .current_epoch(self.params.reward_epoch_identifier)
    }

    pub fn unbonding_epoch(&self) -> u64 {
        self.epochs
            .current_epoch(self.params.unbonding_epoch_identifier)
    }
}

#[derive(Clone, Debug)]
pub struct StakingLedger {
    pub(crate) config: LedgerConfig,
    pub(crate) store: LedgerStore,
    events: Vec<StakingEvent>,
}

impl StakingLedger {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store: LedgerStore::new(),
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Drain events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<StakingEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: StakingEvent) {
        self.events.push(event);
    }

    /// Lock `coin` from `staker` into the denom's pool.
    ///
    /// # Panics
    ///
    /// If the escrow transfer fails after the balance check passed.
    #[instrument(skip(self, ctx, staker, coin), fields(staker = %staker, coin = %coin))]
    pub fn stake_tokens(
        &mut self,
        ctx: &mut Ctx<'_>,
        staker: &Address,
        coin: Coin,
    ) -> Result<StakeResponse> {
        if !ctx.params.is_supported(&coin.denom) {
            return Err(StakingError::UnsupportedDenom(coin.denom));
        }
        if coin.amount == 0 {
            return Err(StakingError::InvalidAmount(format!(
                "stake amount must be positive, got {coin}"
            )));
        }
        let available = ctx.bank.balance(staker, &coin.denom);
        if available < coin.amount {
            return Err(StakingError::InsufficientFunds {
                address: staker.clone(),
                denom: coin.denom,
                available,
                required: coin.amount,
            });
        }

        let amount = Dec::from_amount(coin.amount)?;
        let epoch = ctx.reward_epoch();
        let pool = self
            .store
            .pool(&coin.denom)
            .cloned()
            .unwrap_or_else(|| StakingPool::empty(coin.denom.clone()));
        let shares = pool.shares_for_deposit(amount)?;
        let new_pool = pool.deposited(amount, shares)?;
        let prior_shares = self
            .store
            .user_stake(staker, &coin.denom)
            .map(|s| s.shares)
            .unwrap_or(Dec::ZERO);
        let new_stake = UserStake {
            address: staker.clone(),
            denom: coin.denom.clone(),
            shares: prior_shares.checked_add(shares)?,
            epoch,
        };

        let escrow = self.config.escrow_address();
        if let Err(e) = ctx.bank.send(staker, &escrow, &coin) {
            fault("stake escrow", &e);
        }

        // Commit.
        self.store.put_pool(new_pool);
        self.store.put_user_stake(new_stake);
        self.emit(StakingEvent::Staked {
            staker: staker.clone(),
            coin: coin.clone(),
            shares,
            epoch,
        });
        info!(%shares, epoch, "tokens staked");

        Ok(StakeResponse {
            staker: staker.clone(),
            amount: DecCoin::new(coin.denom, amount),
            shares,
        })
    }

    /// Redeem shares worth `coin` and queue the principal for release.
    ///
    /// Tokens stay in escrow until the unbonding entry matures. Unstaking is checked against
    /// the static allow-list rather than `supported_tokens`, so delisting a denom never traps
    /// existing positions.
    #[instrument(skip(self, ctx, staker, coin), fields(staker = %staker, coin = %coin))]
    pub fn unstake_tokens(
        &mut self,
        ctx: &mut Ctx<'_>,
        staker: &Address,
        coin: Coin,
    ) -> Result<UnstakeResponse> {
        if !self.config.is_allowed(&coin.denom) {
            return Err(StakingError::UnsupportedDenom(coin.denom));
        }
        if coin.amount == 0 {
            return Err(StakingError::InvalidAmount(format!(
                "unstake amount must be positive, got {coin}"
            )));
        }
        let pool = self
            .store
            .pool(&coin.denom)
            .ok_or_else(|| StakingError::PoolNotFound(coin.denom.clone()))?;

        let amount = Dec::from_amount(coin.amount)?;
        let shares = pool.shares_for_withdrawal(amount)?;
        let held = self
            .store
            .user_stake(staker, &coin.denom)
            .map(|s| s.shares)
            .unwrap_or(Dec::ZERO);
        if held < shares {
            return Err(StakingError::InsufficientShares(held));
        }

        let new_pool = pool.withdrawn(amount, shares)?;
        let new_stake = UserStake {
            address: staker.clone(),
            denom: coin.denom.clone(),
            shares: held.checked_sub(shares)?,
            epoch: ctx.reward_epoch(),
        };
        let entry = self.queued_unbonding(ctx, staker, &coin.denom, amount)?;
        let unbond_epoch = entry.unbond_epoch;

        // Commit.
        self.store.put_pool(new_pool);
        self.store.put_user_stake(new_stake);
        self.store.put_unbonding(entry);
        self.emit(StakingEvent::UnbondRequested {
            staker: staker.clone(),
            coin: coin.clone(),
            shares,
            unbond_epoch,
        });
        info!(%shares, unbond_epoch, "unbonding requested");

        Ok(UnstakeResponse {
            staker: staker.clone(),
            amount: DecCoin::new(coin.denom, amount),
            unbond_epoch,
        })
    }
}

impl EpochHooks for StakingLedger {
    fn before_epoch_start(
        &mut self,
        _ctx: &mut Ctx<'_>,
        identifier: &str,
        epoch: u64,
    ) -> Result<()> {
        debug!(identifier, epoch, "epoch starting");
        Ok(())
    }

    /// Release matured unbondings on the unbonding cycle; snapshot then distribute on the
    /// reward cycle. The distribution pays from the snapshot set that was current before this
    /// call replaced it.
    ///
    /// Both steps are planned before either is applied, so an `Err` leaves the ledger as it was
    /// and the same epoch can be retried.
    #[instrument(skip(self, ctx))]
    fn after_epoch_end(&mut self, ctx: &mut Ctx<'_>, identifier: &str, epoch: u64) -> Result<()> {
        let Ok(id) = EpochIdentifier::from_str(identifier) else {
            warn!(identifier, "ignoring unknown epoch identifier");
            return Ok(());
        };

        let releases = if id == ctx.params.unbonding_epoch_identifier {
            Some(self.matured_releases(epoch)?)
        } else {
            None
        };

        let reward_step = if id != ctx.params.reward_epoch_identifier {
            None
        } else if self.store.last_snapshot_epoch().is_some_and(|last| epoch <= last) {
            warn!(epoch, "reward epoch already processed");
            None
        } else {
            let taken = self.collect_snapshots(ctx, epoch);
            let plan = self.plan_distribution(ctx, self.store.latest_snapshots())?;
            Some((taken, plan))
        };

        // Commit.
        if let Some(releases) = releases {
            self.apply_releases(ctx, epoch, &releases);
        }
        if let Some((taken, plan)) = reward_step {
            self.commit_snapshots(epoch, taken);
            self.execute_distribution(ctx, plan);
        }
        Ok(())
    }
}

/// Abort the state transition after a transfer failed past validation.
pub(crate) fn fault(what: &str, err: &BankError) -> ! {
    error!(error = %err, "{what} transfer failed");
    panic!("stablestaking: {what} transfer failed: {err}");
}
