//! Unbonding queue: pending withdrawals and their epoch-gated release.

use tracing::{info, instrument};

use crate::decimal::Dec;
use crate::events::StakingEvent;
use crate::keeper::{fault, Ctx, StakingLedger};
use crate::math::add_epoch;
use crate::types::{Address, Coin, Denom, UnbondingInfo};
use crate::Result;

/// Release performed by [`StakingLedger::release_matured`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Release {
    pub address: Address,
    pub coin: Coin,
}

impl StakingLedger {
    /// The entry that a new request for `amount` leaves behind.
    ///
    /// A pending entry accumulates the amount and takes the new unlock epoch, so the whole
    /// pending balance waits out the latest request.
    pub(crate) fn queued_unbonding(
        &self,
        ctx: &Ctx<'_>,
        staker: &Address,
        denom: &Denom,
        amount: Dec,
    ) -> Result<UnbondingInfo> {
        let unbond_epoch = add_epoch(
            ctx.unbonding_epoch(),
            ctx.params.unbonding_period_epochs()?,
        )?;
        let pending = self
            .store
            .unbonding(staker, denom)
            .map(|u| u.amount)
            .unwrap_or(Dec::ZERO);
        Ok(UnbondingInfo {
            address: staker.clone(),
            denom: denom.clone(),
            amount: pending.checked_add(amount)?,
            unbond_epoch,
        })
    }

    /// Pay out and delete every entry with `unbond_epoch <= epoch`.
    ///
    /// Idempotent: released entries no longer exist on a second call.
    ///
    /// # Panics
    ///
    /// If a transfer out of escrow fails.
    #[instrument(skip(self, ctx))]
    pub fn release_matured(&mut self, ctx: &mut Ctx<'_>, epoch: u64) -> Result<Vec<Release>> {
        let releases = self.matured_releases(epoch)?;
        self.apply_releases(ctx, epoch, &releases);
        Ok(releases)
    }

    /// Entries due at `epoch`, ordered by (address, denom).
    pub(crate) fn matured_releases(&self, epoch: u64) -> Result<Vec<Release>> {
        self.store
            .all_unbondings()
            .filter(|u| u.unbond_epoch <= epoch)
            .map(|info| -> Result<Release> {
                Ok(Release {
                    address: info.address.clone(),
                    coin: Coin::new(info.denom.clone(), info.amount.truncate_to_amount()?),
                })
            })
            .collect()
    }

    pub(crate) fn apply_releases(&mut self, ctx: &mut Ctx<'_>, epoch: u64, releases: &[Release]) {
        let escrow = self.config.escrow_address();
        for r in releases {
            if r.coin.amount > 0 {
                if let Err(e) = ctx.bank.send(&escrow, &r.address, &r.coin) {
                    fault("unbonding release", &e);
                }
            }
            self.store.remove_unbonding(&r.address, &r.coin.denom);
            self.emit(StakingEvent::UnbondCompleted {
                staker: r.address.clone(),
                coin: r.coin.clone(),
                epoch,
            });
            info!(address = %r.address, coin = %r.coin, "unbonding released");
        }
    }
}
