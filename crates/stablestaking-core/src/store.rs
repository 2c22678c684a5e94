//! Ordered keyspaces owned by the ledger.
//!
//! Every map is a `BTreeMap`, and the per-denom / per-address cursors are range scans over the
//! composite keys, so iteration order is identical on every replica.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::types::{Address, Denom, EpochSnapshot, StakingPool, UnbondingInfo, UserStake};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerStore {
    pools: BTreeMap<Denom, StakingPool>,
    stakes: BTreeMap<(Denom, Address), UserStake>,
    unbondings: BTreeMap<(Address, Denom), UnbondingInfo>,
    latest_snapshots: BTreeMap<Denom, EpochSnapshot>,
    snapshot_history: BTreeMap<(Denom, u64), EpochSnapshot>,
    last_snapshot_epoch: Option<u64>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Pools

    pub fn pool(&self, denom: &Denom) -> Option<&StakingPool> {
        self.pools.get(denom)
    }

    pub fn pools(&self) -> impl Iterator<Item = &StakingPool> {
        self.pools.values()
    }

    pub fn put_pool(&mut self, pool: StakingPool) {
        self.pools.insert(pool.denom.clone(), pool);
    }

    // Positions

    pub fn user_stake(&self, address: &Address, denom: &Denom) -> Option<&UserStake> {
        self.stakes.get(&(denom.clone(), address.clone()))
    }

    pub fn put_user_stake(&mut self, stake: UserStake) {
        self.stakes
            .insert((stake.denom.clone(), stake.address.clone()), stake);
    }

    /// Positions in one pool, ordered by address.
    pub fn positions_in<'a>(&'a self, denom: &Denom) -> impl Iterator<Item = &'a UserStake> + 'a {
        let denom = denom.clone();
        let start = (denom.clone(), Address::new(""));
        self.stakes
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(move |((d, _), _)| *d == denom)
            .map(|(_, s)| s)
    }

    pub fn all_positions(&self) -> impl Iterator<Item = &UserStake> {
        self.stakes.values()
    }

    // Unbonding queue

    pub fn unbonding(&self, address: &Address, denom: &Denom) -> Option<&UnbondingInfo> {
        self.unbondings.get(&(address.clone(), denom.clone()))
    }

    pub fn put_unbonding(&mut self, info: UnbondingInfo) {
        self.unbondings
            .insert((info.address.clone(), info.denom.clone()), info);
    }

    pub fn remove_unbonding(&mut self, address: &Address, denom: &Denom) -> Option<UnbondingInfo> {
        self.unbondings.remove(&(address.clone(), denom.clone()))
    }

    /// Pending entries of one address, ordered by denom.
    pub fn unbondings_of<'a>(
        &'a self,
        address: &Address,
    ) -> impl Iterator<Item = &'a UnbondingInfo> + 'a {
        let address = address.clone();
        let start = (address.clone(), Denom::new(""));
        self.unbondings
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(move |((a, _), _)| *a == address)
            .map(|(_, u)| u)
    }

    /// All pending entries, ordered by (address, denom).
    pub fn all_unbondings(&self) -> impl Iterator<Item = &UnbondingInfo> {
        self.unbondings.values()
    }

    // Snapshots

    pub fn latest_snapshot(&self, denom: &Denom) -> Option<&EpochSnapshot> {
        self.latest_snapshots.get(denom)
    }

    pub fn latest_snapshots(&self) -> &BTreeMap<Denom, EpochSnapshot> {
        &self.latest_snapshots
    }

    pub fn snapshot_at(&self, denom: &Denom, epoch: u64) -> Option<&EpochSnapshot> {
        self.snapshot_history.get(&(denom.clone(), epoch))
    }

    pub fn snapshot_history(&self) -> impl Iterator<Item = &EpochSnapshot> {
        self.snapshot_history.values()
    }

    pub fn last_snapshot_epoch(&self) -> Option<u64> {
        self.last_snapshot_epoch
    }

    /// Replace the latest-snapshot set wholesale, archive each entry under its epoch and return
    /// the set it replaced.
    ///
    /// This is deliberately not a per-denom overwrite: a denom missing from `snapshots` (its
    /// pool emptied or was delisted) loses its latest entry, so it cannot be paid again from a
    /// stale snapshot.
    pub fn replace_latest_snapshots(
        &mut self,
        epoch: u64,
        snapshots: BTreeMap<Denom, EpochSnapshot>,
    ) -> BTreeMap<Denom, EpochSnapshot> {
        for (denom, snap) in &snapshots {
            self.snapshot_history
                .insert((denom.clone(), epoch), snap.clone());
        }
        self.last_snapshot_epoch = Some(epoch);
        std::mem::replace(&mut self.latest_snapshots, snapshots)
    }
}
