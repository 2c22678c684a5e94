use std::collections::BTreeMap;

use crate::decimal::Dec;
use crate::hash::{hash_ledger_preimage_v1, put_bytes, put_u64};
use crate::keeper::StakingLedger;
use crate::types::{Denom, EpochSnapshot};
use crate::{BankKeeper, Hash32, StakingError};

/// Stable identifiers for ledger invariants (used for testing and counterexamples).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvariantId {
    /// Ledger mutated state even though the action returned `Err`.
    NoMutationOnError,

    /// A pool had zero staked with non-zero shares, or the reverse.
    PoolZeroIffSharesZero,

    /// Sum of positions in a pool disagreed with the pool's `total_shares`.
    SharesMatchPositions,

    /// A pool's ratio drifted away from 1.
    RatioPinned,

    /// A pending unbonding entry held a zero amount.
    UnbondingPositive,

    /// Escrow balance differed from staked plus pending unbonding.
    EscrowConserved,

    /// A distribution paid more than the reward balance, or misreported its dust.
    RewardConserve,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantViolation {
    pub id: InvariantId,
    pub details: String,
}

impl InvariantViolation {
    pub fn new(id: InvariantId, details: impl Into<String>) -> Self {
        Self {
            id,
            details: details.into(),
        }
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.id, self.details)
    }
}

impl std::error::Error for InvariantViolation {}

impl From<InvariantViolation> for StakingError {
    fn from(v: InvariantViolation) -> Self {
        StakingError::InvariantViolated(v.to_string())
    }
}

/// A reproducible invariant failure with the action trace that led to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantCounterexample {
    pub violation: InvariantViolation,
    /// Index of the first action after which an invariant failed.
    pub at_step: usize,
    pub state_hash: Hash32,
    /// Action prefix that reproduces the violation (includes the failing step).
    pub actions: Vec<crate::invariant_rail::LedgerAction>,
}

impl InvariantCounterexample {
    pub fn short(&self) -> String {
        format!(
            "Invariant {:?} violated at step {} (state_hash={})",
            self.violation.id,
            self.at_step,
            hex::encode(self.state_hash.0)
        )
    }
}

impl StakingLedger {
    /// Check the bookkeeping invariants that need no bank access.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let store = self.store();

        let mut position_sums: BTreeMap<&Denom, Dec> = BTreeMap::new();
        for s in store.all_positions() {
            let sum = position_sums.entry(&s.denom).or_insert(Dec::ZERO);
            *sum = sum.checked_add(s.shares).map_err(|e| {
                InvariantViolation::new(InvariantId::SharesMatchPositions, e.to_string())
            })?;
        }

        for pool in store.pools() {
            if pool.total_staked.is_zero() != pool.total_shares.is_zero() {
                return Err(InvariantViolation::new(
                    InvariantId::PoolZeroIffSharesZero,
                    format!(
                        "pool {}: staked={} shares={}",
                        pool.denom, pool.total_staked, pool.total_shares
                    ),
                ));
            }
            if pool.total_staked != pool.total_shares {
                return Err(InvariantViolation::new(
                    InvariantId::RatioPinned,
                    format!(
                        "pool {}: staked={} shares={}",
                        pool.denom, pool.total_staked, pool.total_shares
                    ),
                ));
            }
            let sum = position_sums.remove(&pool.denom).unwrap_or(Dec::ZERO);
            if sum != pool.total_shares {
                return Err(InvariantViolation::new(
                    InvariantId::SharesMatchPositions,
                    format!(
                        "pool {}: positions sum to {} but total_shares={}",
                        pool.denom, sum, pool.total_shares
                    ),
                ));
            }
        }
        if let Some((denom, sum)) = position_sums.into_iter().next() {
            return Err(InvariantViolation::new(
                InvariantId::SharesMatchPositions,
                format!("positions in {denom} sum to {sum} without a pool"),
            ));
        }

        for u in store.all_unbondings() {
            if !u.amount.is_positive() {
                return Err(InvariantViolation::new(
                    InvariantId::UnbondingPositive,
                    format!("unbonding of {} in {} is {}", u.address, u.denom, u.amount),
                ));
            }
        }
        Ok(())
    }

    /// Escrow holds exactly staked plus pending-unbonding principal for every allowed denom.
    pub fn check_escrow(&self, bank: &dyn BankKeeper) -> Result<(), InvariantViolation> {
        let escrow = self.config().escrow_address();
        for denom in &self.config().allowed_denoms {
            let owed = self
                .escrow_liability(denom)
                .and_then(|d| d.truncate_to_amount())
                .map_err(|e| InvariantViolation::new(InvariantId::EscrowConserved, e.to_string()))?;
            let held = bank.balance(&escrow, denom);
            if held != owed {
                return Err(InvariantViolation::new(
                    InvariantId::EscrowConserved,
                    format!("escrow holds {held}{denom} but owes {owed}{denom}"),
                ));
            }
        }
        Ok(())
    }

    /// Deterministic commitment to the full ledger state (events excluded).
    pub fn state_hash(&self) -> Hash32 {
        let store = self.store();
        let mut out = Vec::new();

        put_u64(&mut out, store.pools().count() as u64);
        for p in store.pools() {
            put_bytes(&mut out, p.denom.as_str().as_bytes());
            put_dec(&mut out, p.total_staked);
            put_dec(&mut out, p.total_shares);
        }

        put_u64(&mut out, store.all_positions().count() as u64);
        for s in store.all_positions() {
            put_bytes(&mut out, s.denom.as_str().as_bytes());
            put_bytes(&mut out, s.address.as_str().as_bytes());
            put_dec(&mut out, s.shares);
            put_u64(&mut out, s.epoch);
        }

        put_u64(&mut out, store.all_unbondings().count() as u64);
        for u in store.all_unbondings() {
            put_bytes(&mut out, u.address.as_str().as_bytes());
            put_bytes(&mut out, u.denom.as_str().as_bytes());
            put_dec(&mut out, u.amount);
            put_u64(&mut out, u.unbond_epoch);
        }

        put_u64(&mut out, store.latest_snapshots().len() as u64);
        for snap in store.latest_snapshots().values() {
            put_snapshot(&mut out, snap);
        }
        put_u64(&mut out, store.snapshot_history().count() as u64);
        for snap in store.snapshot_history() {
            put_snapshot(&mut out, snap);
        }
        match store.last_snapshot_epoch() {
            Some(e) => {
                out.push(1);
                put_u64(&mut out, e);
            }
            None => out.push(0),
        }

        hash_ledger_preimage_v1(&out)
    }
}

fn put_dec(out: &mut Vec<u8>, d: Dec) {
    put_bytes(out, d.to_string().as_bytes());
}

fn put_snapshot(out: &mut Vec<u8>, snap: &EpochSnapshot) {
    put_bytes(out, snap.denom.as_str().as_bytes());
    put_u64(out, snap.epoch);
    put_dec(out, snap.total_staked);
    put_dec(out, snap.total_shares);
    put_u64(out, snap.stakers.len() as u64);
    for s in &snap.stakers {
        put_bytes(out, s.address.as_str().as_bytes());
        put_dec(out, s.shares);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::types::{Address, StakingPool, UserStake};

    #[test]
    fn empty_ledger_satisfies_invariants() {
        let ledger = StakingLedger::new(LedgerConfig::default()).unwrap();
        assert!(ledger.check_invariants().is_ok());
    }

    #[test]
    fn detects_shares_without_matching_positions() {
        let mut ledger = StakingLedger::new(LedgerConfig::default()).unwrap();
        let ten = Dec::from_amount(10).unwrap();
        ledger.store.put_pool(StakingPool {
            denom: Denom::new("uusd"),
            total_staked: ten,
            total_shares: ten,
        });
        let err = ledger.check_invariants().unwrap_err();
        assert_eq!(err.id, InvariantId::SharesMatchPositions);

        ledger.store.put_user_stake(UserStake {
            address: Address::new("a"),
            denom: Denom::new("uusd"),
            shares: ten,
            epoch: 0,
        });
        assert!(ledger.check_invariants().is_ok());
    }

    #[test]
    fn detects_zero_staked_with_shares() {
        let mut ledger = StakingLedger::new(LedgerConfig::default()).unwrap();
        ledger.store.put_pool(StakingPool {
            denom: Denom::new("uusd"),
            total_staked: Dec::ZERO,
            total_shares: Dec::ONE,
        });
        assert_eq!(
            ledger.check_invariants().unwrap_err().id,
            InvariantId::PoolZeroIffSharesZero
        );
    }

    #[test]
    fn state_hash_tracks_mutations() {
        let mut ledger = StakingLedger::new(LedgerConfig::default()).unwrap();
        let h0 = ledger.state_hash();
        assert_eq!(h0, ledger.state_hash());
        ledger.store.put_pool(StakingPool::empty(Denom::new("uusd")));
        assert_ne!(h0, ledger.state_hash());
    }
}
