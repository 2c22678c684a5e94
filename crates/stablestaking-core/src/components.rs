//! In-memory implementations of the collaborator traits defined in lib.rs.
//!
//! Useful for testing, simulation, and embedding the ledger without a host chain.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::math::add_amount;
use crate::types::{Address, Amount, Coin, Denom, EpochIdentifier};
use crate::{BankError, BankKeeper, EpochKeeper, Result};

// =============================================================================
// MemBank
// =============================================================================

/// Ordered in-memory balance table.
#[derive(Clone, Debug, Default)]
pub struct MemBank {
    balances: BTreeMap<(Address, Denom), Amount>,
    frozen: BTreeSet<Address>,
}

impl MemBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create tokens out of thin air (faucet).
    pub fn mint(&mut self, to: &Address, coin: &Coin) -> Result<()> {
        let slot = self
            .balances
            .entry((to.clone(), coin.denom.clone()))
            .or_insert(0);
        *slot = add_amount(*slot, coin.amount)?;
        Ok(())
    }

    /// Make every transfer touching `address` fail.
    pub fn freeze(&mut self, address: &Address) {
        self.frozen.insert(address.clone());
    }

    pub fn unfreeze(&mut self, address: &Address) {
        self.frozen.remove(address);
    }

    /// Sum of all balances held in `denom`.
    pub fn supply(&self, denom: &Denom) -> Amount {
        self.balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, a)| *a)
            .sum()
    }
}

impl BankKeeper for MemBank {
    fn balance(&self, address: &Address, denom: &Denom) -> Amount {
        self.balances
            .get(&(address.clone(), denom.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn send(
        &mut self,
        from: &Address,
        to: &Address,
        coin: &Coin,
    ) -> std::result::Result<(), BankError> {
        for account in [from, to] {
            if self.frozen.contains(account) {
                return Err(BankError::AccountFrozen(account.clone()));
            }
        }

        let available = self.balance(from, &coin.denom);
        if available < coin.amount {
            return Err(BankError::InsufficientBalance {
                address: from.clone(),
                denom: coin.denom.clone(),
                available,
                required: coin.amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to, &coin.denom)
            .checked_add(coin.amount)
            .ok_or_else(|| BankError::Overflow {
                address: to.clone(),
                denom: coin.denom.clone(),
            })?;

        self.balances
            .insert((from.clone(), coin.denom.clone()), available - coin.amount);
        self.balances.insert((to.clone(), coin.denom.clone()), credited);
        debug!(%from, %to, %coin, "bank transfer");
        Ok(())
    }
}

// =============================================================================
// MemEpochs
// =============================================================================

/// Epoch counters per identifier, starting at 0.
#[derive(Clone, Debug, Default)]
pub struct MemEpochs {
    current: BTreeMap<EpochIdentifier, u64>,
}

impl MemEpochs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, identifier: EpochIdentifier, epoch: u64) {
        self.current.insert(identifier, epoch);
    }

    /// Move `identifier` to its next epoch and return the epoch that just ended.
    pub fn advance(&mut self, identifier: EpochIdentifier) -> u64 {
        let slot = self.current.entry(identifier).or_insert(0);
        let ended = *slot;
        *slot = slot.saturating_add(1);
        ended
    }
}

impl EpochKeeper for MemEpochs {
    fn current_epoch(&self, identifier: EpochIdentifier) -> u64 {
        self.current.get(&identifier).copied().unwrap_or(0)
    }
}
