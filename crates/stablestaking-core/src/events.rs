use serde::{Deserialize, Serialize};

use crate::decimal::Dec;
use crate::types::{Address, Amount, Coin, Denom};

/// Observable effect of a ledger mutation, queued for the host to drain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StakingEvent {
    Staked {
        staker: Address,
        coin: Coin,
        shares: Dec,
        epoch: u64,
    },
    UnbondRequested {
        staker: Address,
        coin: Coin,
        shares: Dec,
        unbond_epoch: u64,
    },
    UnbondCompleted {
        staker: Address,
        coin: Coin,
        epoch: u64,
    },
    SnapshotTaken {
        denom: Denom,
        epoch: u64,
        total_staked: Dec,
        stakers: usize,
    },
    RewardPaid {
        staker: Address,
        denom: Denom,
        pool_denom: Denom,
        amount: Amount,
    },
    RewardsDistributed {
        reward_balance: Amount,
        paid_total: Amount,
        dust: Amount,
    },
}
