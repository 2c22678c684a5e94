use serde::{Deserialize, Serialize};

use crate::components::{MemBank, MemEpochs};
use crate::config::LedgerConfig;
use crate::invariants::{InvariantCounterexample, InvariantId, InvariantViolation};
use crate::keeper::{Ctx, StakingLedger};
use crate::params::{ParamStore, Params};
use crate::types::{Address, Coin, EpochIdentifier};
use crate::{EpochHooks, Result};

/// One step of a simulated ledger history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerAction {
    /// Mint tokens to a user (faucet; not a ledger operation).
    Fund { to: Address, coin: Coin },
    Stake { staker: Address, coin: Coin },
    Unstake { staker: Address, coin: Coin },
    /// Mint reward-denom tokens into the reward account.
    FundRewards { amount: u128 },
    /// End the current epoch of `identifier` and start the next one.
    EndEpoch { identifier: EpochIdentifier },
}

/// Simulation harness: a ledger wired to in-memory collaborators.
pub struct Simulation {
    pub ledger: StakingLedger,
    pub bank: MemBank,
    pub epochs: MemEpochs,
    pub params: ParamStore,
}

impl Simulation {
    pub fn new(config: LedgerConfig, params: Params) -> Result<Self> {
        let params = ParamStore::new(params, &config)?;
        Ok(Self {
            ledger: StakingLedger::new(config)?,
            bank: MemBank::new(),
            epochs: MemEpochs::new(),
            params,
        })
    }

    pub fn apply(&mut self, action: &LedgerAction) -> Result<()> {
        match action {
            LedgerAction::Fund { to, coin } => self.bank.mint(to, coin),
            LedgerAction::FundRewards { amount } => {
                let account = self.ledger.config().reward_address();
                let coin = Coin::new(self.ledger.config().reward_denom.clone(), *amount);
                self.bank.mint(&account, &coin)
            }
            LedgerAction::Stake { staker, coin } => {
                let mut ctx = Ctx::new(self.params.current(), &mut self.bank, &self.epochs);
                self.ledger
                    .stake_tokens(&mut ctx, staker, coin.clone())
                    .map(|_| ())
            }
            LedgerAction::Unstake { staker, coin } => {
                let mut ctx = Ctx::new(self.params.current(), &mut self.bank, &self.epochs);
                self.ledger
                    .unstake_tokens(&mut ctx, staker, coin.clone())
                    .map(|_| ())
            }
            LedgerAction::EndEpoch { identifier } => {
                let ended = self.epochs.advance(*identifier);
                let mut ctx = Ctx::new(self.params.current(), &mut self.bank, &self.epochs);
                self.ledger
                    .after_epoch_end(&mut ctx, identifier.as_str(), ended)?;
                self.ledger
                    .before_epoch_start(&mut ctx, identifier.as_str(), ended.saturating_add(1))
            }
        }
    }
}

/// Run an action trace and return the first invariant counterexample (if any).
///
/// Invariants checked:
/// - "no mutation on error" (state hash must not change if an action returns `Err`)
/// - `StakingLedger::check_invariants` and `StakingLedger::check_escrow` after every success
/// - reward conservation for every distribution event
pub fn first_invariant_counterexample(
    config: LedgerConfig,
    params: Params,
    actions: &[LedgerAction],
) -> Result<Option<InvariantCounterexample>> {
    let mut sim = Simulation::new(config, params)?;

    for (i, a) in actions.iter().enumerate() {
        let before_hash = sim.ledger.state_hash();
        let r = sim.apply(a);
        let events = sim.ledger.take_events();
        let counterexample = |violation: InvariantViolation, sim: &Simulation| {
            InvariantCounterexample {
                violation,
                at_step: i,
                state_hash: sim.ledger.state_hash(),
                actions: actions[..=i].to_vec(),
            }
        };

        if let Err(e) = r {
            if sim.ledger.state_hash() != before_hash || !events.is_empty() {
                let v = InvariantViolation::new(
                    InvariantId::NoMutationOnError,
                    format!("action returned Err but state changed: {e}"),
                );
                return Ok(Some(counterexample(v, &sim)));
            }
            continue;
        }

        for ev in &events {
            if let crate::StakingEvent::RewardsDistributed {
                reward_balance,
                paid_total,
                dust,
            } = ev
            {
                if paid_total.checked_add(*dust) != Some(*reward_balance) {
                    let v = InvariantViolation::new(
                        InvariantId::RewardConserve,
                        format!(
                            "paid_total({paid_total}) + dust({dust}) != reward_balance({reward_balance})"
                        ),
                    );
                    return Ok(Some(counterexample(v, &sim)));
                }
            }
        }

        let checked = sim
            .ledger
            .check_invariants()
            .and_then(|_| sim.ledger.check_escrow(&sim.bank));
        if let Err(v) = checked {
            return Ok(Some(counterexample(v, &sim)));
        }
    }

    Ok(None)
}
