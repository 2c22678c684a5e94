#![allow(dead_code)]

use stablestaking_core::{
    Address, Amount, BankKeeper, Coin, Ctx, Denom, EpochHooks, EpochIdentifier, EpochKeeper,
    LedgerAction, LedgerConfig, Params, Result, Simulation, StakeResponse, UnstakeResponse,
};

pub const INIT_TOKENS: Amount = 200_000_000;

pub fn sim() -> Simulation {
    Simulation::new(LedgerConfig::default(), Params::default()).unwrap()
}

pub fn addr(s: &str) -> Address {
    Address::new(s)
}

pub fn denom(s: &str) -> Denom {
    Denom::new(s)
}

pub fn fund(sim: &mut Simulation, who: &Address, denom: &str, amount: Amount) {
    sim.bank.mint(who, &Coin::new(denom, amount)).unwrap();
}

pub fn fund_rewards(sim: &mut Simulation, amount: Amount) {
    let account = sim.ledger.config().reward_address();
    let coin = Coin::new(sim.ledger.config().reward_denom.clone(), amount);
    sim.bank.mint(&account, &coin).unwrap();
}

pub fn stake(
    sim: &mut Simulation,
    who: &Address,
    denom: &str,
    amount: Amount,
) -> Result<StakeResponse> {
    let mut ctx = Ctx::new(sim.params.current(), &mut sim.bank, &sim.epochs);
    sim.ledger.stake_tokens(&mut ctx, who, Coin::new(denom, amount))
}

pub fn unstake(
    sim: &mut Simulation,
    who: &Address,
    denom: &str,
    amount: Amount,
) -> Result<UnstakeResponse> {
    let mut ctx = Ctx::new(sim.params.current(), &mut sim.bank, &sim.epochs);
    sim.ledger.unstake_tokens(&mut ctx, who, Coin::new(denom, amount))
}

/// Invoke the end-of-epoch hook directly, without moving the clock.
pub fn after_epoch_end(sim: &mut Simulation, identifier: &str, epoch: u64) -> Result<()> {
    let mut ctx = Ctx::new(sim.params.current(), &mut sim.bank, &sim.epochs);
    sim.ledger.after_epoch_end(&mut ctx, identifier, epoch)
}

/// End the current epoch of `identifier` the way the scheduler does; returns the ended epoch.
pub fn end_epoch(sim: &mut Simulation, identifier: EpochIdentifier) -> u64 {
    let ended = sim.epochs.current_epoch(identifier);
    sim.apply(&LedgerAction::EndEpoch { identifier }).unwrap();
    ended
}

pub fn balance(sim: &Simulation, who: &Address, denom: &str) -> Amount {
    sim.bank.balance(who, &Denom::new(denom))
}

pub fn escrow_balance(sim: &Simulation, denom: &str) -> Amount {
    balance(sim, &sim.ledger.config().escrow_address(), denom)
}

pub fn reward_balance_of(sim: &Simulation, who: &Address) -> Amount {
    sim.bank.balance(who, &sim.ledger.config().reward_denom)
}
