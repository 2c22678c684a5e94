use std::time::Duration;

use crate::decimal::Dec;
use crate::types::Amount;
use crate::{Result, StakingError};

pub fn add_amount(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b)
        .ok_or_else(|| StakingError::Overflow("u128 overflow in add".into()))
}

pub fn sub_amount(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_sub(b)
        .ok_or_else(|| StakingError::InvalidInput("u128 underflow in sub".into()))
}

pub fn add_epoch(epoch: u64, delta: u64) -> Result<u64> {
    epoch
        .checked_add(delta)
        .ok_or_else(|| StakingError::Overflow("epoch number overflow".into()))
}

/// Number of whole epochs of length `epoch_len` needed to cover `duration` (rounded up).
pub fn epochs_covering(duration: Duration, epoch_len: Duration) -> Result<u64> {
    let len = epoch_len.as_secs();
    if len == 0 {
        return Err(StakingError::InvalidInput("epoch length must be > 0".into()));
    }
    let secs = duration.as_secs();
    Ok(secs / len + u64::from(secs % len != 0))
}

/// `trunc((part / whole) * total)` as an integer amount.
///
/// The ratio is truncated to 18 places before it is applied, so the result may sit one unit
/// below the exact floor. It never exceeds it.
pub fn pro_rata_floor(part: Dec, whole: Dec, total: Dec) -> Result<Amount> {
    part.checked_quo(whole)?
        .checked_mul(total)?
        .truncate_to_amount()
}
