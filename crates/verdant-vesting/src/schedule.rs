//! Cliff + linear release schedule.
//!
//!   t <  start + cliff                     → 0
//!   t >= start + cliff + duration          → total
//!   otherwise                              → total × (t − start − cliff) / duration
//!
//! The division truncates, so the vested amount never runs ahead of the line.

use verdant_core::error::VerdantError;
use verdant_core::types::{Balance, Timestamp};

pub fn vested_amount(
    total_allocation: Balance,
    start: Timestamp,
    cliff: i64,
    duration: i64,
    t: Timestamp,
) -> Result<Balance, VerdantError> {
    let release_start = start.saturating_add(cliff);
    if t < release_start {
        return Ok(0);
    }
    let elapsed = t - release_start;
    if elapsed >= duration {
        return Ok(total_allocation);
    }
    total_allocation
        .checked_mul(elapsed as u128)
        .map(|scaled| scaled / duration as u128)
        .ok_or(VerdantError::ArithmeticOverflow)
}
