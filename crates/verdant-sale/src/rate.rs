use serde::{Deserialize, Serialize};
use verdant_core::error::VerdantError;
use verdant_core::types::{Balance, Timestamp};

/// Tokens (base units) handed out per wei.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatePolicy {
    Flat { rate: Balance },
    /// Linear decay from `initial` at opening to `final_rate` at closing.
    Decay { initial: Balance, final_rate: Balance },
}

impl RatePolicy {
    pub fn validate(&self) -> Result<(), VerdantError> {
        match *self {
            RatePolicy::Flat { rate } if rate == 0 => Err(VerdantError::ZeroRate),
            RatePolicy::Flat { .. } => Ok(()),
            RatePolicy::Decay { initial, final_rate } => {
                if initial == 0 || final_rate == 0 {
                    return Err(VerdantError::ZeroRate);
                }
                if final_rate > initial {
                    return Err(VerdantError::FinalRateAboveInitial);
                }
                Ok(())
            }
        }
    }

    /// Rate at opening.
    pub fn initial(&self) -> Balance {
        match *self {
            RatePolicy::Flat { rate } => rate,
            RatePolicy::Decay { initial, .. } => initial,
        }
    }

    /// Rate in effect at `now`; 0 outside `[opening, closing]`.
    ///
    /// The decrement `(initial - final) * elapsed / window` is truncated, so
    /// the rate never drops below the exact line and both ends are hit
    /// exactly: `rate(opening) == initial`, `rate(closing) == final`.
    pub fn current_rate(&self, opening: Timestamp, closing: Timestamp, now: Timestamp) -> Balance {
        if now < opening || now > closing {
            return 0;
        }
        match *self {
            RatePolicy::Flat { rate } => rate,
            RatePolicy::Decay { initial, final_rate } => {
                let window = (closing - opening) as u128;
                if window == 0 {
                    return final_rate;
                }
                let elapsed = (now - opening) as u128;
                let span = initial - final_rate;
                // floor(span * elapsed / window) without the wide product;
                // elapsed <= window < 2^64 keeps the remainder term in range.
                let decrement = span / window * elapsed + span % window * elapsed / window;
                initial - decrement
            }
        }
    }
}

/// Where a sale stands at a given moment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    NotStarted,
    Open,
    Closed,
    /// No tokens left to sell, regardless of time.
    CapReached,
}

impl Phase {
    pub fn at(opening: Timestamp, closing: Timestamp, now: Timestamp, remaining: Balance) -> Self {
        if remaining == 0 {
            Phase::CapReached
        } else if now < opening {
            Phase::NotStarted
        } else if now > closing {
            Phase::Closed
        } else {
            Phase::Open
        }
    }
}
