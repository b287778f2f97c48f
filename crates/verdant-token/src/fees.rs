//! Per-mille transfer fee schedule.
//!
//! Each component is truncated independently:
//!
//!   company  = A × company_rate  / 1000
//!   esg_fund = A × esg_fund_rate / 1000
//!   burned   = A × burn_rate     / 1000
//!   net      = A − company − esg_fund − burned
//!
//! so `net + company + esg_fund + burned == A` for every amount.

use serde::{Deserialize, Serialize};
use verdant_core::constants::PER_MILLE;
use verdant_core::error::VerdantError;
use verdant_core::types::{Address, Balance};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub company_rate: u16,
    pub esg_fund_rate: u16,
    pub burn_rate: u16,
    /// Receives the company share.
    pub company_rewards_wallet: Address,
    /// Receives the ESG fund share.
    pub esg_fund_wallet: Address,
}

/// How one transfer amount is split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeSplit {
    pub net: Balance,
    pub company: Balance,
    pub esg_fund: Balance,
    pub burned: Balance,
}

impl FeeSplit {
    /// The whole amount goes to the receiver.
    pub fn feeless(amount: Balance) -> Self {
        Self { net: amount, ..Self::default() }
    }

    pub fn total_fee(&self) -> Balance {
        self.company + self.esg_fund + self.burned
    }
}

impl FeeSchedule {
    pub fn validate_rates(company: u16, esg: u16, burn: u16) -> Result<(), VerdantError> {
        let sum = company as u128 + esg as u128 + burn as u128;
        if company as u128 > PER_MILLE || esg as u128 > PER_MILLE || burn as u128 > PER_MILLE
            || sum > PER_MILLE
        {
            return Err(VerdantError::FeeRatesOutOfBounds { company, esg, burn });
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), VerdantError> {
        Self::validate_rates(self.company_rate, self.esg_fund_rate, self.burn_rate)?;
        if self.company_rewards_wallet.is_zero() || self.esg_fund_wallet.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        Ok(())
    }

    pub fn split(&self, amount: Balance) -> Result<FeeSplit, VerdantError> {
        let part = |rate: u16| -> Result<Balance, VerdantError> {
            amount
                .checked_mul(rate as u128)
                .map(|v| v / PER_MILLE)
                .ok_or(VerdantError::ArithmeticOverflow)
        };
        let company = part(self.company_rate)?;
        let esg_fund = part(self.esg_fund_rate)?;
        let burned = part(self.burn_rate)?;
        // Rates sum to at most 1000, so the fees never exceed the amount.
        let net = amount - company - esg_fund - burned;
        Ok(FeeSplit { net, company, esg_fund, burned })
    }
}
