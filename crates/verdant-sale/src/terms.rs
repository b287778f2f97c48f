use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use verdant_core::constants::OPENING_TIME_TOLERANCE_SECS;
use verdant_core::error::VerdantError;
use verdant_core::types::{Address, Balance, Timestamp};
use verdant_token::Token;

use crate::rate::{Phase, RatePolicy};

/// Commercial terms shared by every sale flavour. Immutable once deployed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTerms {
    pub rate: RatePolicy,
    /// Receives the proceeds and supplies the tokens (via allowance).
    pub wallet: Address,
    pub token: Address,
    pub opening: Timestamp,
    pub closing: Timestamp,
    /// Minimum wei per purchase.
    pub investor_tariff: Balance,
    /// Maximum cumulative wei per beneficiary.
    pub investor_cap: Balance,
}

impl SaleTerms {
    /// Deployment checks that do not depend on the sale flavour. The order
    /// fixes which error wins when several fields are wrong.
    pub fn validate(&self, now: Timestamp) -> Result<(), VerdantError> {
        self.rate.validate()?;
        if self.wallet.is_zero() {
            return Err(VerdantError::ZeroWallet);
        }
        if self.token.is_zero() {
            return Err(VerdantError::ZeroToken);
        }
        self.validate_limits(now)
    }

    pub(crate) fn validate_limits(&self, now: Timestamp) -> Result<(), VerdantError> {
        if self.investor_tariff == 0 {
            return Err(VerdantError::ZeroTariff);
        }
        if self.investor_cap < self.investor_tariff {
            return Err(VerdantError::CapBelowTariff);
        }
        if self.opening < now.saturating_sub(OPENING_TIME_TOLERANCE_SECS) {
            return Err(VerdantError::OpeningTimeInPast { opening: self.opening, now });
        }
        if self.opening >= self.closing {
            return Err(VerdantError::OpeningNotBeforeClosing);
        }
        Ok(())
    }

    pub fn current_rate(&self, now: Timestamp) -> Balance {
        self.rate.current_rate(self.opening, self.closing, now)
    }

    pub fn is_open(&self, now: Timestamp) -> bool {
        self.opening <= now && now <= self.closing
    }

    /// Tokens the sale can still hand out: the wallet's allowance to the sale,
    /// bounded by what the wallet actually holds.
    pub fn remaining_tokens(&self, token: &Token, sale: &Address) -> Balance {
        token
            .allowance(&self.wallet, sale)
            .min(token.balance_of(&self.wallet))
    }

    pub fn phase(&self, token: &Token, sale: &Address, now: Timestamp) -> Phase {
        Phase::at(self.opening, self.closing, now, self.remaining_tokens(token, sale))
    }

    /// Validate a purchase of `value` wei for `beneficiary` and price it.
    /// Returns the token amount.
    pub fn quote(
        &self,
        raised: &Contributions,
        token: &Token,
        sale: &Address,
        beneficiary: &Address,
        value: Balance,
        now: Timestamp,
    ) -> Result<Balance, VerdantError> {
        if beneficiary.is_zero() {
            return Err(VerdantError::ZeroBeneficiary);
        }
        if !self.is_open(now) {
            return Err(VerdantError::NotOpen);
        }
        if value < self.investor_tariff {
            return Err(VerdantError::BelowTariff { value, tariff: self.investor_tariff });
        }
        let total = raised
            .contribution(beneficiary)
            .checked_add(value)
            .ok_or(VerdantError::ArithmeticOverflow)?;
        if total > self.investor_cap {
            return Err(VerdantError::AboveCap { total, cap: self.investor_cap });
        }
        let tokens = value
            .checked_mul(self.current_rate(now))
            .ok_or(VerdantError::ArithmeticOverflow)?;
        let remaining = self.remaining_tokens(token, sale);
        if tokens > remaining {
            return Err(VerdantError::AllowanceExceeded { requested: tokens, remaining });
        }
        Ok(tokens)
    }
}

/// Wei raised overall and per beneficiary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributions {
    wei_raised: Balance,
    by_beneficiary: BTreeMap<Address, Balance>,
}

impl Contributions {
    pub fn wei_raised(&self) -> Balance {
        self.wei_raised
    }

    pub fn contribution(&self, beneficiary: &Address) -> Balance {
        self.by_beneficiary.get(beneficiary).copied().unwrap_or(0)
    }

    /// Only called after [`SaleTerms::quote`] accepted the amount.
    pub fn record(&mut self, beneficiary: Address, value: Balance) -> Result<(), VerdantError> {
        let raised = self
            .wei_raised
            .checked_add(value)
            .ok_or(VerdantError::ArithmeticOverflow)?;
        let entry = self.by_beneficiary.entry(beneficiary).or_insert(0);
        *entry = entry.checked_add(value).ok_or(VerdantError::ArithmeticOverflow)?;
        self.wei_raised = raised;
        Ok(())
    }
}
