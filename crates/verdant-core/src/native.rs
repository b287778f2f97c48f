use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::VerdantError;
use crate::types::{Address, Balance};

/// Balances of the chain's native currency.
///
/// Crowdsales forward proceeds through [`NativeLedger::transfer`]. A transfer
/// can fail for lack of funds or because the recipient refuses payment; either
/// failure aborts the enclosing call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NativeLedger {
    balances: BTreeMap<Address, Balance>,
    rejecting: BTreeSet<Address>,
}

impl NativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Address) -> Balance {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Credit newly issued native currency (faucet / test funding).
    pub fn credit(&mut self, account: Address, amount: Balance) -> Result<(), VerdantError> {
        let bal = self.balances.entry(account).or_insert(0);
        *bal = bal.checked_add(amount).ok_or(VerdantError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Mark `account` as refusing (or accepting again) incoming payments.
    pub fn set_rejecting(&mut self, account: Address, rejecting: bool) {
        if rejecting {
            self.rejecting.insert(account);
        } else {
            self.rejecting.remove(&account);
        }
    }

    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Balance,
    ) -> Result<(), VerdantError> {
        if to.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        if self.rejecting.contains(&to) {
            return Err(VerdantError::NativeTransferRejected(to));
        }
        let have = self.balance_of(&from);
        if have < amount {
            return Err(VerdantError::InsufficientNativeBalance { need: amount, have });
        }
        if amount == 0 {
            return Ok(());
        }
        self.balances.insert(from, have - amount);
        let to_bal = self.balances.entry(to).or_insert(0);
        *to_bal = to_bal.checked_add(amount).ok_or(VerdantError::ArithmeticOverflow)?;
        debug!(%from, %to, amount, "native transfer");
        Ok(())
    }
}
