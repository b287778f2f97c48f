use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use verdant_core::error::VerdantError;
use verdant_core::types::Address;

/// Beneficiaries admitted to a gated sale, maintained by a single whitelister.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist {
    whitelister: Address,
    members: BTreeSet<Address>,
}

impl Whitelist {
    pub fn new(whitelister: Address) -> Result<Self, VerdantError> {
        if whitelister.is_zero() {
            return Err(VerdantError::ZeroWhitelister);
        }
        Ok(Self { whitelister, members: BTreeSet::new() })
    }

    pub fn whitelister(&self) -> Address {
        self.whitelister
    }

    pub fn contains(&self, account: &Address) -> bool {
        self.members.contains(account)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn add(&mut self, caller: &Address, account: Address) -> Result<(), VerdantError> {
        self.check(caller)?;
        if account.is_zero() {
            return Err(VerdantError::ZeroBeneficiary);
        }
        if !self.members.insert(account) {
            return Err(VerdantError::AlreadyWhitelisted(account));
        }
        Ok(())
    }

    pub fn remove(&mut self, caller: &Address, account: Address) -> Result<(), VerdantError> {
        self.check(caller)?;
        if !self.members.remove(&account) {
            return Err(VerdantError::NotWhitelisted(account));
        }
        Ok(())
    }

    fn check(&self, caller: &Address) -> Result<(), VerdantError> {
        if *caller != self.whitelister {
            return Err(VerdantError::OnlyWhitelister);
        }
        Ok(())
    }
}
