use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use verdant_core::error::VerdantError;
use verdant_core::types::{Address, Role};

/// Role → member set. Membership is the only authorization primitive.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AccessControl {
    members: BTreeMap<Role, BTreeSet<Address>>,
}

impl AccessControl {
    /// Access control where `admin` holds every role.
    pub fn with_admin(admin: Address) -> Self {
        let mut ac = Self::default();
        for role in [
            Role::Admin,
            Role::Minter,
            Role::Pauser,
            Role::Blacklister,
            Role::FeelessAdmin,
            Role::Snapshotter,
        ] {
            ac.members.entry(role).or_default().insert(admin);
        }
        ac
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.members
            .get(&role)
            .map(|m| m.contains(account))
            .unwrap_or(false)
    }

    pub fn check(&self, role: Role, account: &Address) -> Result<(), VerdantError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(VerdantError::MissingRole { role, account: *account })
        }
    }

    pub fn members(&self, role: Role) -> impl Iterator<Item = &Address> {
        self.members.get(&role).into_iter().flatten()
    }

    pub fn grant(&mut self, role: Role, account: Address) -> Result<(), VerdantError> {
        if account.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        if !self.members.entry(role).or_default().insert(account) {
            return Err(VerdantError::already("role", account));
        }
        Ok(())
    }

    pub fn revoke(&mut self, role: Role, account: Address) -> Result<(), VerdantError> {
        let removed = self
            .members
            .get_mut(&role)
            .map(|m| m.remove(&account))
            .unwrap_or(false);
        if !removed {
            return Err(VerdantError::not_in("role", account));
        }
        Ok(())
    }
}
