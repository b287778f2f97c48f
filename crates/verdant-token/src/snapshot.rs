use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use verdant_core::constants::FIRST_SNAPSHOT_ID;
use verdant_core::error::VerdantError;
use verdant_core::types::{Address, Balance};

/// Historical balances and supply.
///
/// Values are recorded lazily: just before an account balance (or the supply)
/// changes, its pre-change value is stored under the current snapshot id if
/// nothing was stored for that id yet. A query for id `k` returns the first
/// stored value with id `>= k`, or the live value if none exists.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshots {
    current: u64,
    accounts: BTreeMap<Address, Vec<(u64, Balance)>>,
    supply: Vec<(u64, Balance)>,
}

impl Snapshots {
    /// Id of the latest snapshot, 0 if none was taken.
    pub fn current_id(&self) -> u64 {
        self.current
    }

    pub fn take(&mut self) -> u64 {
        self.current = if self.current == 0 { FIRST_SNAPSHOT_ID } else { self.current + 1 };
        self.current
    }

    pub fn record_account(&mut self, account: Address, value: Balance) {
        if self.current == 0 {
            return;
        }
        let current = self.current;
        push_if_stale(self.accounts.entry(account).or_default(), current, value);
    }

    pub fn record_supply(&mut self, value: Balance) {
        if self.current == 0 {
            return;
        }
        push_if_stale(&mut self.supply, self.current, value);
    }

    pub fn account_at(&self, account: &Address, id: u64, live: Balance) -> Result<Balance, VerdantError> {
        self.check_id(id)?;
        Ok(self
            .accounts
            .get(account)
            .map(|h| lookup(h, id, live))
            .unwrap_or(live))
    }

    pub fn supply_at(&self, id: u64, live: Balance) -> Result<Balance, VerdantError> {
        self.check_id(id)?;
        Ok(lookup(&self.supply, id, live))
    }

    fn check_id(&self, id: u64) -> Result<(), VerdantError> {
        if id == 0 {
            return Err(VerdantError::InvalidSnapshotId);
        }
        if id > self.current {
            return Err(VerdantError::NonexistentSnapshot(id));
        }
        Ok(())
    }
}

fn push_if_stale(history: &mut Vec<(u64, Balance)>, current: u64, value: Balance) {
    if history.last().map(|(id, _)| *id < current).unwrap_or(true) {
        history.push((current, value));
    }
}

fn lookup(history: &[(u64, Balance)], id: u64, live: Balance) -> Balance {
    let idx = history.partition_point(|(i, _)| *i < id);
    history.get(idx).map(|(_, v)| *v).unwrap_or(live)
}
