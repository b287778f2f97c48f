//! Strategic-wallet outflow throttle.
//!
//! The company liquidity, allocations and crowdsales wallets may move at most
//! `max_transfer` tokens to ordinary receivers before a cooldown starts:
//!
//! 1. Outflow accumulates from zero.
//! 2. The transfer that pushes the total past `max_transfer` still succeeds;
//!    it records the cap event time and resets the counter.
//! 3. Until `cooldown` seconds have passed since the cap event every counted
//!    transfer fails with "Last max transfer too close".
//!
//! Each wallet may name one approved receiver. Transfers to it are exempt up
//! to `approved_receiver_limit` (cumulative) and never touch the counter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use verdant_core::error::VerdantError;
use verdant_core::types::{Address, Balance, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrategicKind {
    CompanyLiquidity,
    Allocations,
    Crowdsales,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicWallet {
    pub kind: StrategicKind,
    /// Counted outflow since the last cap event.
    pub outflow: Balance,
    pub last_cap_reached: Option<Timestamp>,
    pub approved_receiver: Option<Address>,
    pub approved_receiver_limit: Balance,
    /// Sent to the current approved receiver so far.
    pub approved_sent: Balance,
    /// Set once a non-removable receiver link is installed.
    pub locked: bool,
}

impl StrategicWallet {
    fn new(kind: StrategicKind) -> Self {
        Self {
            kind,
            outflow: 0,
            last_cap_reached: None,
            approved_receiver: None,
            approved_receiver_limit: 0,
            approved_sent: 0,
            locked: false,
        }
    }
}

/// Result of checking one outgoing transfer; applied only once the whole
/// transfer is known to succeed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outflow {
    /// Sent to the approved receiver; new cumulative amount sent to it.
    Approved { sent: Balance },
    /// Counted towards the cap; new cumulative outflow.
    Counted { outflow: Balance },
    /// This transfer crosses the cap: succeeds and starts the cooldown.
    CapReached,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Throttle {
    pub max_transfer: Balance,
    pub cooldown: i64,
    wallets: BTreeMap<Address, StrategicWallet>,
}

impl Throttle {
    pub fn new(max_transfer: Balance, cooldown: i64) -> Self {
        Self { max_transfer, cooldown, wallets: BTreeMap::new() }
    }

    pub fn register(&mut self, wallet: Address, kind: StrategicKind) -> Result<(), VerdantError> {
        if wallet.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        if self.wallets.contains_key(&wallet) {
            return Err(VerdantError::already("strategic wallet", wallet));
        }
        self.wallets.insert(wallet, StrategicWallet::new(kind));
        Ok(())
    }

    pub fn get(&self, wallet: &Address) -> Option<&StrategicWallet> {
        self.wallets.get(wallet)
    }

    pub fn is_strategic(&self, wallet: &Address) -> bool {
        self.wallets.contains_key(wallet)
    }

    pub fn wallet_of_kind(&self, kind: StrategicKind) -> Option<Address> {
        self.wallets
            .iter()
            .find(|(_, w)| w.kind == kind)
            .map(|(a, _)| *a)
    }

    /// True while `wallet` is inside its post-cap cooldown.
    pub fn is_restricted(&self, wallet: &Address, now: Timestamp) -> bool {
        self.wallets
            .get(wallet)
            .and_then(|w| w.last_cap_reached)
            .map(|t| now < t.saturating_add(self.cooldown))
            .unwrap_or(false)
    }

    /// Check an outgoing transfer. `Ok(None)` means `wallet` is not throttled.
    pub fn evaluate(
        &self,
        wallet: &Address,
        receiver: &Address,
        amount: Balance,
        now: Timestamp,
    ) -> Result<Option<Outflow>, VerdantError> {
        let Some(w) = self.wallets.get(wallet) else {
            return Ok(None);
        };

        if w.approved_receiver == Some(*receiver) {
            let sent = w
                .approved_sent
                .checked_add(amount)
                .ok_or(VerdantError::ArithmeticOverflow)?;
            if sent <= w.approved_receiver_limit {
                return Ok(Some(Outflow::Approved { sent }));
            }
        }

        if let Some(t) = w.last_cap_reached {
            let until = t.saturating_add(self.cooldown);
            if now < until {
                return Err(VerdantError::TransferLimitCooldownActive { wallet: *wallet, until });
            }
        }

        let outflow = w
            .outflow
            .checked_add(amount)
            .ok_or(VerdantError::ArithmeticOverflow)?;
        if outflow > self.max_transfer {
            Ok(Some(Outflow::CapReached))
        } else {
            Ok(Some(Outflow::Counted { outflow }))
        }
    }

    pub fn apply(&mut self, wallet: &Address, outcome: Outflow, now: Timestamp) {
        let Some(w) = self.wallets.get_mut(wallet) else {
            return;
        };
        match outcome {
            Outflow::Approved { sent } => w.approved_sent = sent,
            Outflow::Counted { outflow } => w.outflow = outflow,
            Outflow::CapReached => {
                w.outflow = 0;
                w.last_cap_reached = Some(now);
            }
        }
    }

    pub fn set_approved_receiver(
        &mut self,
        wallet: Address,
        receiver: Address,
        limit: Balance,
        removable: bool,
    ) -> Result<(), VerdantError> {
        if receiver.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        if receiver == wallet {
            return Err(VerdantError::SelfApprovedReceiver);
        }
        // A locked link only ever connects two wallets of the strategic trio.
        if !removable && !self.wallets.contains_key(&receiver) {
            return Err(VerdantError::NotStrategicWallet(receiver));
        }
        let w = self
            .wallets
            .get_mut(&wallet)
            .ok_or(VerdantError::NotStrategicWallet(wallet))?;
        if w.locked {
            return Err(VerdantError::ReceiverLinkLocked(wallet));
        }
        if w.approved_receiver == Some(receiver) && w.approved_receiver_limit == limit && removable {
            return Err(VerdantError::already("approved receiver", receiver));
        }
        if w.approved_receiver != Some(receiver) {
            w.approved_sent = 0;
        }
        w.approved_receiver = Some(receiver);
        w.approved_receiver_limit = limit;
        w.locked = !removable;
        Ok(())
    }

    pub fn remove_approved_receiver(&mut self, wallet: Address) -> Result<(), VerdantError> {
        let w = self
            .wallets
            .get_mut(&wallet)
            .ok_or(VerdantError::NotStrategicWallet(wallet))?;
        if w.locked {
            return Err(VerdantError::ReceiverLinkLocked(wallet));
        }
        if w.approved_receiver.is_none() {
            return Err(VerdantError::not_in("approved receiver", wallet));
        }
        w.approved_receiver = None;
        w.approved_receiver_limit = 0;
        w.approved_sent = 0;
        Ok(())
    }
}
