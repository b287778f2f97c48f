use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use verdant_core::error::VerdantError;
use verdant_core::event::Event;
use verdant_core::types::{Address, Balance, Context, Timestamp};
use verdant_token::Token;

use crate::schedule;

/// Domain tag mixed into every vesting wallet address.
const VESTING_DOMAIN: &[u8] = b"verdant.vesting-wallet.v1";

/// Address of the vesting wallet `creator` opens for `beneficiary`.
pub fn vesting_wallet_address(creator: &Address, beneficiary: &Address) -> Address {
    Address::derive(VESTING_DOMAIN, &[creator.as_bytes(), beneficiary.as_bytes()])
}

/// One beneficiary's vesting wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingWallet {
    pub address: Address,
    pub beneficiary: Address,
    /// Contract that opened the wallet.
    pub creator: Address,
    pub start: Timestamp,
    pub cliff: i64,
    pub duration: i64,
    /// Tokens released so far; never decreases.
    pub released: Balance,
}

impl VestingWallet {
    pub fn release_start(&self) -> Timestamp {
        self.start.saturating_add(self.cliff)
    }

    pub fn end(&self) -> Timestamp {
        self.release_start().saturating_add(self.duration)
    }
}

/// Arena of every vesting wallet on the chain, keyed by wallet address.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VestingRegistry {
    wallets: BTreeMap<Address, VestingWallet>,
    /// Events emitted since the last `take_events`; not persisted with the state.
    #[serde(skip)]
    events: Vec<Event>,
}

impl VestingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, wallet: &Address) -> Option<&VestingWallet> {
        self.wallets.get(wallet)
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Open a wallet for `beneficiary` on behalf of `creator`, vesting from `now`.
    pub fn create(
        &mut self,
        creator: Address,
        beneficiary: Address,
        start: Timestamp,
        cliff: i64,
        duration: i64,
    ) -> Result<Address, VerdantError> {
        if beneficiary.is_zero() {
            return Err(VerdantError::ZeroBeneficiary);
        }
        let address = vesting_wallet_address(&creator, &beneficiary);
        if self.wallets.contains_key(&address) {
            return Err(VerdantError::VestingWalletExists(beneficiary));
        }
        self.wallets.insert(
            address,
            VestingWallet { address, beneficiary, creator, start, cliff, duration, released: 0 },
        );
        self.events.push(Event::VestingWalletCreated { wallet: address, beneficiary, start, cliff, duration });
        info!(wallet = %address, %beneficiary, start, cliff, duration, "vesting wallet created");
        Ok(address)
    }

    fn wallet(&self, wallet: &Address) -> Result<&VestingWallet, VerdantError> {
        self.wallets
            .get(wallet)
            .ok_or(VerdantError::NoVestingWallet(*wallet))
    }

    /// Tokens ever deposited: current balance plus what was already released.
    pub fn total_allocation(&self, token: &Token, wallet: &Address) -> Result<Balance, VerdantError> {
        let w = self.wallet(wallet)?;
        token
            .balance_of(wallet)
            .checked_add(w.released)
            .ok_or(VerdantError::ArithmeticOverflow)
    }

    pub fn vested_amount(&self, token: &Token, wallet: &Address, t: Timestamp) -> Result<Balance, VerdantError> {
        let w = self.wallet(wallet)?;
        let total = self.total_allocation(token, wallet)?;
        schedule::vested_amount(total, w.start, w.cliff, w.duration, t)
    }

    pub fn releasable(&self, token: &Token, wallet: &Address, t: Timestamp) -> Result<Balance, VerdantError> {
        let w = self.wallet(wallet)?;
        Ok(self.vested_amount(token, wallet, t)?.saturating_sub(w.released))
    }

    /// Pay out everything vested so far to the beneficiary. Calling again at
    /// the same time releases nothing.
    pub fn release(&mut self, token: &mut Token, wallet: &Address, ctx: &Context) -> Result<Balance, VerdantError> {
        let amount = self.releasable(token, wallet, ctx.now)?;
        if amount == 0 {
            return Ok(0);
        }
        let beneficiary = self.wallet(wallet)?.beneficiary;
        token.transfer(&ctx.as_caller(*wallet), beneficiary, amount)?;

        if let Some(w) = self.wallets.get_mut(wallet) {
            w.released += amount;
        }
        self.events.push(Event::TokensReleased { wallet: *wallet, beneficiary, amount });
        info!(%wallet, %beneficiary, amount, "vested tokens released");
        Ok(amount)
    }

    /// One-line human-readable summary of a wallet.
    pub fn describe(&self, token: &Token, wallet: &Address, now: Timestamp) -> Result<String, VerdantError> {
        let w = self.wallet(wallet)?;
        let total = self.total_allocation(token, wallet)?;
        let vested = self.vested_amount(token, wallet, now)?;
        let phase = if now < w.release_start() {
            format!("cliff, releases from {}", w.release_start())
        } else if now < w.end() {
            format!("vesting until {}", w.end())
        } else {
            "fully vested".to_string()
        };
        Ok(format!(
            "VestingWallet {} | beneficiary {} | {} / {} vested | {} released | {}",
            w.address, w.beneficiary, vested, total, w.released, phase
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_core::constants::MINT_INTERVAL_SECS;
    use verdant_token::{FeeSchedule, TokenConfig};

    const T0: Timestamp = 1_700_000_000;

    fn funder() -> Address { Address::repeat(0xf0) }
    fn creator() -> Address { Address::repeat(0xcc) }
    fn alice() -> Address { Address::repeat(0x01) }

    fn token() -> Token {
        Token::new(
            TokenConfig {
                name: "Verdant".into(),
                symbol: "VERD".into(),
                address: Address::repeat(0x70),
                admin: Address::repeat(0xad),
                fees: FeeSchedule {
                    company_rate: 0,
                    esg_fund_rate: 0,
                    burn_rate: 0,
                    company_rewards_wallet: Address::repeat(0xc0),
                    esg_fund_wallet: Address::repeat(0xe5),
                },
                max_strategic_transfer: 0,
                strategic_cooldown: 0,
                mint_interval: MINT_INTERVAL_SECS,
                strategic_wallets: vec![],
                initial_balances: vec![(funder(), 1_000_000)],
                feeless: vec![],
            },
            T0,
        )
        .unwrap()
    }

    #[test]
    fn one_wallet_per_creator_and_beneficiary() {
        let mut reg = VestingRegistry::new();
        let w = reg.create(creator(), alice(), T0, 10, 100).unwrap();
        assert_eq!(w, vesting_wallet_address(&creator(), &alice()));
        assert_eq!(
            reg.create(creator(), alice(), T0, 10, 100).unwrap_err(),
            VerdantError::VestingWalletExists(alice())
        );
        // Another creator gets its own wallet for the same beneficiary.
        let other = reg.create(Address::repeat(0xdd), alice(), T0, 10, 100).unwrap();
        assert_ne!(w, other);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn release_follows_schedule_and_is_idempotent() {
        let mut token = token();
        let mut reg = VestingRegistry::new();
        let w = reg.create(creator(), alice(), T0, 100, 1_000).unwrap();
        token.transfer(&Context::new(funder(), T0), w, 10_000).unwrap();

        let ctx = Context::new(alice(), T0 + 50);
        assert_eq!(reg.release(&mut token, &w, &ctx).unwrap(), 0);

        let ctx = Context::new(alice(), T0 + 600);
        assert_eq!(reg.vested_amount(&token, &w, ctx.now).unwrap(), 5_000);
        assert_eq!(reg.release(&mut token, &w, &ctx).unwrap(), 5_000);
        assert_eq!(reg.release(&mut token, &w, &ctx).unwrap(), 0);
        assert_eq!(token.balance_of(&alice()), 5_000);
        // Released tokens still count towards the allocation.
        assert_eq!(reg.vested_amount(&token, &w, ctx.now).unwrap(), 5_000);

        let ctx = Context::new(alice(), T0 + 5_000);
        assert_eq!(reg.release(&mut token, &w, &ctx).unwrap(), 5_000);
        assert_eq!(token.balance_of(&w), 0);
        assert_eq!(reg.get(&w).unwrap().released, 10_000);
    }

    #[test]
    fn unknown_wallet_errors() {
        let token = token();
        let reg = VestingRegistry::new();
        let w = Address::repeat(0x42);
        assert_eq!(reg.vested_amount(&token, &w, T0), Err(VerdantError::NoVestingWallet(w)));
    }
}
