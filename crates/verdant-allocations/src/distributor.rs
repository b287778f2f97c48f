use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use verdant_core::error::VerdantError;
use verdant_core::event::Event;
use verdant_core::types::{Address, Balance, Context, Timestamp};
use verdant_token::Token;
use verdant_vesting::{vesting_wallet_address, VestingRegistry};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorConfig {
    pub token: Address,
    /// Source of every allocation.
    pub wallet: Address,
    pub admin: Address,
    pub cliff: i64,
    pub vesting_duration: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Distributor {
    pub address: Address,
    token: Address,
    wallet: Address,
    admin: Address,
    cliff: i64,
    vesting_duration: i64,
    /// beneficiary → vesting wallet; presence means "already allocated".
    vesting_wallets: BTreeMap<Address, Address>,
    total_allocated: Balance,
    #[serde(skip)]
    events: Vec<Event>,
}

impl Distributor {
    pub fn new(address: Address, config: DistributorConfig) -> Result<Self, VerdantError> {
        if config.token.is_zero() {
            return Err(VerdantError::ZeroToken);
        }
        if config.wallet.is_zero() {
            return Err(VerdantError::ZeroWallet);
        }
        if config.admin.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        if config.vesting_duration <= 0 || config.cliff < 0 {
            return Err(VerdantError::ZeroDuration);
        }
        info!(
            distributor = %address,
            wallet = %config.wallet,
            admin = %config.admin,
            cliff = config.cliff,
            duration = config.vesting_duration,
            "allocations distributor deployed"
        );
        Ok(Self {
            address,
            token: config.token,
            wallet: config.wallet,
            admin: config.admin,
            cliff: config.cliff,
            vesting_duration: config.vesting_duration,
            vesting_wallets: BTreeMap::new(),
            total_allocated: 0,
            events: Vec::new(),
        })
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn wallet(&self) -> Address {
        self.wallet
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn total_allocated(&self) -> Balance {
        self.total_allocated
    }

    pub fn beneficiaries(&self) -> impl Iterator<Item = &Address> {
        self.vesting_wallets.keys()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// What can still be allocated: the wallet's allowance to the
    /// distributor, bounded by the wallet's balance.
    pub fn remaining_budget(&self, token: &Token) -> Balance {
        token
            .allowance(&self.wallet, &self.address)
            .min(token.balance_of(&self.wallet))
    }

    pub fn vesting_wallet(&self, beneficiary: &Address) -> Result<Address, VerdantError> {
        self.vesting_wallets
            .get(beneficiary)
            .copied()
            .ok_or(VerdantError::NoVestingWallet(*beneficiary))
    }

    pub fn vested_amount(
        &self,
        token: &Token,
        vesting: &VestingRegistry,
        beneficiary: &Address,
        now: Timestamp,
    ) -> Result<Balance, VerdantError> {
        let wallet = self.vesting_wallet(beneficiary)?;
        vesting.vested_amount(token, &wallet, now)
    }

    /// Grant `amount` to `beneficiary` in a fresh vesting wallet starting now.
    /// Succeeds at most once per beneficiary.
    pub fn allocate(
        &mut self,
        token: &mut Token,
        vesting: &mut VestingRegistry,
        ctx: &Context,
        beneficiary: Address,
        amount: Balance,
    ) -> Result<Address, VerdantError> {
        if ctx.caller != self.admin {
            return Err(VerdantError::InvalidSender);
        }
        if beneficiary.is_zero() {
            return Err(VerdantError::ZeroBeneficiary);
        }
        if amount == 0 {
            return Err(VerdantError::ZeroAmount);
        }
        if self.vesting_wallets.contains_key(&beneficiary) {
            return Err(VerdantError::VestingWalletExists(beneficiary));
        }
        let remaining = self.remaining_budget(token);
        if amount > remaining {
            return Err(VerdantError::AmountTooLarge { amount, remaining });
        }
        let total = self
            .total_allocated
            .checked_add(amount)
            .ok_or(VerdantError::ArithmeticOverflow)?;

        let wallet = vesting_wallet_address(&self.address, &beneficiary);
        token.transfer_from(&ctx.as_caller(self.address), self.wallet, wallet, amount)?;
        vesting.create(self.address, beneficiary, ctx.now, self.cliff, self.vesting_duration)?;

        self.vesting_wallets.insert(beneficiary, wallet);
        self.total_allocated = total;
        self.events.push(Event::Allocated { distributor: self.address, beneficiary, wallet, amount });
        info!(distributor = %self.address, %beneficiary, %wallet, amount, "allocated");
        Ok(wallet)
    }

    /// Release vested tokens of `beneficiary`. Anyone may trigger it.
    pub fn withdraw(
        &self,
        token: &mut Token,
        vesting: &mut VestingRegistry,
        ctx: &Context,
        beneficiary: &Address,
    ) -> Result<Balance, VerdantError> {
        let wallet = self.vesting_wallet(beneficiary)?;
        vesting.release(token, &wallet, ctx)
    }
}
