use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use verdant_core::error::VerdantError;
use verdant_core::event::Event;
use verdant_core::native::NativeLedger;
use verdant_core::types::{Address, Balance, Context, Timestamp};
use verdant_token::Token;
use verdant_vesting::{vesting_wallet_address, VestingRegistry};

use crate::rate::Phase;
use crate::terms::{Contributions, SaleTerms};
use crate::whitelist::Whitelist;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingCrowdsaleConfig {
    pub terms: SaleTerms,
    /// May buy on behalf of any beneficiary, paying from its own balance.
    pub purchaser: Address,
    pub cliff: i64,
    pub vesting_duration: i64,
    /// `Some` makes this the private sale.
    pub whitelister: Option<Address>,
}

impl VestingCrowdsaleConfig {
    fn validate(&self, now: Timestamp) -> Result<(), VerdantError> {
        self.terms.rate.validate()?;
        if self.terms.wallet.is_zero() {
            return Err(VerdantError::ZeroWallet);
        }
        if self.purchaser.is_zero() {
            return Err(VerdantError::ZeroPurchaser);
        }
        if self.terms.token.is_zero() {
            return Err(VerdantError::ZeroToken);
        }
        if self.whitelister.map(|w| w.is_zero()).unwrap_or(false) {
            return Err(VerdantError::ZeroWhitelister);
        }
        self.terms.validate_limits(now)?;
        if self.vesting_duration <= 0 || self.cliff < 0 {
            return Err(VerdantError::ZeroDuration);
        }
        Ok(())
    }
}

/// Crowdsale that locks purchases in per-beneficiary vesting wallets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VestingCrowdsale {
    pub address: Address,
    terms: SaleTerms,
    purchaser: Address,
    cliff: i64,
    vesting_duration: i64,
    whitelist: Option<Whitelist>,
    raised: Contributions,
    /// beneficiary → vesting wallet address
    vesting_wallets: BTreeMap<Address, Address>,
    #[serde(skip)]
    events: Vec<Event>,
}

impl VestingCrowdsale {
    pub fn new(address: Address, config: VestingCrowdsaleConfig, now: Timestamp) -> Result<Self, VerdantError> {
        config.validate(now)?;
        let whitelist = config.whitelister.map(Whitelist::new).transpose()?;
        info!(
            sale = %address,
            wallet = %config.terms.wallet,
            purchaser = %config.purchaser,
            cliff = config.cliff,
            duration = config.vesting_duration,
            private = whitelist.is_some(),
            "vesting crowdsale deployed"
        );
        Ok(Self {
            address,
            terms: config.terms,
            purchaser: config.purchaser,
            cliff: config.cliff,
            vesting_duration: config.vesting_duration,
            whitelist,
            raised: Contributions::default(),
            vesting_wallets: BTreeMap::new(),
            events: Vec::new(),
        })
    }

    pub fn terms(&self) -> &SaleTerms {
        &self.terms
    }

    pub fn purchaser(&self) -> Address {
        self.purchaser
    }

    pub fn is_private(&self) -> bool {
        self.whitelist.is_some()
    }

    pub fn current_rate(&self, now: Timestamp) -> Balance {
        self.terms.current_rate(now)
    }

    pub fn investor_tariff(&self) -> Balance {
        self.terms.investor_tariff
    }

    pub fn investor_cap(&self) -> Balance {
        self.terms.investor_cap
    }

    pub fn contribution(&self, beneficiary: &Address) -> Balance {
        self.raised.contribution(beneficiary)
    }

    pub fn wei_raised(&self) -> Balance {
        self.raised.wei_raised()
    }

    pub fn remaining_tokens(&self, token: &Token) -> Balance {
        self.terms.remaining_tokens(token, &self.address)
    }

    pub fn phase(&self, token: &Token, now: Timestamp) -> Phase {
        self.terms.phase(token, &self.address, now)
    }

    pub fn is_whitelisted(&self, account: &Address) -> bool {
        self.whitelist.as_ref().map(|w| w.contains(account)).unwrap_or(true)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
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

    /// Release whatever has vested for `beneficiary`. Anyone may trigger it;
    /// the tokens always go to the beneficiary.
    pub fn withdraw_tokens(
        &self,
        token: &mut Token,
        vesting: &mut VestingRegistry,
        ctx: &Context,
        beneficiary: &Address,
    ) -> Result<Balance, VerdantError> {
        let wallet = self.vesting_wallet(beneficiary)?;
        vesting.release(token, &wallet, ctx)
    }

    // ── Purchase ────────────────────────────────────────────────────────────

    pub fn buy_tokens(
        &mut self,
        token: &mut Token,
        native: &mut NativeLedger,
        vesting: &mut VestingRegistry,
        ctx: &Context,
        beneficiary: Address,
    ) -> Result<Balance, VerdantError> {
        self.purchase(token, native, vesting, ctx, beneficiary, ctx.value)
    }

    /// Purchaser-only proxy purchase paid from the purchaser's own balance.
    pub fn participate_on_behalf_of(
        &mut self,
        token: &mut Token,
        native: &mut NativeLedger,
        vesting: &mut VestingRegistry,
        ctx: &Context,
        beneficiary: Address,
        wei_amount: Balance,
    ) -> Result<Balance, VerdantError> {
        if ctx.caller != self.purchaser {
            return Err(VerdantError::OnlyPurchaser);
        }
        if beneficiary.is_zero() {
            return Err(VerdantError::ZeroBeneficiary);
        }
        if wei_amount == 0 {
            return Err(VerdantError::ZeroAmount);
        }
        self.purchase(token, native, vesting, ctx, beneficiary, wei_amount)
    }

    fn purchase(
        &mut self,
        token: &mut Token,
        native: &mut NativeLedger,
        vesting: &mut VestingRegistry,
        ctx: &Context,
        beneficiary: Address,
        value: Balance,
    ) -> Result<Balance, VerdantError> {
        if let Some(w) = &self.whitelist {
            if !beneficiary.is_zero() && !w.contains(&beneficiary) {
                return Err(VerdantError::BeneficiaryNotWhitelisted(beneficiary));
            }
        }
        let tokens = self
            .terms
            .quote(&self.raised, token, &self.address, &beneficiary, value, ctx.now)?;

        let existing = self.vesting_wallets.get(&beneficiary).copied();
        let wallet = existing.unwrap_or_else(|| vesting_wallet_address(&self.address, &beneficiary));

        native.transfer(ctx.caller, self.terms.wallet, value)?;
        token.transfer_from(&ctx.as_caller(self.address), self.terms.wallet, wallet, tokens)?;
        if existing.is_none() {
            vesting.create(self.address, beneficiary, ctx.now, self.cliff, self.vesting_duration)?;
            self.vesting_wallets.insert(beneficiary, wallet);
        }
        self.raised.record(beneficiary, value)?;

        self.events.push(Event::TokensPurchased {
            sale: self.address,
            purchaser: ctx.caller,
            beneficiary,
            value,
            amount: tokens,
        });
        info!(
            sale = %self.address,
            purchaser = %ctx.caller,
            %beneficiary,
            vesting_wallet = %wallet,
            value,
            tokens,
            "tokens purchased into vesting"
        );
        Ok(tokens)
    }

    // ── Whitelist ───────────────────────────────────────────────────────────

    pub fn add_to_whitelist(&mut self, ctx: &Context, account: Address) -> Result<(), VerdantError> {
        self.whitelist
            .as_mut()
            .ok_or(VerdantError::OnlyWhitelister)?
            .add(&ctx.caller, account)?;
        self.events.push(Event::WhitelistAdded { sale: self.address, account });
        info!(sale = %self.address, %account, "whitelisted");
        Ok(())
    }

    pub fn remove_from_whitelist(&mut self, ctx: &Context, account: Address) -> Result<(), VerdantError> {
        self.whitelist
            .as_mut()
            .ok_or(VerdantError::OnlyWhitelister)?
            .remove(&ctx.caller, account)?;
        self.events.push(Event::WhitelistRemoved { sale: self.address, account });
        info!(sale = %self.address, %account, "removed from whitelist");
        Ok(())
    }
}
