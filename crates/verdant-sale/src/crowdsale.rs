use serde::{Deserialize, Serialize};
use tracing::info;
use verdant_core::error::VerdantError;
use verdant_core::event::Event;
use verdant_core::native::NativeLedger;
use verdant_core::types::{Address, Balance, Context, Timestamp};
use verdant_token::Token;

use crate::rate::Phase;
use crate::terms::{Contributions, SaleTerms};
use crate::whitelist::Whitelist;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrowdsaleConfig {
    pub terms: SaleTerms,
    /// `Some` turns the sale into a whitelisted sale.
    pub whitelister: Option<Address>,
}

/// Direct-delivery crowdsale: purchased tokens land in the beneficiary's
/// account immediately.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Crowdsale {
    pub address: Address,
    terms: SaleTerms,
    whitelist: Option<Whitelist>,
    raised: Contributions,
    #[serde(skip)]
    events: Vec<Event>,
}

impl Crowdsale {
    pub fn new(address: Address, config: CrowdsaleConfig, now: Timestamp) -> Result<Self, VerdantError> {
        config.terms.validate(now)?;
        let whitelist = config.whitelister.map(Whitelist::new).transpose()?;
        info!(
            sale = %address,
            wallet = %config.terms.wallet,
            opening = config.terms.opening,
            closing = config.terms.closing,
            whitelisted = whitelist.is_some(),
            "crowdsale deployed"
        );
        Ok(Self {
            address,
            terms: config.terms,
            whitelist,
            raised: Contributions::default(),
            events: Vec::new(),
        })
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    pub fn terms(&self) -> &SaleTerms {
        &self.terms
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

    // ── Purchase ────────────────────────────────────────────────────────────

    /// Buy tokens for `beneficiary` with the native value attached to `ctx`.
    /// Returns the number of tokens drawn from the sale wallet.
    pub fn buy_tokens(
        &mut self,
        token: &mut Token,
        native: &mut NativeLedger,
        ctx: &Context,
        beneficiary: Address,
    ) -> Result<Balance, VerdantError> {
        if let Some(w) = &self.whitelist {
            if !beneficiary.is_zero() && !w.contains(&beneficiary) {
                return Err(VerdantError::BeneficiaryNotWhitelisted(beneficiary));
            }
        }
        let value = ctx.value;
        let tokens = self
            .terms
            .quote(&self.raised, token, &self.address, &beneficiary, value, ctx.now)?;

        native.transfer(ctx.caller, self.terms.wallet, value)?;
        token.transfer_from(&ctx.as_caller(self.address), self.terms.wallet, beneficiary, tokens)?;
        self.raised.record(beneficiary, value)?;

        self.events.push(Event::TokensPurchased {
            sale: self.address,
            purchaser: ctx.caller,
            beneficiary,
            value,
            amount: tokens,
        });
        info!(sale = %self.address, purchaser = %ctx.caller, %beneficiary, value, tokens, "tokens purchased");
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
