use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use verdant_core::constants::MINT_LIMIT_DIVISOR;
use verdant_core::error::VerdantError;
use verdant_core::event::Event;
use verdant_core::types::{Address, Balance, Context, Role, Timestamp};

use crate::fees::{FeeSchedule, FeeSplit};
use crate::roles::AccessControl;
use crate::snapshot::Snapshots;
use crate::throttle::{Outflow, StrategicKind, Throttle};

/// Everything needed to bring a token into existence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    /// Address the token contract lives at.
    pub address: Address,
    /// Initially holds every role.
    pub admin: Address,
    pub fees: FeeSchedule,
    pub max_strategic_transfer: Balance,
    pub strategic_cooldown: i64,
    pub mint_interval: i64,
    pub strategic_wallets: Vec<(Address, StrategicKind)>,
    pub initial_balances: Vec<(Address, Balance)>,
    pub feeless: Vec<Address>,
}

// ── Token ─────────────────────────────────────────────────────────────────────

/// The token ledger and policy engine.
///
/// All mutating methods validate every precondition before touching state, so
/// an `Err` leaves the token exactly as it was.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    pub symbol: String,
    pub address: Address,
    balances: BTreeMap<Address, Balance>,
    allowances: BTreeMap<(Address, Address), Balance>,
    total_supply: Balance,
    roles: AccessControl,
    fees: FeeSchedule,
    feeless: BTreeSet<Address>,
    blacklist: BTreeSet<Address>,
    throttle: Throttle,
    last_mint: Timestamp,
    mint_interval: i64,
    paused: bool,
    snapshots: Snapshots,
    /// Events emitted since the last `take_events`; not persisted with the state.
    #[serde(skip)]
    events: Vec<Event>,
}

impl Token {
    /// Create the token at `now`. The genesis issuance counts as the first
    /// mint for the purpose of the minting cadence.
    pub fn new(config: TokenConfig, now: Timestamp) -> Result<Self, VerdantError> {
        if config.address.is_zero() || config.admin.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        config.fees.validate()?;

        let mut throttle = Throttle::new(config.max_strategic_transfer, config.strategic_cooldown);
        for (wallet, kind) in &config.strategic_wallets {
            throttle.register(*wallet, *kind)?;
        }

        let mut token = Self {
            name: config.name,
            symbol: config.symbol,
            address: config.address,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            total_supply: 0,
            roles: AccessControl::with_admin(config.admin),
            fees: config.fees,
            feeless: config.feeless.into_iter().collect(),
            blacklist: BTreeSet::new(),
            throttle,
            last_mint: now,
            mint_interval: config.mint_interval,
            paused: false,
            snapshots: Snapshots::default(),
            events: Vec::new(),
        };

        for (account, amount) in config.initial_balances {
            if account.is_zero() {
                return Err(VerdantError::ZeroAddress);
            }
            token.credit(account, amount)?;
            token.total_supply = token
                .total_supply
                .checked_add(amount)
                .ok_or(VerdantError::ArithmeticOverflow)?;
            token.events.push(Event::Mint { to: account, amount });
        }

        info!(
            token = %token.address,
            supply = token.total_supply,
            "token created"
        );
        Ok(token)
    }

    // ── Read-only surface ───────────────────────────────────────────────────

    pub fn balance_of(&self, account: &Address) -> Balance {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Balance {
        self.total_supply
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Balance {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    pub fn is_feeless(&self, account: &Address) -> bool {
        self.feeless.contains(account)
    }

    pub fn is_blacklisted(&self, account: &Address) -> bool {
        self.blacklist.contains(account)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.roles.has_role(role, account)
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// (company, esg fund, burn), per-mille.
    pub fn fee_rates(&self) -> (u16, u16, u16) {
        (self.fees.company_rate, self.fees.esg_fund_rate, self.fees.burn_rate)
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn is_transfer_restricted(&self, wallet: &Address, now: Timestamp) -> bool {
        self.throttle.is_restricted(wallet, now)
    }

    pub fn company_liquidity_transfers_are_restricted(&self, now: Timestamp) -> bool {
        self.kind_restricted(StrategicKind::CompanyLiquidity, now)
    }

    pub fn allocations_transfers_are_restricted(&self, now: Timestamp) -> bool {
        self.kind_restricted(StrategicKind::Allocations, now)
    }

    pub fn crowdsales_transfers_are_restricted(&self, now: Timestamp) -> bool {
        self.kind_restricted(StrategicKind::Crowdsales, now)
    }

    fn kind_restricted(&self, kind: StrategicKind, now: Timestamp) -> bool {
        self.throttle
            .wallet_of_kind(kind)
            .map(|w| self.throttle.is_restricted(&w, now))
            .unwrap_or(false)
    }

    pub fn last_mint(&self) -> Timestamp {
        self.last_mint
    }

    pub fn next_mint_at(&self) -> Timestamp {
        self.last_mint.saturating_add(self.mint_interval)
    }

    pub fn max_mint_amount(&self) -> Balance {
        self.total_supply / MINT_LIMIT_DIVISOR
    }

    pub fn current_snapshot_id(&self) -> u64 {
        self.snapshots.current_id()
    }

    pub fn balance_of_at(&self, account: &Address, id: u64) -> Result<Balance, VerdantError> {
        self.snapshots.account_at(account, id, self.balance_of(account))
    }

    pub fn total_supply_at(&self, id: u64) -> Result<Balance, VerdantError> {
        self.snapshots.supply_at(id, self.total_supply)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Every account with a non-zero balance.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Balance)> {
        self.balances.iter().filter(|(_, b)| **b > 0)
    }

    // ── ERC20 surface ───────────────────────────────────────────────────────

    pub fn transfer(&mut self, ctx: &Context, to: Address, amount: Balance) -> Result<FeeSplit, VerdantError> {
        self.move_tokens(ctx, ctx.caller, to, amount)
    }

    pub fn transfer_from(
        &mut self,
        ctx: &Context,
        from: Address,
        to: Address,
        amount: Balance,
    ) -> Result<FeeSplit, VerdantError> {
        let have = self.allowance(&from, &ctx.caller);
        if have < amount {
            return Err(VerdantError::InsufficientAllowance { need: amount, have });
        }
        let split = self.move_tokens(ctx, from, to, amount)?;
        self.allowances.insert((from, ctx.caller), have - amount);
        Ok(split)
    }

    pub fn approve(&mut self, ctx: &Context, spender: Address, amount: Balance) -> Result<(), VerdantError> {
        if spender.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        self.allowances.insert((ctx.caller, spender), amount);
        self.events.push(Event::Approval { owner: ctx.caller, spender, amount });
        Ok(())
    }

    pub fn increase_allowance(&mut self, ctx: &Context, spender: Address, added: Balance) -> Result<(), VerdantError> {
        let current = self.allowance(&ctx.caller, &spender);
        let amount = current.checked_add(added).ok_or(VerdantError::ArithmeticOverflow)?;
        self.approve(ctx, spender, amount)
    }

    pub fn decrease_allowance(&mut self, ctx: &Context, spender: Address, subtracted: Balance) -> Result<(), VerdantError> {
        let current = self.allowance(&ctx.caller, &spender);
        if current < subtracted {
            return Err(VerdantError::InsufficientAllowance { need: subtracted, have: current });
        }
        self.approve(ctx, spender, current - subtracted)
    }

    /// The single path every token movement goes through.
    fn move_tokens(
        &mut self,
        ctx: &Context,
        from: Address,
        to: Address,
        amount: Balance,
    ) -> Result<FeeSplit, VerdantError> {
        for party in [from, to, ctx.caller] {
            if self.blacklist.contains(&party) {
                return Err(VerdantError::BlacklistedParty(party));
            }
        }
        if self.paused {
            return Err(VerdantError::Paused);
        }
        if from.is_zero() || to.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        let have = self.balance_of(&from);
        if have < amount {
            return Err(VerdantError::InsufficientBalance { need: amount, have });
        }

        let sender_feeless = self.feeless.contains(&from);
        let outflow = if sender_feeless {
            None
        } else {
            self.throttle.evaluate(&from, &to, amount, ctx.now)?
        };

        let split = if sender_feeless || self.feeless.contains(&ctx.caller) {
            FeeSplit::feeless(amount)
        } else {
            self.fees.split(amount)?
        };

        // ── Commit ──────────────────────────────────────────────────────────
        self.debit(from, amount);
        self.credit(to, split.net)?;
        self.events.push(Event::Transfer { from, to, amount: split.net });

        if split.total_fee() > 0 {
            let company_wallet = self.fees.company_rewards_wallet;
            let esg_wallet = self.fees.esg_fund_wallet;
            if split.company > 0 {
                self.credit(company_wallet, split.company)?;
                self.events.push(Event::Transfer { from, to: company_wallet, amount: split.company });
            }
            if split.esg_fund > 0 {
                self.credit(esg_wallet, split.esg_fund)?;
                self.events.push(Event::Transfer { from, to: esg_wallet, amount: split.esg_fund });
            }
            if split.burned > 0 {
                self.snapshots.record_supply(self.total_supply);
                self.total_supply -= split.burned;
                self.events.push(Event::Burn { from, amount: split.burned });
            }
            self.events.push(Event::FeeCollected {
                from,
                company: split.company,
                esg_fund: split.esg_fund,
                burned: split.burned,
            });
        }

        if let Some(outcome) = outflow {
            self.throttle.apply(&from, outcome, ctx.now);
            if outcome == Outflow::CapReached {
                self.events.push(Event::TransferCapReached { wallet: from, at: ctx.now });
                warn!(wallet = %from, at = ctx.now, "strategic wallet reached its transfer cap");
            }
        }

        debug!(%from, %to, amount, net = split.net, fee = split.total_fee(), "token transfer");
        Ok(split)
    }

    fn debit(&mut self, account: Address, amount: Balance) {
        let bal = self.balance_of(&account);
        self.snapshots.record_account(account, bal);
        self.balances.insert(account, bal - amount);
    }

    fn credit(&mut self, account: Address, amount: Balance) -> Result<(), VerdantError> {
        let bal = self.balance_of(&account);
        let new = bal.checked_add(amount).ok_or(VerdantError::ArithmeticOverflow)?;
        self.snapshots.record_account(account, bal);
        self.balances.insert(account, new);
        Ok(())
    }

    // ── Supply ──────────────────────────────────────────────────────────────

    pub fn mint(&mut self, ctx: &Context, to: Address, amount: Balance) -> Result<(), VerdantError> {
        self.roles.check(Role::Minter, &ctx.caller)?;
        if self.paused {
            return Err(VerdantError::Paused);
        }
        if to.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        if amount == 0 {
            return Err(VerdantError::ZeroAmount);
        }
        if ctx.now < self.next_mint_at() {
            return Err(VerdantError::MintTooSoon { next_mint_at: self.next_mint_at() });
        }
        let max = self.max_mint_amount();
        if amount > max {
            return Err(VerdantError::MintExceedsLimit { amount, max });
        }
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(VerdantError::ArithmeticOverflow)?;

        self.credit(to, amount)?;
        self.snapshots.record_supply(self.total_supply);
        self.total_supply = new_supply;
        self.last_mint = ctx.now;
        self.events.push(Event::Mint { to, amount });
        info!(%to, amount, supply = self.total_supply, "minted");
        Ok(())
    }

    pub fn burn(&mut self, ctx: &Context, amount: Balance) -> Result<(), VerdantError> {
        self.burn_tokens(ctx.caller, amount)
    }

    pub fn burn_from(&mut self, ctx: &Context, account: Address, amount: Balance) -> Result<(), VerdantError> {
        let have = self.allowance(&account, &ctx.caller);
        if have < amount {
            return Err(VerdantError::InsufficientAllowance { need: amount, have });
        }
        self.burn_tokens(account, amount)?;
        self.allowances.insert((account, ctx.caller), have - amount);
        Ok(())
    }

    fn burn_tokens(&mut self, account: Address, amount: Balance) -> Result<(), VerdantError> {
        if self.paused {
            return Err(VerdantError::Paused);
        }
        let have = self.balance_of(&account);
        if have < amount {
            return Err(VerdantError::InsufficientBalance { need: amount, have });
        }
        self.debit(account, amount);
        self.snapshots.record_supply(self.total_supply);
        self.total_supply -= amount;
        self.events.push(Event::Burn { from: account, amount });
        info!(%account, amount, supply = self.total_supply, "burned");
        Ok(())
    }

    // ── Registries ──────────────────────────────────────────────────────────

    pub fn add_feeless(&mut self, ctx: &Context, account: Address) -> Result<(), VerdantError> {
        self.roles.check(Role::FeelessAdmin, &ctx.caller)?;
        if account.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        if !self.feeless.insert(account) {
            return Err(VerdantError::already("feeless", account));
        }
        self.events.push(Event::FeelessAdded { account });
        info!(%account, "feeless added");
        Ok(())
    }

    pub fn remove_feeless(&mut self, ctx: &Context, account: Address) -> Result<(), VerdantError> {
        self.roles.check(Role::FeelessAdmin, &ctx.caller)?;
        if account.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        if !self.feeless.remove(&account) {
            return Err(VerdantError::not_in("feeless", account));
        }
        self.events.push(Event::FeelessRemoved { account });
        info!(%account, "feeless removed");
        Ok(())
    }

    pub fn add_blacklisted(&mut self, ctx: &Context, account: Address) -> Result<(), VerdantError> {
        self.roles.check(Role::Blacklister, &ctx.caller)?;
        if account.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        if !self.blacklist.insert(account) {
            return Err(VerdantError::already("blacklisted", account));
        }
        self.events.push(Event::Blacklisted { account });
        info!(%account, "blacklisted");
        Ok(())
    }

    pub fn remove_blacklisted(&mut self, ctx: &Context, account: Address) -> Result<(), VerdantError> {
        self.roles.check(Role::Blacklister, &ctx.caller)?;
        if account.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        if !self.blacklist.remove(&account) {
            return Err(VerdantError::not_in("blacklisted", account));
        }
        self.events.push(Event::Unblacklisted { account });
        info!(%account, "removed from blacklist");
        Ok(())
    }

    pub fn add_unrestricted_receiver(
        &mut self,
        ctx: &Context,
        wallet: Address,
        receiver: Address,
        limit: Balance,
        removable: bool,
    ) -> Result<(), VerdantError> {
        self.roles.check(Role::Admin, &ctx.caller)?;
        if wallet.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        self.throttle.set_approved_receiver(wallet, receiver, limit, removable)?;
        self.events.push(Event::UnrestrictedReceiverSet { wallet, receiver, limit, removable });
        info!(%wallet, %receiver, limit, removable, "unrestricted receiver set");
        Ok(())
    }

    pub fn remove_unrestricted_receiver(&mut self, ctx: &Context, wallet: Address) -> Result<(), VerdantError> {
        self.roles.check(Role::Admin, &ctx.caller)?;
        if wallet.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        self.throttle.remove_approved_receiver(wallet)?;
        self.events.push(Event::UnrestrictedReceiverRemoved { wallet });
        info!(%wallet, "unrestricted receiver removed");
        Ok(())
    }

    // ── Administration ──────────────────────────────────────────────────────

    pub fn pause(&mut self, ctx: &Context) -> Result<(), VerdantError> {
        self.roles.check(Role::Pauser, &ctx.caller)?;
        if self.paused {
            return Err(VerdantError::already("paused", self.address));
        }
        self.paused = true;
        self.events.push(Event::Paused { by: ctx.caller });
        warn!(by = %ctx.caller, "token paused");
        Ok(())
    }

    pub fn unpause(&mut self, ctx: &Context) -> Result<(), VerdantError> {
        self.roles.check(Role::Pauser, &ctx.caller)?;
        if !self.paused {
            return Err(VerdantError::not_in("paused", self.address));
        }
        self.paused = false;
        self.events.push(Event::Unpaused { by: ctx.caller });
        info!(by = %ctx.caller, "token unpaused");
        Ok(())
    }

    pub fn snapshot(&mut self, ctx: &Context) -> Result<u64, VerdantError> {
        self.roles.check(Role::Snapshotter, &ctx.caller)?;
        let id = self.snapshots.take();
        self.events.push(Event::Snapshot { id });
        info!(id, "snapshot taken");
        Ok(id)
    }

    pub fn grant_role(&mut self, ctx: &Context, role: Role, account: Address) -> Result<(), VerdantError> {
        self.roles.check(Role::Admin, &ctx.caller)?;
        self.roles.grant(role, account)?;
        self.events.push(Event::RoleGranted { role, account });
        info!(%role, %account, "role granted");
        Ok(())
    }

    pub fn revoke_role(&mut self, ctx: &Context, role: Role, account: Address) -> Result<(), VerdantError> {
        self.roles.check(Role::Admin, &ctx.caller)?;
        self.roles.revoke(role, account)?;
        self.events.push(Event::RoleRevoked { role, account });
        info!(%role, %account, "role revoked");
        Ok(())
    }

    pub fn set_fee_rates(&mut self, ctx: &Context, company: u16, esg_fund: u16, burn: u16) -> Result<(), VerdantError> {
        self.roles.check(Role::Admin, &ctx.caller)?;
        FeeSchedule::validate_rates(company, esg_fund, burn)?;
        self.fees.company_rate = company;
        self.fees.esg_fund_rate = esg_fund;
        self.fees.burn_rate = burn;
        self.events.push(Event::FeeRatesUpdated { company, esg_fund, burn });
        info!(company, esg_fund, burn, "fee rates updated");
        Ok(())
    }

    pub fn set_reward_wallets(&mut self, ctx: &Context, company: Address, esg_fund: Address) -> Result<(), VerdantError> {
        self.roles.check(Role::Admin, &ctx.caller)?;
        if company.is_zero() || esg_fund.is_zero() {
            return Err(VerdantError::ZeroAddress);
        }
        self.fees.company_rewards_wallet = company;
        self.fees.esg_fund_wallet = esg_fund;
        self.events.push(Event::RewardWalletsUpdated { company, esg_fund });
        info!(%company, %esg_fund, "reward wallets updated");
        Ok(())
    }
}
