use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;
use verdant_allocations::Distributor;
use verdant_core::error::VerdantError;
use verdant_core::event::Event;
use verdant_core::native::NativeLedger;
use verdant_core::types::{Address, Context, Timestamp};
use verdant_sale::{Crowdsale, VestingCrowdsale};
use verdant_token::Token;
use verdant_vesting::VestingRegistry;

use crate::call::{Action, Call, Outcome};

const CONTRACT_DOMAIN: &[u8] = b"verdant.contract.v1";

/// Address of the `nonce`-th contract deployed by `deployer`.
pub fn contract_address(deployer: &Address, nonce: u64) -> Address {
    Address::derive(CONTRACT_DOMAIN, &[deployer.as_bytes(), &nonce.to_be_bytes()])
}

/// A deployed contract instance other than the token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Contract {
    Crowdsale(Crowdsale),
    VestingCrowdsale(VestingCrowdsale),
    Distributor(Distributor),
}

impl Contract {
    pub fn kind(&self) -> &'static str {
        match self {
            Contract::Crowdsale(_) => "crowdsale",
            Contract::VestingCrowdsale(_) => "vesting crowdsale",
            Contract::Distributor(_) => "distributor",
        }
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        match self {
            Contract::Crowdsale(s) => s.take_events(),
            Contract::VestingCrowdsale(s) => s.take_events(),
            Contract::Distributor(d) => d.take_events(),
        }
    }
}

// ── ChainState ────────────────────────────────────────────────────────────────

/// The complete economic state of the chain.
///
/// `execute` mutates in place and may leave partial changes behind on error;
/// callers that need atomicity run it on a copy (see `StateEngine::apply`).
///
/// `StateDb` persists it component by component; contracts are stored one
/// record per address and only rewritten when a call touched them.
#[derive(Clone, Debug)]
pub struct ChainState {
    pub token: Token,
    pub native: NativeLedger,
    pub vesting: VestingRegistry,
    pub(crate) contracts: BTreeMap<Address, Contract>,
    pub(crate) deploy_nonces: BTreeMap<Address, u64>,
    /// Timestamp of the last committed call.
    pub last_time: Timestamp,
    /// Number of committed calls.
    pub height: u64,
    /// Contracts deployed or mutated since the last commit.
    touched: BTreeSet<Address>,
}

impl ChainState {
    pub fn new(token: Token, native: NativeLedger, genesis_time: Timestamp) -> Self {
        Self {
            token,
            native,
            vesting: VestingRegistry::new(),
            contracts: BTreeMap::new(),
            deploy_nonces: BTreeMap::new(),
            last_time: genesis_time,
            height: 0,
            touched: BTreeSet::new(),
        }
    }

    pub(crate) fn from_parts(
        token: Token,
        native: NativeLedger,
        vesting: VestingRegistry,
        contracts: BTreeMap<Address, Contract>,
        deploy_nonces: BTreeMap<Address, u64>,
        last_time: Timestamp,
        height: u64,
    ) -> Self {
        Self {
            token,
            native,
            vesting,
            contracts,
            deploy_nonces,
            last_time,
            height,
            touched: BTreeSet::new(),
        }
    }

    /// True for addresses that are code rather than external accounts: the
    /// token, every deployed contract and every vesting wallet.
    pub fn is_contract_account(&self, address: &Address) -> bool {
        *address == self.token.address
            || self.contracts.contains_key(address)
            || self.vesting.get(address).is_some()
    }

    /// Contracts deployed or mutated since the last `clear_touched`.
    pub fn touched_contracts(&self) -> impl Iterator<Item = (&Address, &Contract)> {
        self.touched
            .iter()
            .filter_map(move |a| self.contracts.get(a).map(|c| (a, c)))
    }

    pub fn clear_touched(&mut self) {
        self.touched.clear();
    }

    /// Drain the events every component emitted since the last drain.
    pub fn take_events(&mut self) -> Vec<Event> {
        let mut events = self.token.take_events();
        events.append(&mut self.vesting.take_events());
        for address in &self.touched {
            if let Some(contract) = self.contracts.get_mut(address) {
                events.append(&mut contract.take_events());
            }
        }
        events
    }

    pub fn contract(&self, address: &Address) -> Option<&Contract> {
        self.contracts.get(address)
    }

    pub fn contracts(&self) -> impl Iterator<Item = (&Address, &Contract)> {
        self.contracts.iter()
    }

    pub fn crowdsale(&self, address: &Address) -> Result<&Crowdsale, VerdantError> {
        match self.contracts.get(address) {
            Some(Contract::Crowdsale(s)) => Ok(s),
            Some(_) => Err(VerdantError::WrongContractKind { address: *address, expected: "crowdsale" }),
            None => Err(VerdantError::UnknownContract(*address)),
        }
    }

    pub fn vesting_crowdsale(&self, address: &Address) -> Result<&VestingCrowdsale, VerdantError> {
        match self.contracts.get(address) {
            Some(Contract::VestingCrowdsale(s)) => Ok(s),
            Some(_) => Err(VerdantError::WrongContractKind {
                address: *address,
                expected: "vesting crowdsale",
            }),
            None => Err(VerdantError::UnknownContract(*address)),
        }
    }

    pub fn distributor(&self, address: &Address) -> Result<&Distributor, VerdantError> {
        match self.contracts.get(address) {
            Some(Contract::Distributor(d)) => Ok(d),
            Some(_) => Err(VerdantError::WrongContractKind { address: *address, expected: "distributor" }),
            None => Err(VerdantError::UnknownContract(*address)),
        }
    }

    fn next_contract_address(&mut self, deployer: Address) -> Address {
        let nonce = self.deploy_nonces.entry(deployer).or_insert(0);
        let address = contract_address(&deployer, *nonce);
        *nonce += 1;
        address
    }

    fn check_token(&self, token: &Address) -> Result<(), VerdantError> {
        if *token != self.token.address {
            return Err(VerdantError::UnknownContract(*token));
        }
        Ok(())
    }

    fn install(
        &mut self,
        deployer: Address,
        build: impl FnOnce(Address) -> Result<Contract, VerdantError>,
    ) -> Result<Outcome, VerdantError> {
        let address = self.next_contract_address(deployer);
        let contract = build(address)?;
        info!(%deployer, %address, kind = contract.kind(), "contract deployed");
        self.contracts.insert(address, contract);
        self.touched.insert(address);
        Ok(Outcome::Address(address))
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Apply `call` at time `now`.
    ///
    /// Only external accounts may originate calls; contracts and vesting
    /// wallets act solely through the operations that own them.
    pub fn execute(&mut self, call: &Call, now: Timestamp) -> Result<Outcome, VerdantError> {
        if self.is_contract_account(&call.from) {
            return Err(VerdantError::ContractCaller(call.from));
        }
        if let Some(target) = target_contract(&call.action) {
            self.touched.insert(target);
        }
        let ctx = Context::with_value(call.from, call.value, now);

        match &call.action {
            // ── Token ─────────────────────────────────────────────────────────
            Action::Transfer { to, amount } => {
                let split = self.token.transfer(&ctx, *to, *amount)?;
                Ok(Outcome::Amount(split.net))
            }
            Action::TransferFrom { from, to, amount } => {
                let split = self.token.transfer_from(&ctx, *from, *to, *amount)?;
                Ok(Outcome::Amount(split.net))
            }
            Action::Approve { spender, amount } => done(self.token.approve(&ctx, *spender, *amount)),
            Action::IncreaseAllowance { spender, added } => {
                done(self.token.increase_allowance(&ctx, *spender, *added))
            }
            Action::DecreaseAllowance { spender, subtracted } => {
                done(self.token.decrease_allowance(&ctx, *spender, *subtracted))
            }
            Action::Mint { to, amount } => done(self.token.mint(&ctx, *to, *amount)),
            Action::Burn { amount } => done(self.token.burn(&ctx, *amount)),
            Action::BurnFrom { account, amount } => done(self.token.burn_from(&ctx, *account, *amount)),
            Action::AddFeeless { account } => done(self.token.add_feeless(&ctx, *account)),
            Action::RemoveFeeless { account } => done(self.token.remove_feeless(&ctx, *account)),
            Action::AddBlacklisted { account } => done(self.token.add_blacklisted(&ctx, *account)),
            Action::RemoveBlacklisted { account } => done(self.token.remove_blacklisted(&ctx, *account)),
            Action::AddUnrestrictedReceiver { wallet, receiver, limit, removable } => done(
                self.token.add_unrestricted_receiver(&ctx, *wallet, *receiver, *limit, *removable),
            ),
            Action::RemoveUnrestrictedReceiver { wallet } => {
                done(self.token.remove_unrestricted_receiver(&ctx, *wallet))
            }
            Action::Pause => done(self.token.pause(&ctx)),
            Action::Unpause => done(self.token.unpause(&ctx)),
            Action::Snapshot => Ok(Outcome::SnapshotId(self.token.snapshot(&ctx)?)),
            Action::GrantRole { role, account } => done(self.token.grant_role(&ctx, *role, *account)),
            Action::RevokeRole { role, account } => done(self.token.revoke_role(&ctx, *role, *account)),
            Action::SetFeeRates { company, esg_fund, burn } => {
                done(self.token.set_fee_rates(&ctx, *company, *esg_fund, *burn))
            }
            Action::SetRewardWallets { company, esg_fund } => {
                done(self.token.set_reward_wallets(&ctx, *company, *esg_fund))
            }

            // ── Native ────────────────────────────────────────────────────────
            Action::NativeTransfer { to, amount } => done(self.native.transfer(call.from, *to, *amount)),
            Action::SetPaymentRejection { rejecting } => {
                self.native.set_rejecting(call.from, *rejecting);
                Ok(Outcome::Done)
            }

            // ── Deployment ────────────────────────────────────────────────────
            Action::DeployCrowdsale(config) => {
                self.check_token(&config.terms.token)?;
                let config = config.clone();
                self.install(call.from, |addr| Ok(Contract::Crowdsale(Crowdsale::new(addr, config, now)?)))
            }
            Action::DeployVestingCrowdsale(config) => {
                self.check_token(&config.terms.token)?;
                let config = config.clone();
                self.install(call.from, |addr| {
                    Ok(Contract::VestingCrowdsale(VestingCrowdsale::new(addr, config, now)?))
                })
            }
            Action::DeployDistributor(config) => {
                self.check_token(&config.token)?;
                let config = config.clone();
                self.install(call.from, |addr| Ok(Contract::Distributor(Distributor::new(addr, config)?)))
            }

            // ── Crowdsales ────────────────────────────────────────────────────
            Action::BuyTokens { sale, beneficiary } => {
                let tokens = match self.contracts.get_mut(sale) {
                    Some(Contract::Crowdsale(s)) => {
                        s.buy_tokens(&mut self.token, &mut self.native, &ctx, *beneficiary)?
                    }
                    Some(Contract::VestingCrowdsale(s)) => {
                        s.buy_tokens(&mut self.token, &mut self.native, &mut self.vesting, &ctx, *beneficiary)?
                    }
                    Some(_) => {
                        return Err(VerdantError::WrongContractKind { address: *sale, expected: "crowdsale" })
                    }
                    None => return Err(VerdantError::UnknownContract(*sale)),
                };
                Ok(Outcome::Amount(tokens))
            }
            Action::ParticipateOnBehalfOf { sale, beneficiary, wei_amount } => {
                let s = vesting_sale_mut(&mut self.contracts, sale)?;
                let tokens = s.participate_on_behalf_of(
                    &mut self.token,
                    &mut self.native,
                    &mut self.vesting,
                    &ctx,
                    *beneficiary,
                    *wei_amount,
                )?;
                Ok(Outcome::Amount(tokens))
            }
            Action::AddToWhitelist { sale, account } => match self.contracts.get_mut(sale) {
                Some(Contract::Crowdsale(s)) => done(s.add_to_whitelist(&ctx, *account)),
                Some(Contract::VestingCrowdsale(s)) => done(s.add_to_whitelist(&ctx, *account)),
                Some(_) => Err(VerdantError::WrongContractKind { address: *sale, expected: "crowdsale" }),
                None => Err(VerdantError::UnknownContract(*sale)),
            },
            Action::RemoveFromWhitelist { sale, account } => match self.contracts.get_mut(sale) {
                Some(Contract::Crowdsale(s)) => done(s.remove_from_whitelist(&ctx, *account)),
                Some(Contract::VestingCrowdsale(s)) => done(s.remove_from_whitelist(&ctx, *account)),
                Some(_) => Err(VerdantError::WrongContractKind { address: *sale, expected: "crowdsale" }),
                None => Err(VerdantError::UnknownContract(*sale)),
            },
            Action::WithdrawTokens { sale, beneficiary } => {
                let s = vesting_sale_mut(&mut self.contracts, sale)?;
                Ok(Outcome::Amount(s.withdraw_tokens(&mut self.token, &mut self.vesting, &ctx, beneficiary)?))
            }

            // ── Allocations / vesting ─────────────────────────────────────────
            Action::Allocate { distributor, beneficiary, amount } => {
                let d = distributor_mut(&mut self.contracts, distributor)?;
                Ok(Outcome::Address(d.allocate(&mut self.token, &mut self.vesting, &ctx, *beneficiary, *amount)?))
            }
            Action::Withdraw { distributor, beneficiary } => {
                let d = distributor_mut(&mut self.contracts, distributor)?;
                Ok(Outcome::Amount(d.withdraw(&mut self.token, &mut self.vesting, &ctx, beneficiary)?))
            }
            Action::Release { wallet } => Ok(Outcome::Amount(self.vesting.release(&mut self.token, wallet, &ctx)?)),
        }
    }
}

/// Contract whose state `action` may change, if any.
fn target_contract(action: &Action) -> Option<Address> {
    match action {
        Action::BuyTokens { sale, .. }
        | Action::ParticipateOnBehalfOf { sale, .. }
        | Action::AddToWhitelist { sale, .. }
        | Action::RemoveFromWhitelist { sale, .. }
        | Action::WithdrawTokens { sale, .. } => Some(*sale),
        Action::Allocate { distributor, .. } | Action::Withdraw { distributor, .. } => Some(*distributor),
        _ => None,
    }
}

fn done(r: Result<(), VerdantError>) -> Result<Outcome, VerdantError> {
    r.map(|()| Outcome::Done)
}

fn vesting_sale_mut<'a>(
    contracts: &'a mut BTreeMap<Address, Contract>,
    sale: &Address,
) -> Result<&'a mut VestingCrowdsale, VerdantError> {
    match contracts.get_mut(sale) {
        Some(Contract::VestingCrowdsale(s)) => Ok(s),
        Some(_) => Err(VerdantError::WrongContractKind { address: *sale, expected: "vesting crowdsale" }),
        None => Err(VerdantError::UnknownContract(*sale)),
    }
}

fn distributor_mut<'a>(
    contracts: &'a mut BTreeMap<Address, Contract>,
    address: &Address,
) -> Result<&'a mut Distributor, VerdantError> {
    match contracts.get_mut(address) {
        Some(Contract::Distributor(d)) => Ok(d),
        Some(_) => Err(VerdantError::WrongContractKind { address: *address, expected: "distributor" }),
        None => Err(VerdantError::UnknownContract(*address)),
    }
}
