//! End-to-end scenarios: genesis, then calls through the state engine exactly
//! as `verdant apply` submits them.
//!
//! Run with:
//!   cargo test -p verdant-node --test scenarios

use std::collections::BTreeMap;
use std::sync::Arc;

use verdant_allocations::DistributorConfig;
use verdant_core::constants::{MINT_INTERVAL_SECS, UNITS_PER_TOKEN};
use verdant_core::error::VerdantError;
use verdant_core::types::{Address, Balance, Timestamp};
use verdant_genesis::{apply_genesis, token_address, GenesisParams};
use verdant_sale::{CrowdsaleConfig, Phase, RatePolicy, SaleTerms, VestingCrowdsaleConfig};
use verdant_state::{Action, Call, Outcome, Receipt, StateDb, StateEngine};
use verdant_vesting::vesting_wallet_address;

const G: Timestamp = 1_767_225_600;
const DAY: i64 = 86_400;
const U: Balance = UNITS_PER_TOKEN;
/// One unit of native currency.
const ETH: Balance = 1_000_000_000_000_000_000;

fn admin() -> Address { Address::repeat(0xad) }
fn company_liquidity() -> Address { Address::repeat(0x11) }
fn allocations() -> Address { Address::repeat(0x22) }
fn crowdsales() -> Address { Address::repeat(0x33) }
fn purchaser() -> Address { Address::repeat(0x50) }
fn alice() -> Address { Address::repeat(0x01) }
fn bob() -> Address { Address::repeat(0x02) }
fn carol() -> Address { Address::repeat(0x03) }

// ── Harness ───────────────────────────────────────────────────────────────────

struct Chain {
    engine: StateEngine,
}

impl Chain {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("verdant_scenario_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        let db = StateDb::open(&dir).expect("open temp db");

        let mut native_balances = BTreeMap::new();
        for who in [alice(), bob(), carol(), purchaser()] {
            native_balances.insert(who, 10 * ETH);
        }
        let params = GenesisParams {
            admin: admin(),
            company_liquidity_wallet: company_liquidity(),
            allocations_wallet: allocations(),
            crowdsales_wallet: crowdsales(),
            company_rewards_wallet: Address::repeat(0xc0),
            esg_fund_wallet: Address::repeat(0xe5),
            genesis_timestamp: G,
            token_name: "Verdant".into(),
            token_symbol: "VERD".into(),
            initial_supply_tokens: 300_000_000,
            company_rate: 10,
            esg_fund_rate: 10,
            burn_rate: 5,
            max_strategic_transfer_tokens: 1_000_000,
            strategic_cooldown_secs: 30 * DAY,
            feeless: vec![],
            native_balances,
        };
        apply_genesis(&db, &params).expect("genesis");
        Self { engine: StateEngine::open(Arc::new(db)).expect("engine") }
    }

    fn call(&mut self, from: Address, action: Action, now: Timestamp) -> Result<Receipt, VerdantError> {
        self.engine.apply(&Call::new(from, action), now)
    }

    fn ok(&mut self, from: Address, action: Action, now: Timestamp) -> Outcome {
        self.call(from, action, now).expect("call should succeed").outcome
    }

    fn pay(&mut self, from: Address, value: Balance, action: Action, now: Timestamp) -> Result<Outcome, VerdantError> {
        self.engine.apply(&Call::with_value(from, value, action), now).map(|r| r.outcome)
    }

    fn deploy(&mut self, action: Action, now: Timestamp) -> Address {
        match self.ok(admin(), action, now) {
            Outcome::Address(a) => a,
            other => panic!("expected a contract address, got {:?}", other),
        }
    }

    fn balance(&self, who: &Address) -> Balance {
        self.engine.state().token.balance_of(who)
    }
}

fn sale_terms(rate: RatePolicy, opening: Timestamp, closing: Timestamp) -> SaleTerms {
    SaleTerms {
        rate,
        wallet: crowdsales(),
        token: token_address(&admin()),
        opening,
        closing,
        investor_tariff: ETH / 100,
        investor_cap: 5 * ETH,
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn minting_cadence_on_initial_supply() {
    let mut chain = Chain::new("mint");
    assert_eq!(chain.engine.state().token.total_supply(), 300_000_000 * U);

    let err = chain
        .call(admin(), Action::Mint { to: admin(), amount: 1 }, G + 1)
        .unwrap_err();
    assert_eq!(err.to_string(), "Last mint too close");

    let first = G + MINT_INTERVAL_SECS;
    chain.ok(admin(), Action::Mint { to: admin(), amount: 30_000_000 * U }, first);
    assert_eq!(chain.engine.state().token.total_supply(), 330_000_000 * U);

    let err = chain
        .call(admin(), Action::Mint { to: admin(), amount: 1 }, first + 1)
        .unwrap_err();
    assert_eq!(err.to_string(), "Last mint too close");

    let second = first + MINT_INTERVAL_SECS;
    assert_eq!(
        chain.call(admin(), Action::Mint { to: admin(), amount: 33_000_000 * U + 1 }, second),
        Err(VerdantError::MintExceedsLimit { amount: 33_000_000 * U + 1, max: 33_000_000 * U })
    );
    chain.ok(admin(), Action::Mint { to: admin(), amount: 33_000_000 * U }, second);

    let err = chain
        .call(alice(), Action::Mint { to: alice(), amount: 1 }, second + MINT_INTERVAL_SECS)
        .unwrap_err();
    assert!(matches!(err, VerdantError::MissingRole { .. }));
}

#[test]
fn decaying_sale_prices_both_ends_of_the_window() {
    let mut chain = Chain::new("decay");
    let terms = sale_terms(RatePolicy::Decay { initial: 1_000, final_rate: 10 }, G + 10, G + 130);
    let sale = chain.deploy(Action::DeployCrowdsale(CrowdsaleConfig { terms, whitelister: None }), G);
    chain.ok(crowdsales(), Action::Approve { spender: sale, amount: 100_000 * U }, G);
    chain.ok(admin(), Action::AddFeeless { account: sale }, G);

    let buy = |beneficiary| Action::BuyTokens { sale, beneficiary };
    assert_eq!(chain.pay(alice(), ETH, buy(alice()), G + 9), Err(VerdantError::NotOpen));

    assert_eq!(chain.pay(alice(), ETH, buy(alice()), G + 10), Ok(Outcome::Amount(1_000 * U)));
    assert_eq!(chain.pay(bob(), ETH, buy(bob()), G + 70), Ok(Outcome::Amount(505 * U)));
    assert_eq!(chain.pay(alice(), ETH, buy(alice()), G + 130), Ok(Outcome::Amount(10 * U)));
    assert_eq!(chain.pay(carol(), ETH, buy(carol()), G + 131), Err(VerdantError::NotOpen));

    let state = chain.engine.state();
    assert_eq!(chain.balance(&alice()), 1_010 * U);
    assert_eq!(chain.balance(&bob()), 505 * U);
    let s = state.crowdsale(&sale).unwrap();
    assert_eq!(s.wei_raised(), 3 * ETH);
    assert_eq!(s.contribution(&alice()), 2 * ETH);
    assert_eq!(state.native.balance_of(&crowdsales()), 3 * ETH);
    assert_eq!(s.remaining_tokens(&state.token), (100_000 - 1_515) * U);
    assert_eq!(s.phase(&state.token, G + 131), Phase::Closed);
}

#[test]
fn rejected_proceeds_roll_the_purchase_back() {
    let mut chain = Chain::new("reject");
    let terms = sale_terms(RatePolicy::Flat { rate: 100 }, G, G + 1_000);
    let sale = chain.deploy(Action::DeployCrowdsale(CrowdsaleConfig { terms, whitelister: None }), G);
    chain.ok(crowdsales(), Action::Approve { spender: sale, amount: 100_000 * U }, G);
    chain.ok(crowdsales(), Action::SetPaymentRejection { rejecting: true }, G);

    let height = chain.engine.state().height;
    let outcome = chain.pay(alice(), ETH, Action::BuyTokens { sale, beneficiary: alice() }, G + 5);
    assert_eq!(outcome, Err(VerdantError::NativeTransferRejected(crowdsales())));

    let state = chain.engine.state();
    assert_eq!(state.height, height);
    assert_eq!(state.native.balance_of(&alice()), 10 * ETH);
    assert_eq!(chain.balance(&alice()), 0);
    assert_eq!(state.crowdsale(&sale).unwrap().wei_raised(), 0);
    assert_eq!(state.token.allowance(&crowdsales(), &sale), 100_000 * U);

    chain.ok(crowdsales(), Action::SetPaymentRejection { rejecting: false }, G + 6);
    let outcome = chain.pay(alice(), ETH, Action::BuyTokens { sale, beneficiary: alice() }, G + 7);
    assert_eq!(outcome, Ok(Outcome::Amount(100 * U)));
}

#[test]
fn allocation_budget_is_spent_exactly_once() {
    let mut chain = Chain::new("allocations");
    let distributor = chain.deploy(
        Action::DeployDistributor(DistributorConfig {
            token: token_address(&admin()),
            wallet: allocations(),
            admin: admin(),
            cliff: 30 * DAY,
            vesting_duration: 300 * DAY,
        }),
        G,
    );
    chain.ok(allocations(), Action::Approve { spender: distributor, amount: 1_000 * U }, G);
    chain.ok(admin(), Action::AddFeeless { account: distributor }, G);

    let allocate = |beneficiary, amount| Action::Allocate { distributor, beneficiary, amount };
    let alice_wallet = chain.ok(admin(), allocate(alice(), 400 * U), G);
    assert_eq!(alice_wallet, Outcome::Address(vesting_wallet_address(&distributor, &alice())));
    chain.ok(admin(), allocate(bob(), 600 * U), G);

    let err = chain.call(admin(), allocate(carol(), 1), G).unwrap_err();
    assert_eq!(err.to_string(), "Amount too large");
    let err = chain.call(admin(), allocate(alice(), 1), G).unwrap_err();
    assert_eq!(err.to_string(), "Vesting wallet exists");

    let d = chain.engine.state().distributor(&distributor).unwrap();
    assert_eq!(d.total_allocated(), 1_000 * U);
    assert_eq!(d.remaining_budget(&chain.engine.state().token), 0);
    assert_eq!(chain.balance(&allocations()), 75_000_000 * U - 1_000 * U);

    // Half-way through the linear part: 150 of 300 days after the cliff.
    let withdraw = Action::Withdraw { distributor, beneficiary: alice() };
    assert_eq!(chain.ok(carol(), withdraw.clone(), G + 29 * DAY), Outcome::Amount(0));
    assert_eq!(chain.ok(carol(), withdraw.clone(), G + 180 * DAY), Outcome::Amount(200 * U));
    // The vesting wallet is not feeless: 2.5% goes to fees on release.
    assert_eq!(chain.balance(&alice()), 195 * U);
    assert_eq!(chain.ok(alice(), withdraw, G + 180 * DAY), Outcome::Amount(0));
}

#[test]
fn private_vesting_sale_with_proxy_purchases() {
    let mut chain = Chain::new("vesting_sale");
    let terms = sale_terms(RatePolicy::Flat { rate: 100 }, G + 60, G + 30 * DAY);
    let sale = chain.deploy(
        Action::DeployVestingCrowdsale(VestingCrowdsaleConfig {
            terms,
            purchaser: purchaser(),
            cliff: 10 * DAY,
            vesting_duration: 100 * DAY,
            whitelister: Some(admin()),
        }),
        G,
    );
    chain.ok(crowdsales(), Action::Approve { spender: sale, amount: 10_000 * U }, G);
    chain.ok(admin(), Action::AddFeeless { account: sale }, G);
    chain.ok(admin(), Action::AddToWhitelist { sale, account: alice() }, G);

    let open = G + 60;
    let proxy = |beneficiary| Action::ParticipateOnBehalfOf { sale, beneficiary, wei_amount: ETH };
    assert_eq!(chain.call(alice(), proxy(alice()), open), Err(VerdantError::OnlyPurchaser));
    assert_eq!(
        chain.call(purchaser(), proxy(bob()), open),
        Err(VerdantError::BeneficiaryNotWhitelisted(bob()))
    );
    assert_eq!(chain.ok(purchaser(), proxy(alice()), open), Outcome::Amount(100 * U));
    assert_eq!(
        chain.pay(alice(), ETH, Action::BuyTokens { sale, beneficiary: alice() }, open),
        Ok(Outcome::Amount(100 * U))
    );

    let state = chain.engine.state();
    let wallet = state.vesting_crowdsale(&sale).unwrap().vesting_wallet(&alice()).unwrap();
    assert_eq!(wallet, vesting_wallet_address(&sale, &alice()));
    assert_eq!(chain.balance(&wallet), 200 * U);
    assert_eq!(chain.balance(&alice()), 0);
    assert_eq!(state.native.balance_of(&purchaser()), 9 * ETH);
    assert_eq!(state.native.balance_of(&alice()), 9 * ETH);

    chain.ok(admin(), Action::AddFeeless { account: wallet }, open);
    let withdraw = Action::WithdrawTokens { sale, beneficiary: alice() };
    assert_eq!(chain.ok(bob(), withdraw.clone(), open + 9 * DAY), Outcome::Amount(0));
    assert_eq!(chain.ok(bob(), withdraw, open + 110 * DAY), Outcome::Amount(200 * U));
    assert_eq!(chain.balance(&alice()), 200 * U);
    assert_eq!(chain.balance(&wallet), 0);
}

#[test]
fn strategic_wallet_cooldown_after_cap() {
    let mut chain = Chain::new("throttle");
    let cap = 1_000_000 * U;

    chain.ok(company_liquidity(), Action::Transfer { to: alice(), amount: cap - 1 }, G + 1);
    // Crossing transfer goes through and starts the cooldown.
    chain.ok(company_liquidity(), Action::Transfer { to: alice(), amount: 2 }, G + 2);
    assert!(chain.engine.state().token.company_liquidity_transfers_are_restricted(G + 3));

    let err = chain
        .call(company_liquidity(), Action::Transfer { to: bob(), amount: 1 }, G + 3)
        .unwrap_err();
    assert_eq!(err.to_string(), "Last max transfer too close");

    let after = G + 2 + 30 * DAY;
    chain.ok(company_liquidity(), Action::Transfer { to: bob(), amount: 1_000 * U }, after);
    assert_eq!(chain.balance(&bob()), 975 * U);
}

#[test]
fn vesting_wallets_and_contracts_cannot_act_as_callers() {
    let mut chain = Chain::new("contract_callers");
    let distributor = chain.deploy(
        Action::DeployDistributor(DistributorConfig {
            token: token_address(&admin()),
            wallet: allocations(),
            admin: admin(),
            cliff: 30 * DAY,
            vesting_duration: 300 * DAY,
        }),
        G,
    );
    chain.ok(allocations(), Action::Approve { spender: distributor, amount: 2_000 * U }, G);
    chain.ok(admin(), Action::AddFeeless { account: distributor }, G);
    chain.ok(admin(), Action::Allocate { distributor, beneficiary: alice(), amount: 1_000 * U }, G);
    let wallet = vesting_wallet_address(&distributor, &alice());

    let drain = Action::Transfer { to: carol(), amount: 1_000 * U };
    assert_eq!(chain.call(wallet, drain, G + DAY), Err(VerdantError::ContractCaller(wallet)));
    let spend = Action::TransferFrom { from: allocations(), to: bob(), amount: 500 * U };
    assert_eq!(chain.call(distributor, spend, G + DAY), Err(VerdantError::ContractCaller(distributor)));
    let token = token_address(&admin());
    assert_eq!(
        chain.call(token, Action::Approve { spender: bob(), amount: 1 }, G + DAY),
        Err(VerdantError::ContractCaller(token))
    );

    assert_eq!(chain.balance(&wallet), 1_000 * U);
    assert_eq!(chain.balance(&carol()), 0);
    assert_eq!(chain.balance(&bob()), 0);
    assert_eq!(chain.engine.state().token.allowance(&allocations(), &distributor), 1_000 * U);
    assert_eq!(chain.ok(carol(), Action::Release { wallet }, G + DAY), Outcome::Amount(0));
}
