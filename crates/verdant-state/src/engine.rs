use std::sync::Arc;

use tracing::{info, warn};
use verdant_core::error::VerdantError;
use verdant_core::types::Timestamp;

use crate::call::{Call, Receipt};
use crate::chain::ChainState;
use crate::db::StateDb;

// ── StateEngine ───────────────────────────────────────────────────────────────

/// The state transition engine.
///
/// Executes calls against the in-memory chain state and persists every
/// committed result. Each `apply` call is atomic: a failing call leaves both
/// memory and disk exactly as they were.
pub struct StateEngine {
    pub db: Arc<StateDb>,
    state: ChainState,
}

impl StateEngine {
    /// Load the committed state from `db`. Genesis must have been applied.
    pub fn open(db: Arc<StateDb>) -> Result<Self, VerdantError> {
        let state = db.get_state()?.ok_or(VerdantError::NotInitialised)?;
        Ok(Self { db, state })
    }

    pub fn state(&self) -> &ChainState {
        &self.state
    }

    /// Execute `call` at time `now` and commit it. Returns the receipt.
    pub fn apply(&mut self, call: &Call, now: Timestamp) -> Result<Receipt, VerdantError> {
        // ── Clock check ───────────────────────────────────────────────────────
        if now < self.state.last_time {
            return Err(VerdantError::ClockWentBackwards { last: self.state.last_time, now });
        }

        // ── Execute on a staged copy ──────────────────────────────────────────
        let mut staged = self.state.clone();
        let outcome = match staged.execute(call, now) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(from = %call.from, action = call.action.name(), error = %e, "call reverted");
                return Err(e);
            }
        };
        staged.last_time = now;
        staged.height += 1;

        let receipt = Receipt {
            index: staged.height,
            from: call.from,
            action: call.action.name().to_string(),
            at: now,
            outcome,
        };

        // ── Commit ────────────────────────────────────────────────────────────
        let events = staged.take_events();
        self.db.commit(&staged, Some(&receipt), &events)?;
        self.db.flush()?;
        staged.clear_touched();
        self.state = staged;

        info!(
            height = receipt.index,
            from = %call.from,
            action = %receipt.action,
            events = events.len(),
            "applied call"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{Action, Outcome};
    use crate::chain::contract_address;
    use verdant_core::constants::MINT_INTERVAL_SECS;
    use verdant_core::event::Event;
    use verdant_core::native::NativeLedger;
    use verdant_core::types::Address;
    use verdant_sale::{CrowdsaleConfig, RatePolicy, SaleTerms};
    use verdant_token::{FeeSchedule, Token, TokenConfig};

    const T0: Timestamp = 1_700_000_000;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn temp_db(name: &str) -> StateDb {
        let dir = std::env::temp_dir().join(format!("verdant_engine_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        StateDb::open(&dir).expect("open temp db")
    }

    fn token_addr() -> Address { Address::repeat(0x70) }
    fn admin() -> Address { Address::repeat(0xad) }
    fn wallet() -> Address { Address::repeat(0x5a) }
    fn alice() -> Address { Address::repeat(0x01) }
    fn bob() -> Address { Address::repeat(0x02) }

    fn genesis_state() -> ChainState {
        let token = Token::new(
            TokenConfig {
                name: "Verdant".into(),
                symbol: "VERD".into(),
                address: token_addr(),
                admin: admin(),
                fees: FeeSchedule {
                    company_rate: 10,
                    esg_fund_rate: 10,
                    burn_rate: 5,
                    company_rewards_wallet: Address::repeat(0xc0),
                    esg_fund_wallet: Address::repeat(0xe5),
                },
                max_strategic_transfer: 0,
                strategic_cooldown: 0,
                mint_interval: MINT_INTERVAL_SECS,
                strategic_wallets: vec![],
                initial_balances: vec![(wallet(), 1_000_000), (alice(), 10_000)],
                feeless: vec![],
            },
            T0,
        )
        .unwrap();
        let mut native = NativeLedger::new();
        native.credit(alice(), 1_000).unwrap();
        ChainState::new(token, native, T0)
    }

    fn seeded_engine(name: &str) -> StateEngine {
        let db = temp_db(name);
        db.commit(&genesis_state(), None, &[]).unwrap();
        StateEngine::open(Arc::new(db)).unwrap()
    }

    fn sale_config() -> CrowdsaleConfig {
        CrowdsaleConfig {
            terms: SaleTerms {
                rate: RatePolicy::Flat { rate: 10 },
                wallet: wallet(),
                token: token_addr(),
                opening: T0 + 10,
                closing: T0 + 1_000,
                investor_tariff: 1,
                investor_cap: 1_000,
            },
            whitelister: None,
        }
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[test]
    fn open_requires_genesis() {
        let db = Arc::new(temp_db("uninit"));
        assert!(matches!(StateEngine::open(db), Err(VerdantError::NotInitialised)));
    }

    #[test]
    fn transfer_commits_and_emits_receipt() {
        let mut engine = seeded_engine("transfer");
        let receipt = engine
            .apply(&Call::new(alice(), Action::Transfer { to: bob(), amount: 1_000 }), T0 + 1)
            .unwrap();
        // 2.5% fee: 10 + 10 + 5.
        assert_eq!(receipt.outcome, Outcome::Amount(975));
        assert_eq!(receipt.index, 1);
        assert_eq!(engine.state().token.balance_of(&bob()), 975);
        assert_eq!(engine.state().height, 1);
        assert_eq!(engine.db.get_receipt(1).unwrap(), Some(receipt));
    }

    #[test]
    fn failed_call_leaves_state_untouched() {
        let mut engine = seeded_engine("rollback");
        let sale = engine
            .apply(&Call::new(admin(), Action::DeployCrowdsale(sale_config())), T0)
            .unwrap();
        let Outcome::Address(sale) = sale.outcome else { panic!("expected address") };
        engine
            .apply(&Call::new(wallet(), Action::Approve { spender: sale, amount: 500_000 }), T0)
            .unwrap();
        engine
            .apply(&Call::new(wallet(), Action::SetPaymentRejection { rejecting: true }), T0)
            .unwrap();

        let before = engine.state().clone();
        let buy = Call::with_value(alice(), 100, Action::BuyTokens { sale, beneficiary: alice() });
        assert_eq!(
            engine.apply(&buy, T0 + 20),
            Err(VerdantError::NativeTransferRejected(wallet()))
        );
        assert_eq!(engine.state().native.balance_of(&alice()), before.native.balance_of(&alice()));
        assert_eq!(engine.state().token.balance_of(&alice()), 10_000);
        assert_eq!(engine.state().crowdsale(&sale).unwrap().wei_raised(), 0);
        assert_eq!(engine.state().height, before.height);
        assert_eq!(engine.state().last_time, before.last_time);
        assert_eq!(engine.db.receipts().unwrap().len(), 3);
    }

    #[test]
    fn clock_may_not_run_backwards() {
        let mut engine = seeded_engine("clock");
        engine
            .apply(&Call::new(alice(), Action::Approve { spender: bob(), amount: 1 }), T0 + 100)
            .unwrap();
        assert_eq!(
            engine.apply(&Call::new(alice(), Action::Approve { spender: bob(), amount: 2 }), T0 + 99),
            Err(VerdantError::ClockWentBackwards { last: T0 + 100, now: T0 + 99 })
        );
    }

    #[test]
    fn state_survives_reopen() {
        let dir = std::env::temp_dir().join("verdant_engine_test_reopen");
        let _ = std::fs::remove_dir_all(&dir);
        {
            let db = StateDb::open(&dir).unwrap();
            db.commit(&genesis_state(), None, &[]).unwrap();
            let mut engine = StateEngine::open(Arc::new(db)).unwrap();
            engine
                .apply(&Call::new(alice(), Action::Burn { amount: 4_000 }), T0 + 5)
                .unwrap();
        }
        let engine = StateEngine::open(Arc::new(StateDb::open(&dir).unwrap())).unwrap();
        assert_eq!(engine.state().token.balance_of(&alice()), 6_000);
        assert_eq!(engine.state().token.total_supply(), 1_006_000);
        assert_eq!(engine.state().last_time, T0 + 5);
    }

    #[test]
    fn deploy_addresses_follow_deployer_nonce() {
        let mut engine = seeded_engine("deploy_nonce");
        let first = engine
            .apply(&Call::new(admin(), Action::DeployCrowdsale(sale_config())), T0)
            .unwrap();
        let second = engine
            .apply(&Call::new(admin(), Action::DeployCrowdsale(sale_config())), T0)
            .unwrap();
        assert_eq!(first.outcome, Outcome::Address(contract_address(&admin(), 0)));
        assert_eq!(second.outcome, Outcome::Address(contract_address(&admin(), 1)));

        let mut foreign = sale_config();
        foreign.terms.token = Address::repeat(0x99);
        assert_eq!(
            engine.apply(&Call::new(admin(), Action::DeployCrowdsale(foreign)), T0),
            Err(VerdantError::UnknownContract(Address::repeat(0x99)))
        );
        // A failed deployment does not consume a nonce.
        let third = engine
            .apply(&Call::new(admin(), Action::DeployCrowdsale(sale_config())), T0)
            .unwrap();
        assert_eq!(third.outcome, Outcome::Address(contract_address(&admin(), 2)));
    }

    #[test]
    fn events_are_stored_per_call() {
        let mut engine = seeded_engine("events");
        engine
            .apply(&Call::new(alice(), Action::Transfer { to: bob(), amount: 1_000 }), T0 + 1)
            .unwrap();
        let events = engine.db.events_of(1).unwrap();
        assert_eq!(events[0], Event::Transfer { from: alice(), to: bob(), amount: 975 });
        assert!(events.iter().any(|e| matches!(e, Event::FeeCollected { burned: 5, .. })));
        assert!(engine.state().token.events().is_empty());
        assert!(engine.db.events_of(2).unwrap().is_empty());
    }

    #[test]
    fn stored_state_does_not_grow_with_history() {
        let mut engine = seeded_engine("history");
        engine
            .apply(&Call::new(alice(), Action::Approve { spender: bob(), amount: 1 }), T0 + 1)
            .unwrap();
        let size = engine.db.state_bytes().unwrap();
        for amount in 2..=201u128 {
            engine
                .apply(&Call::new(alice(), Action::Approve { spender: bob(), amount }), T0 + 1)
                .unwrap();
        }
        assert_eq!(engine.db.state_bytes().unwrap(), size);
        assert_eq!(engine.db.receipts().unwrap().len(), 201);
        assert_eq!(
            engine.db.events_of(201).unwrap(),
            vec![Event::Approval { owner: alice(), spender: bob(), amount: 201 }]
        );
    }

    #[test]
    fn contracts_survive_reopen() {
        let dir = std::env::temp_dir().join("verdant_engine_test_contract_reopen");
        let _ = std::fs::remove_dir_all(&dir);
        let sale = {
            let db = StateDb::open(&dir).unwrap();
            db.commit(&genesis_state(), None, &[]).unwrap();
            let mut engine = StateEngine::open(Arc::new(db)).unwrap();
            let receipt = engine
                .apply(&Call::new(admin(), Action::DeployCrowdsale(sale_config())), T0)
                .unwrap();
            let Outcome::Address(sale) = receipt.outcome else { panic!("expected address") };
            engine
                .apply(&Call::new(wallet(), Action::Approve { spender: sale, amount: 500_000 }), T0)
                .unwrap();
            engine
                .apply(
                    &Call::with_value(alice(), 100, Action::BuyTokens { sale, beneficiary: alice() }),
                    T0 + 20,
                )
                .unwrap();
            sale
        };
        let engine = StateEngine::open(Arc::new(StateDb::open(&dir).unwrap())).unwrap();
        assert_eq!(engine.state().crowdsale(&sale).unwrap().wei_raised(), 100);
        assert_eq!(engine.state().token.balance_of(&alice()), 10_975);
        assert_eq!(engine.state().height, 3);
    }

    #[test]
    fn contract_accounts_cannot_originate_calls() {
        let mut engine = seeded_engine("contract_caller");
        let receipt = engine
            .apply(&Call::new(admin(), Action::DeployCrowdsale(sale_config())), T0)
            .unwrap();
        let Outcome::Address(sale) = receipt.outcome else { panic!("expected address") };
        engine
            .apply(&Call::new(wallet(), Action::Approve { spender: sale, amount: 500_000 }), T0)
            .unwrap();

        let spend = Action::TransferFrom { from: wallet(), to: bob(), amount: 1_000 };
        assert_eq!(
            engine.apply(&Call::new(sale, spend), T0 + 1),
            Err(VerdantError::ContractCaller(sale))
        );
        assert_eq!(
            engine.apply(&Call::new(token_addr(), Action::Approve { spender: bob(), amount: 1 }), T0 + 1),
            Err(VerdantError::ContractCaller(token_addr()))
        );
        assert_eq!(engine.state().token.balance_of(&bob()), 0);
        assert_eq!(engine.state().token.allowance(&wallet(), &sale), 500_000);
    }
}
