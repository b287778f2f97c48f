//! verdant-genesis
//!
//! Builds the founding Verdant state and writes it straight into a `StateDb`
//! without going through the call engine.
//!
//! The initial supply is minted in one go and split over the three strategic
//! wallets:
//!
//! 1. Company liquidity: 40%
//! 2. Allocations: 25%
//! 3. Crowdsales: 35% (plus any rounding remainder)
//!
//! Every role on the token goes to `GenesisParams::admin`. The three wallets
//! are registered as strategic and therefore throttled from block one.

pub mod params;

pub use params::GenesisParams;

use verdant_core::constants::{
    ALLOCATIONS_PERCENT, COMPANY_LIQUIDITY_PERCENT, MINT_INTERVAL_SECS, UNITS_PER_TOKEN,
};
use verdant_core::error::VerdantError;
use verdant_core::native::NativeLedger;
use verdant_core::types::{Address, Balance};
use tracing::info;
use verdant_state::{ChainState, StateDb};
use verdant_token::{FeeSchedule, StrategicKind, Token, TokenConfig};

const TOKEN_DOMAIN: &[u8] = b"verdant.token.v1";
const GENESIS_META_KEY: &str = "genesis_timestamp";

/// Address the token lives at for a chain administered by `admin`.
pub fn token_address(admin: &Address) -> Address {
    Address::derive(TOKEN_DOMAIN, &[admin.as_bytes()])
}

/// Amounts of the initial split, in base units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenesisSplit {
    pub company_liquidity: Balance,
    pub allocations: Balance,
    pub crowdsales: Balance,
}

impl GenesisSplit {
    pub fn of(supply: Balance) -> Result<Self, VerdantError> {
        let share = |percent: Balance| {
            supply
                .checked_mul(percent)
                .map(|v| v / 100)
                .ok_or(VerdantError::ArithmeticOverflow)
        };
        let company_liquidity = share(COMPANY_LIQUIDITY_PERCENT)?;
        let allocations = share(ALLOCATIONS_PERCENT)?;
        Ok(Self {
            company_liquidity,
            allocations,
            crowdsales: supply - company_liquidity - allocations,
        })
    }

    pub fn total(&self) -> Balance {
        self.company_liquidity + self.allocations + self.crowdsales
    }
}

/// Apply the genesis state to an empty `StateDb` and return it.
///
/// Fails with `GenesisAlreadyApplied` if the database already holds a state.
pub fn apply_genesis(db: &StateDb, params: &GenesisParams) -> Result<ChainState, VerdantError> {
    if db.has_state() || db.get_meta(GENESIS_META_KEY)?.is_some() {
        return Err(VerdantError::GenesisAlreadyApplied);
    }
    info!(
        admin = %params.admin,
        at = %format_timestamp(params.genesis_timestamp),
        "applying Verdant genesis state"
    );

    let supply = params
        .initial_supply_tokens
        .checked_mul(UNITS_PER_TOKEN)
        .ok_or(VerdantError::ArithmeticOverflow)?;
    let split = GenesisSplit::of(supply)?;
    let max_strategic_transfer = params
        .max_strategic_transfer_tokens
        .checked_mul(UNITS_PER_TOKEN)
        .ok_or(VerdantError::ArithmeticOverflow)?;

    // ── 1. Token ─────────────────────────────────────────────────────────────
    let token = Token::new(
        TokenConfig {
            name: params.token_name.clone(),
            symbol: params.token_symbol.clone(),
            address: token_address(&params.admin),
            admin: params.admin,
            fees: FeeSchedule {
                company_rate: params.company_rate,
                esg_fund_rate: params.esg_fund_rate,
                burn_rate: params.burn_rate,
                company_rewards_wallet: params.company_rewards_wallet,
                esg_fund_wallet: params.esg_fund_wallet,
            },
            max_strategic_transfer,
            strategic_cooldown: params.strategic_cooldown_secs,
            mint_interval: MINT_INTERVAL_SECS,
            strategic_wallets: vec![
                (params.company_liquidity_wallet, StrategicKind::CompanyLiquidity),
                (params.allocations_wallet, StrategicKind::Allocations),
                (params.crowdsales_wallet, StrategicKind::Crowdsales),
            ],
            initial_balances: vec![
                (params.company_liquidity_wallet, split.company_liquidity),
                (params.allocations_wallet, split.allocations),
                (params.crowdsales_wallet, split.crowdsales),
            ],
            feeless: params.feeless.clone(),
        },
        params.genesis_timestamp,
    )?;
    info!(
        token = %token.address,
        company_liquidity = split.company_liquidity,
        allocations = split.allocations,
        crowdsales = split.crowdsales,
        "genesis: initial supply minted"
    );

    // ── 2. Native balances ───────────────────────────────────────────────────
    let mut native = NativeLedger::new();
    for (account, amount) in &params.native_balances {
        native.credit(*account, *amount)?;
    }
    info!(accounts = params.native_balances.len(), "genesis: native balances credited");

    // ── Verify supply ────────────────────────────────────────────────────────
    verify_genesis_supply(&token, supply)?;

    let mut state = ChainState::new(token, native, params.genesis_timestamp);
    let events = state.take_events();
    db.commit(&state, None, &events)?;
    db.put_meta(GENESIS_META_KEY, &params.genesis_timestamp.to_be_bytes())?;
    db.flush()?;
    info!("genesis state committed to disk");

    Ok(state)
}

/// Check that the holders' balances add up to exactly the configured supply.
fn verify_genesis_supply(token: &Token, expected: Balance) -> Result<(), VerdantError> {
    let held = token
        .holders()
        .try_fold(0u128, |acc, (_, b)| acc.checked_add(*b))
        .ok_or(VerdantError::ArithmeticOverflow)?;
    for got in [held, token.total_supply()] {
        if got != expected {
            return Err(VerdantError::GenesisSupplyMismatch { expected, got });
        }
    }
    info!(total = expected, "genesis supply verified");
    Ok(())
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}
