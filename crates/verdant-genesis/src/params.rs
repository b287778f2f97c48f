use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use verdant_core::constants::{
    DEFAULT_BURN_RATE, DEFAULT_COMPANY_RATE, DEFAULT_ESG_FUND_RATE, DEFAULT_INITIAL_SUPPLY_TOKENS,
    DEFAULT_MAX_STRATEGIC_TRANSFER_TOKENS, DEFAULT_STRATEGIC_COOLDOWN_SECS,
};
use verdant_core::error::VerdantError;
use verdant_core::types::{Address, Balance, Timestamp};

/// Launch parameters of a Verdant chain, read from a JSON file by `verdant init`.
///
/// Only the addresses and the timestamp are mandatory; everything else falls
/// back to the protocol defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisParams {
    /// Receives every token role at genesis.
    pub admin: Address,
    pub company_liquidity_wallet: Address,
    pub allocations_wallet: Address,
    pub crowdsales_wallet: Address,
    pub company_rewards_wallet: Address,
    pub esg_fund_wallet: Address,
    pub genesis_timestamp: Timestamp,

    #[serde(default = "default_name")]
    pub token_name: String,
    #[serde(default = "default_symbol")]
    pub token_symbol: String,
    /// Whole tokens; scaled by 10^18 at genesis.
    #[serde(default = "default_supply")]
    pub initial_supply_tokens: u128,
    #[serde(default = "default_company_rate")]
    pub company_rate: u16,
    #[serde(default = "default_esg_fund_rate")]
    pub esg_fund_rate: u16,
    #[serde(default = "default_burn_rate")]
    pub burn_rate: u16,
    /// Whole tokens.
    #[serde(default = "default_max_strategic_transfer")]
    pub max_strategic_transfer_tokens: u128,
    #[serde(default = "default_cooldown")]
    pub strategic_cooldown_secs: i64,
    /// Accounts exempt from fees and throttling from the start.
    #[serde(default)]
    pub feeless: Vec<Address>,
    /// Native currency handed out at genesis (base units).
    #[serde(default)]
    pub native_balances: BTreeMap<Address, Balance>,
}

fn default_name() -> String {
    "Verdant".to_string()
}

fn default_symbol() -> String {
    "VERD".to_string()
}

fn default_supply() -> u128 {
    DEFAULT_INITIAL_SUPPLY_TOKENS
}

fn default_company_rate() -> u16 {
    DEFAULT_COMPANY_RATE
}

fn default_esg_fund_rate() -> u16 {
    DEFAULT_ESG_FUND_RATE
}

fn default_burn_rate() -> u16 {
    DEFAULT_BURN_RATE
}

fn default_max_strategic_transfer() -> u128 {
    DEFAULT_MAX_STRATEGIC_TRANSFER_TOKENS
}

fn default_cooldown() -> i64 {
    DEFAULT_STRATEGIC_COOLDOWN_SECS
}

impl GenesisParams {
    pub fn from_json(json: &str) -> Result<Self, VerdantError> {
        serde_json::from_str(json).map_err(|e| VerdantError::Serialization(e.to_string()))
    }
}
