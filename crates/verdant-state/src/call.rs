use serde::{Deserialize, Serialize};
use verdant_allocations::DistributorConfig;
use verdant_core::types::{Address, Balance, Role, Timestamp};
use verdant_sale::{CrowdsaleConfig, VestingCrowdsaleConfig};

// ── Action ────────────────────────────────────────────────────────────────────

/// Every state-changing operation on the Verdant chain is one of these variants.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Action {
    // ── Token: ERC20 surface ─────────────────────────────────────────────────
    Transfer { to: Address, amount: Balance },
    TransferFrom { from: Address, to: Address, amount: Balance },
    Approve { spender: Address, amount: Balance },
    IncreaseAllowance { spender: Address, added: Balance },
    DecreaseAllowance { spender: Address, subtracted: Balance },

    // ── Token: supply ────────────────────────────────────────────────────────
    /// Minter only; at most 10% of supply, at most once per mint interval.
    Mint { to: Address, amount: Balance },
    Burn { amount: Balance },
    BurnFrom { account: Address, amount: Balance },

    // ── Token: policy administration ─────────────────────────────────────────
    AddFeeless { account: Address },
    RemoveFeeless { account: Address },
    AddBlacklisted { account: Address },
    RemoveBlacklisted { account: Address },
    AddUnrestrictedReceiver { wallet: Address, receiver: Address, limit: Balance, removable: bool },
    RemoveUnrestrictedReceiver { wallet: Address },
    Pause,
    Unpause,
    Snapshot,
    GrantRole { role: Role, account: Address },
    RevokeRole { role: Role, account: Address },
    SetFeeRates { company: u16, esg_fund: u16, burn: u16 },
    SetRewardWallets { company: Address, esg_fund: Address },

    // ── Native currency ──────────────────────────────────────────────────────
    NativeTransfer { to: Address, amount: Balance },
    /// The caller starts (or stops) refusing incoming native payments.
    SetPaymentRejection { rejecting: bool },

    // ── Deployment ───────────────────────────────────────────────────────────
    DeployCrowdsale(CrowdsaleConfig),
    DeployVestingCrowdsale(VestingCrowdsaleConfig),
    DeployDistributor(DistributorConfig),

    // ── Crowdsales ───────────────────────────────────────────────────────────
    /// Pays with the call's attached value.
    BuyTokens { sale: Address, beneficiary: Address },
    ParticipateOnBehalfOf { sale: Address, beneficiary: Address, wei_amount: Balance },
    AddToWhitelist { sale: Address, account: Address },
    RemoveFromWhitelist { sale: Address, account: Address },
    WithdrawTokens { sale: Address, beneficiary: Address },

    // ── Allocations / vesting ────────────────────────────────────────────────
    Allocate { distributor: Address, beneficiary: Address, amount: Balance },
    Withdraw { distributor: Address, beneficiary: Address },
    /// Release a vesting wallet directly, whoever created it.
    Release { wallet: Address },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Transfer { .. } => "transfer",
            Action::TransferFrom { .. } => "transfer_from",
            Action::Approve { .. } => "approve",
            Action::IncreaseAllowance { .. } => "increase_allowance",
            Action::DecreaseAllowance { .. } => "decrease_allowance",
            Action::Mint { .. } => "mint",
            Action::Burn { .. } => "burn",
            Action::BurnFrom { .. } => "burn_from",
            Action::AddFeeless { .. } => "add_feeless",
            Action::RemoveFeeless { .. } => "remove_feeless",
            Action::AddBlacklisted { .. } => "add_blacklisted",
            Action::RemoveBlacklisted { .. } => "remove_blacklisted",
            Action::AddUnrestrictedReceiver { .. } => "add_unrestricted_receiver",
            Action::RemoveUnrestrictedReceiver { .. } => "remove_unrestricted_receiver",
            Action::Pause => "pause",
            Action::Unpause => "unpause",
            Action::Snapshot => "snapshot",
            Action::GrantRole { .. } => "grant_role",
            Action::RevokeRole { .. } => "revoke_role",
            Action::SetFeeRates { .. } => "set_fee_rates",
            Action::SetRewardWallets { .. } => "set_reward_wallets",
            Action::NativeTransfer { .. } => "native_transfer",
            Action::SetPaymentRejection { .. } => "set_payment_rejection",
            Action::DeployCrowdsale(_) => "deploy_crowdsale",
            Action::DeployVestingCrowdsale(_) => "deploy_vesting_crowdsale",
            Action::DeployDistributor(_) => "deploy_distributor",
            Action::BuyTokens { .. } => "buy_tokens",
            Action::ParticipateOnBehalfOf { .. } => "participate_on_behalf_of",
            Action::AddToWhitelist { .. } => "add_to_whitelist",
            Action::RemoveFromWhitelist { .. } => "remove_from_whitelist",
            Action::WithdrawTokens { .. } => "withdraw_tokens",
            Action::Allocate { .. } => "allocate",
            Action::Withdraw { .. } => "withdraw",
            Action::Release { .. } => "release",
        }
    }
}

// ── Call ──────────────────────────────────────────────────────────────────────

/// One externally submitted call: caller identity, attached native value and
/// the requested action.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Call {
    pub from: Address,
    /// Native currency attached; only purchases consume it.
    #[serde(default)]
    pub value: Balance,
    pub action: Action,
}

impl Call {
    pub fn new(from: Address, action: Action) -> Self {
        Self { from, value: 0, action }
    }

    pub fn with_value(from: Address, value: Balance, action: Action) -> Self {
        Self { from, value, action }
    }
}

// ── Outcome / Receipt ─────────────────────────────────────────────────────────

/// Return value of a successful call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// Tokens received, purchased or released.
    Amount(Balance),
    /// Address of a newly deployed contract or vesting wallet.
    Address(Address),
    SnapshotId(u64),
}

/// Record of a committed call, persisted in the `receipts` tree.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    pub index: u64,
    pub from: Address,
    pub action: String,
    pub at: Timestamp,
    pub outcome: Outcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_json_defaults_value_to_zero() {
        let to = Address::repeat(2);
        let json = format!(
            r#"{{"from":"{}","action":{{"Transfer":{{"to":"{}","amount":5}}}}}}"#,
            Address::repeat(1),
            to
        );
        let call: Call = serde_json::from_str(&json).unwrap();
        assert_eq!(call.value, 0);
        assert_eq!(call.action, Action::Transfer { to, amount: 5 });
        assert_eq!(call.action.name(), "transfer");
    }
}
