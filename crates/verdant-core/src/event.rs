use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, Role, Timestamp};

/// Observable outcome of a committed state change.
///
/// Every component appends to its own event log; a rolled-back call leaves no
/// events behind because the log is part of the staged state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // ── Token ────────────────────────────────────────────────────────────────
    Transfer { from: Address, to: Address, amount: Balance },
    Approval { owner: Address, spender: Address, amount: Balance },
    FeeCollected { from: Address, company: Balance, esg_fund: Balance, burned: Balance },
    Mint { to: Address, amount: Balance },
    Burn { from: Address, amount: Balance },
    TransferCapReached { wallet: Address, at: Timestamp },
    FeelessAdded { account: Address },
    FeelessRemoved { account: Address },
    Blacklisted { account: Address },
    Unblacklisted { account: Address },
    UnrestrictedReceiverSet { wallet: Address, receiver: Address, limit: Balance, removable: bool },
    UnrestrictedReceiverRemoved { wallet: Address },
    Paused { by: Address },
    Unpaused { by: Address },
    Snapshot { id: u64 },
    RoleGranted { role: Role, account: Address },
    RoleRevoked { role: Role, account: Address },
    FeeRatesUpdated { company: u16, esg_fund: u16, burn: u16 },
    RewardWalletsUpdated { company: Address, esg_fund: Address },

    // ── Crowdsales ───────────────────────────────────────────────────────────
    TokensPurchased {
        sale: Address,
        purchaser: Address,
        beneficiary: Address,
        value: Balance,
        amount: Balance,
    },
    WhitelistAdded { sale: Address, account: Address },
    WhitelistRemoved { sale: Address, account: Address },

    // ── Vesting / allocations ────────────────────────────────────────────────
    VestingWalletCreated {
        wallet: Address,
        beneficiary: Address,
        start: Timestamp,
        cliff: i64,
        duration: i64,
    },
    TokensReleased { wallet: Address, beneficiary: Address, amount: Balance },
    Allocated { distributor: Address, beneficiary: Address, wallet: Address, amount: Balance },
}
