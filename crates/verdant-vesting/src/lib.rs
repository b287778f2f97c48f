//! verdant-vesting
//!
//! Per-beneficiary vesting wallets. Each wallet is an independent record in
//! the [`VestingRegistry`] arena, addressed deterministically from the
//! contract that created it and the beneficiary. Its tokens live on the token
//! ledger under the wallet's address.

pub mod registry;
pub mod schedule;

pub use registry::{vesting_wallet_address, VestingRegistry, VestingWallet};
pub use schedule::vested_amount;
