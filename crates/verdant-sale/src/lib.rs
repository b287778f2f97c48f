//! verdant-sale
//!
//! Crowdsales selling VERD for native currency:
//!
//! - [`Crowdsale`]: tokens go straight to the beneficiary. The rate is either
//!   flat or decays linearly over the sale window; an optional whitelist turns
//!   it into the whitelisted sale.
//! - [`VestingCrowdsale`]: tokens are deposited into a per-beneficiary vesting
//!   wallet. Comes in a public and a private (whitelisted) flavour and accepts
//!   proxy purchases from a designated purchaser.
//!
//! Both draw tokens from the sale wallet through an allowance on the token,
//! so the allowance doubles as the hard cap.

pub mod crowdsale;
pub mod rate;
pub mod terms;
pub mod vesting_sale;
pub mod whitelist;

pub use crowdsale::{Crowdsale, CrowdsaleConfig};
pub use rate::{Phase, RatePolicy};
pub use terms::{Contributions, SaleTerms};
pub use vesting_sale::{VestingCrowdsale, VestingCrowdsaleConfig};
pub use whitelist::Whitelist;
