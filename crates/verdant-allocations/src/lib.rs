//! verdant-allocations
//!
//! Admin-gated batch granter. Each beneficiary gets exactly one vesting
//! wallet, funded from the allocations wallet through an allowance to the
//! distributor.

pub mod distributor;

pub use distributor::{Distributor, DistributorConfig};
