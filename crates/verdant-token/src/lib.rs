//! verdant-token
//!
//! The authoritative token ledger and its transfer-time policy engine:
//! fee-on-transfer, strategic-wallet outflow throttling, time-gated minting,
//! blacklist and feeless registries, pause and balance snapshots.

pub mod fees;
pub mod roles;
pub mod snapshot;
pub mod throttle;
pub mod token;

pub use fees::{FeeSchedule, FeeSplit};
pub use roles::AccessControl;
pub use snapshot::Snapshots;
pub use throttle::{StrategicKind, StrategicWallet, Throttle};
pub use token::{Token, TokenConfig};
