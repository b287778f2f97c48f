pub mod call;
pub mod chain;
pub mod db;
pub mod engine;

pub use call::{Action, Call, Outcome, Receipt};
pub use chain::{contract_address, ChainState, Contract};
pub use db::StateDb;
pub use engine::StateEngine;
