pub mod constants;
pub mod error;
pub mod event;
pub mod native;
pub mod types;

pub use constants::*;
pub use error::VerdantError;
pub use event::Event;
pub use native::NativeLedger;
pub use types::*;
