//! FundMe Ledger
//!
//! Crowdfunding ledger that accepts contributions worth at least a minimum
//! USD amount, priced through an external feed, and lets its owner withdraw
//! everything it holds.

pub mod contract;
pub mod config;
pub mod error;
pub mod events;
pub mod transfer;

pub use contract::{CallContext, FundMe};
pub use config::{FundMeConfig, MINIMUM_USD};
pub use error::{FundMeError, FundMeResult};
pub use events::{EventKind, EventLog, LedgerEvent};
pub use transfer::{TransferError, ValueTransfer};
