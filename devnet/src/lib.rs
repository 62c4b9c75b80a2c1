//! FundMe Development Chain
//!
//! Deterministic accounts, a mock ETH/USD feed and a deployed FundMe,
//! executing transactions one at a time with revert semantics.

pub mod accounts;
pub mod chain;
pub mod config;
pub mod error;

pub use accounts::{contract_address, derive_address, DevAccount, DevAccounts};
pub use chain::{Deployment, DevChain, Receipt, TxKind};
pub use config::{answer_from_usd, ChainConfig};
pub use error::{ChainError, ChainResult};
