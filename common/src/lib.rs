//! FundMe Common Types
//!
//! Shared types used across the FundMe workspace: account addresses,
//! transaction identifiers and the 18-decimal fixed-point amounts the
//! ledger and price oracle exchange.

pub mod identifiers;
pub mod monetary;
pub mod error;

pub use identifiers::*;
pub use monetary::*;
pub use error::*;
