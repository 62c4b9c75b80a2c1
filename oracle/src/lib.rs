//! FundMe Price Oracle
//!
//! Native-currency to USD price feeds and the fixed-point conversion the
//! ledger uses to enforce its minimum contribution.
//!
//! # Example
//!
//! ```rust,ignore
//! use fundme_oracle::{FeedGuard, MockV3Aggregator, PriceConverter};
//! use fundme_common::Wei;
//!
//! let feed = MockV3Aggregator::eth_usd();
//! let usd = PriceConverter::get_conversion_rate(
//!     Wei::from_ether(1),
//!     &feed,
//!     &FeedGuard::default(),
//!     chrono::Utc::now(),
//! )?;
//! ```

pub mod feed;
pub mod conversion;
pub mod error;

pub use feed::{PriceFeed, RoundData};
#[cfg(any(test, feature = "mock"))]
pub use feed::{mock, MockV3Aggregator};
pub use conversion::{FeedGuard, PriceConverter, Quote, DEFAULT_MAX_PRICE_AGE_SECS};
pub use error::{OracleError, OracleResult};
