//! Ledger configuration.

use chrono::Duration;
use fundme_common::Usd;
use fundme_oracle::{FeedGuard, DEFAULT_MAX_PRICE_AGE_SECS};

/// Minimum contribution: $50 with 18 decimals.
pub const MINIMUM_USD: Usd = Usd::from_dollars(50);

/// Configuration fixed when a ledger is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundMeConfig {
    /// Minimum USD-equivalent a contribution must reach.
    pub minimum_usd: Usd,
    /// Maximum age of the price round used for a contribution.
    /// `None` accepts rounds of any age.
    pub max_price_age: Option<Duration>,
}

impl Default for FundMeConfig {
    fn default() -> Self {
        Self {
            minimum_usd: MINIMUM_USD,
            max_price_age: Duration::try_seconds(DEFAULT_MAX_PRICE_AGE_SECS),
        }
    }
}

impl FundMeConfig {
    /// Load configuration from environment variables.
    ///
    /// `FUNDME_MINIMUM_USD` takes a dollar amount such as `"50"`.
    /// `FUNDME_MAX_PRICE_AGE_SECS` takes seconds; `0` disables the check.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(minimum) = std::env::var("FUNDME_MINIMUM_USD") {
            if let Ok(minimum) = Usd::parse(&minimum) {
                config.minimum_usd = minimum;
            }
        }

        if let Ok(age) = std::env::var("FUNDME_MAX_PRICE_AGE_SECS") {
            if let Some(max_age) = parse_max_age(&age) {
                config.max_price_age = max_age;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.minimum_usd == Usd::ZERO {
            return Err("Minimum USD contribution cannot be 0".to_string());
        }

        if let Some(age) = self.max_price_age {
            if age <= Duration::zero() {
                return Err("Max price age must be positive".to_string());
            }
        }

        Ok(())
    }

    /// Round validation policy derived from this configuration.
    pub fn feed_guard(&self) -> FeedGuard {
        FeedGuard::new(self.max_price_age)
    }
}

/// Parse a max price age in seconds. `Some(None)` disables the check;
/// `None` means the value is unusable and should be ignored.
fn parse_max_age(value: &str) -> Option<Option<Duration>> {
    let secs = value.trim().parse::<i64>().ok()?;
    if secs <= 0 {
        return Some(None);
    }
    Duration::try_seconds(secs).map(Some)
}
