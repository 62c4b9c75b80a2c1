//! Development chain configuration.

use fundme_common::{Usd, Wei, DECIMALS};
use fundme_ledger::FundMeConfig;
use fundme_oracle::mock::{DEFAULT_DECIMALS, DEFAULT_INITIAL_ANSWER};

use crate::accounts::{DEFAULT_INITIAL_BALANCE, DEFAULT_SEED};

/// Convert a USD price into a feed answer with `decimals` places.
/// Digits beyond the feed's precision are truncated.
pub fn answer_from_usd(price: Usd, decimals: u8) -> Option<i128> {
    let decimals = u32::from(decimals);
    let answer = if decimals <= DECIMALS {
        price.value() / 10u128.pow(DECIMALS - decimals)
    } else {
        price.value().checked_mul(10u128.checked_pow(decimals - DECIMALS)?)?
    };
    i128::try_from(answer).ok()
}

/// Chain and fixture configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// Number of development accounts, deployer included.
    pub accounts: usize,
    /// Seed for account derivation.
    pub seed: String,
    /// Starting native balance of each account.
    pub initial_balance: Wei,
    /// Decimals of the mock ETH/USD feed.
    pub feed_decimals: u8,
    /// First answer published by the mock feed.
    pub initial_answer: i128,
    /// Ledger configuration for the deployed FundMe.
    pub ledger: FundMeConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            accounts: 10,
            seed: DEFAULT_SEED.to_string(),
            initial_balance: DEFAULT_INITIAL_BALANCE,
            feed_decimals: DEFAULT_DECIMALS,
            initial_answer: DEFAULT_INITIAL_ANSWER,
            ledger: FundMeConfig::default(),
        }
    }
}

impl ChainConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            ledger: FundMeConfig::from_env(),
            ..Self::default()
        };

        if let Ok(count) = std::env::var("FUNDME_ACCOUNTS") {
            if let Ok(count) = count.parse() {
                config.accounts = count;
            }
        }

        if let Ok(seed) = std::env::var("FUNDME_SEED") {
            config.seed = seed;
        }

        if let Ok(balance) = std::env::var("FUNDME_INITIAL_BALANCE_ETH") {
            if let Ok(balance) = Wei::parse_ether(&balance) {
                config.initial_balance = balance;
            }
        }

        if let Ok(price) = std::env::var("FUNDME_ETH_USD") {
            if let Ok(price) = Usd::parse(&price) {
                config.set_eth_usd(price);
            }
        }

        config
    }

    /// Set the mock feed's first answer from a USD price.
    pub fn set_eth_usd(&mut self, price: Usd) {
        if let Some(answer) = answer_from_usd(price, self.feed_decimals) {
            self.initial_answer = answer;
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.accounts == 0 {
            return Err("At least one account is required".to_string());
        }

        if self.seed.is_empty() {
            return Err("Account seed cannot be empty".to_string());
        }

        if self.initial_answer <= 0 {
            return Err("Initial ETH/USD answer must be positive".to_string());
        }

        self.ledger.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.feed_decimals, 8);
        assert_eq!(config.initial_answer, 200_000_000_000);
    }

    #[test]
    fn test_answer_from_usd() {
        assert_eq!(
            answer_from_usd(Usd::from_dollars(2000), 8),
            Some(200_000_000_000)
        );
        assert_eq!(answer_from_usd(Usd::parse("10.5").unwrap(), 2), Some(1050));
        assert_eq!(
            answer_from_usd(Usd::from_dollars(1), 18),
            Some(1_000_000_000_000_000_000)
        );
    }

    #[test]
    fn test_set_eth_usd() {
        let mut config = ChainConfig::default();
        config.set_eth_usd(Usd::from_dollars(10));
        assert_eq!(config.initial_answer, 1_000_000_000);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = ChainConfig::default();
        config.accounts = 0;
        assert!(config.validate().is_err());

        let mut config = ChainConfig::default();
        config.initial_answer = 0;
        assert!(config.validate().is_err());
    }
}
