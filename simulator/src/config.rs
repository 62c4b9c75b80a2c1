//! Simulator configuration.

use fundme_devnet::ChainConfig;

/// Scenario run when none is given.
pub const DEFAULT_SCENARIO: &str = "single-funder";

/// Simulator configuration.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Development chain and ledger settings.
    pub chain: ChainConfig,
    /// Scenario name.
    pub scenario: String,
    /// Seed for random amounts. `None` draws from entropy.
    pub seed: Option<u64>,
    /// Contributions each funder attempts in the random scenario.
    pub rounds: usize,
    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            scenario: DEFAULT_SCENARIO.to_string(),
            seed: None,
            rounds: 3,
            json_logs: false,
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            chain: ChainConfig::from_env(),
            ..Self::default()
        };

        if let Ok(scenario) = std::env::var("SIMULATOR_SCENARIO") {
            config.scenario = scenario;
        }

        if let Ok(seed) = std::env::var("SIMULATOR_SEED") {
            config.seed = seed.parse().ok();
        }

        if let Ok(rounds) = std::env::var("SIMULATOR_ROUNDS") {
            if let Ok(rounds) = rounds.parse() {
                config.rounds = rounds;
            }
        }

        if let Ok(json) = std::env::var("SIMULATOR_JSON_LOGS") {
            config.json_logs = matches!(json.as_str(), "1" | "true" | "yes");
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.scenario.is_empty() {
            return Err("Scenario name cannot be empty".to_string());
        }

        if self.rounds == 0 {
            return Err("Rounds must be at least 1".to_string());
        }

        self.chain.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scenario, "single-funder");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = SimulatorConfig::default();
        config.rounds = 0;
        assert!(config.validate().is_err());

        let mut config = SimulatorConfig::default();
        config.chain.accounts = 0;
        assert!(config.validate().is_err());
    }
}
