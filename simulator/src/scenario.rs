//! Simulation scenarios.

use serde::{Deserialize, Serialize};

/// Name of the scenario driven by random concurrent funders.
pub const RANDOM_SCENARIO: &str = "random";

/// Every scenario the simulator knows.
pub const SCENARIOS: &[&str] = &[
    "single-funder",
    "multiple-funders",
    "below-minimum",
    "non-owner-withdraw",
    "stale-price",
    RANDOM_SCENARIO,
];

/// A scripted simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario. Accounts are referred to by index; account 0
/// deployed the ledger and owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Call `fund` with an ether amount.
    Fund { account: usize, ether: String },
    /// Send plain value to the ledger.
    Send { account: usize, ether: String },
    /// Publish a new ETH/USD price in dollars.
    SetPrice { usd: String },
    /// Move the block clock forward.
    AdvanceTime { seconds: i64 },
    /// Call `withdraw`.
    Withdraw { account: usize },
    /// Check chain or ledger state.
    Expect { condition: Expectation },
}

/// Conditions an `Expect` step can check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expectation {
    /// Ledger holds exactly this much ether.
    ContractBalance { ether: String },
    /// Account's recorded contribution total.
    AmountFunded { account: usize, ether: String },
    /// Length of the contributor list.
    FunderCount { count: usize },
    /// Previous transaction failed with this error code.
    Rejected { code: String },
    /// Previous transaction succeeded.
    Accepted,
}

impl Scenario {
    /// Load a scripted scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "single-funder" => Ok(Self::single_funder()),
            "multiple-funders" => Ok(Self::multiple_funders()),
            "below-minimum" => Ok(Self::below_minimum()),
            "non-owner-withdraw" => Ok(Self::non_owner_withdraw()),
            "stale-price" => Ok(Self::stale_price()),
            _ => Err(anyhow::anyhow!(
                "Unknown scenario: {} (available: {})",
                name,
                SCENARIOS.join(", ")
            )),
        }
    }

    /// Number of accounts the scenario refers to.
    pub fn required_accounts(&self) -> usize {
        self.steps
            .iter()
            .filter_map(|step| match step {
                ScenarioStep::Fund { account, .. }
                | ScenarioStep::Send { account, .. }
                | ScenarioStep::Withdraw { account } => Some(*account),
                ScenarioStep::Expect {
                    condition: Expectation::AmountFunded { account, .. },
                } => Some(*account),
                _ => None,
            })
            .max()
            .map_or(1, |max| max + 1)
    }

    fn single_funder() -> Self {
        Self {
            name: "single-funder".to_string(),
            description: "One contribution, then the owner withdraws".to_string(),
            steps: vec![
                fund(1, "1"),
                expect(Expectation::Accepted),
                expect(Expectation::AmountFunded {
                    account: 1,
                    ether: "1".to_string(),
                }),
                expect(Expectation::FunderCount { count: 1 }),
                expect(contract_balance("1")),
                ScenarioStep::Withdraw { account: 0 },
                expect(Expectation::Accepted),
                expect(contract_balance("0")),
                expect(Expectation::FunderCount { count: 0 }),
            ],
        }
    }

    fn multiple_funders() -> Self {
        let mut steps: Vec<ScenarioStep> = (1..=5).map(|account| fund(account, "1")).collect();
        steps.push(expect(Expectation::FunderCount { count: 5 }));
        steps.push(expect(contract_balance("5")));
        steps.push(ScenarioStep::Withdraw { account: 0 });
        steps.push(expect(Expectation::Accepted));
        steps.push(expect(contract_balance("0")));
        steps.push(expect(Expectation::FunderCount { count: 0 }));
        steps.extend((1..=5).map(|account| {
            expect(Expectation::AmountFunded {
                account,
                ether: "0".to_string(),
            })
        }));

        Self {
            name: "multiple-funders".to_string(),
            description: "Five contributors, one withdrawal resets every record".to_string(),
            steps,
        }
    }

    fn below_minimum() -> Self {
        Self {
            name: "below-minimum".to_string(),
            description: "Contributions under $50 are rejected at any price".to_string(),
            steps: vec![
                // $20 at $2000/ETH
                fund(1, "0.01"),
                expect(rejected("INSUFFICIENT_CONTRIBUTION")),
                ScenarioStep::Send {
                    account: 2,
                    ether: "0.01".to_string(),
                },
                expect(rejected("INSUFFICIENT_CONTRIBUTION")),
                ScenarioStep::SetPrice {
                    usd: "10".to_string(),
                },
                fund(1, "1"),
                expect(rejected("INSUFFICIENT_CONTRIBUTION")),
                expect(Expectation::FunderCount { count: 0 }),
                expect(contract_balance("0")),
                ScenarioStep::SetPrice {
                    usd: "2000".to_string(),
                },
                fund(1, "0.025"),
                expect(Expectation::Accepted),
                expect(Expectation::FunderCount { count: 1 }),
            ],
        }
    }

    fn non_owner_withdraw() -> Self {
        Self {
            name: "non-owner-withdraw".to_string(),
            description: "Only the deployer can withdraw".to_string(),
            steps: vec![
                fund(1, "1"),
                ScenarioStep::Withdraw { account: 1 },
                expect(rejected("UNAUTHORIZED")),
                expect(contract_balance("1")),
                expect(Expectation::FunderCount { count: 1 }),
                ScenarioStep::Withdraw { account: 0 },
                expect(Expectation::Accepted),
                expect(contract_balance("0")),
            ],
        }
    }

    fn stale_price() -> Self {
        Self {
            name: "stale-price".to_string(),
            description: "An outdated price round blocks contributions until refreshed"
                .to_string(),
            steps: vec![
                ScenarioStep::AdvanceTime { seconds: 7200 },
                fund(1, "1"),
                expect(rejected("ORACLE_STALE_ROUND")),
                ScenarioStep::SetPrice {
                    usd: "2500".to_string(),
                },
                fund(1, "1"),
                expect(Expectation::Accepted),
                expect(contract_balance("1")),
            ],
        }
    }
}

fn fund(account: usize, ether: &str) -> ScenarioStep {
    ScenarioStep::Fund {
        account,
        ether: ether.to_string(),
    }
}

fn expect(condition: Expectation) -> ScenarioStep {
    ScenarioStep::Expect { condition }
}

fn contract_balance(ether: &str) -> Expectation {
    Expectation::ContractBalance {
        ether: ether.to_string(),
    }
}

fn rejected(code: &str) -> Expectation {
    Expectation::Rejected {
        code: code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_known_scenarios() {
        for name in SCENARIOS.iter().filter(|n| **n != RANDOM_SCENARIO) {
            let scenario = Scenario::load(name).unwrap();
            assert_eq!(scenario.name, *name);
            assert!(!scenario.steps.is_empty());
        }
    }

    #[test]
    fn test_unknown_scenario() {
        assert!(Scenario::load("high-volume").is_err());
    }

    #[test]
    fn test_required_accounts() {
        assert_eq!(Scenario::load("single-funder").unwrap().required_accounts(), 2);
        assert_eq!(Scenario::load("multiple-funders").unwrap().required_accounts(), 6);
        assert_eq!(Scenario::load("below-minimum").unwrap().required_accounts(), 3);
    }

    #[test]
    fn test_scenario_serializes() {
        let scenario = Scenario::load("non-owner-withdraw").unwrap();
        let json = serde_json::to_value(&scenario).unwrap();
        assert_eq!(json["steps"][1]["Withdraw"]["account"], 1);
    }
}
