//! Simulation controller.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use fundme_common::{Address, Usd, Wei};
use fundme_devnet::{ChainConfig, ChainError, DevChain, Receipt};

use crate::metrics::SimulationMetrics;
use crate::scenario::{Expectation, Scenario, ScenarioStep};

/// Smallest random contribution: 0.001 ETH.
const RANDOM_MIN_WEI: u128 = 1_000_000_000_000_000;

/// Largest random contribution: 2 ETH.
const RANDOM_MAX_WEI: u128 = 2_000_000_000_000_000_000;

/// Drives scenarios against a shared development chain.
pub struct SimulationController {
    /// Chain shared with funder tasks.
    chain: Arc<Mutex<DevChain>>,
    /// Random number generator.
    rng: StdRng,
    /// Simulation metrics.
    metrics: Arc<RwLock<SimulationMetrics>>,
    /// Error code of the previous transaction, if it failed.
    last_error: Option<String>,
}

impl SimulationController {
    /// Deploy a fresh chain.
    pub fn new(config: ChainConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            chain: Arc::new(Mutex::new(DevChain::with_config(config))),
            rng,
            metrics: Arc::new(RwLock::new(SimulationMetrics::new())),
            last_error: None,
        }
    }

    /// Run a scripted scenario.
    pub async fn run_scenario(&mut self, scenario: Scenario) -> anyhow::Result<()> {
        info!("Running scenario: {} - {}", scenario.name, scenario.description);

        let available = self.chain.lock().await.accounts().len();
        let required = scenario.required_accounts();
        if available < required {
            anyhow::bail!(
                "Scenario {} needs {} accounts, chain has {}",
                scenario.name,
                required,
                available
            );
        }

        for step in &scenario.steps {
            self.execute_step(step).await?;
        }

        Ok(())
    }

    /// Every non-deployer account funds `rounds` random amounts concurrently,
    /// then the deployer withdraws.
    pub async fn run_random(&mut self, rounds: usize) -> anyhow::Result<()> {
        let (funders, deployer) = {
            let chain = self.chain.lock().await;
            let funders: Vec<Address> = chain.accounts().iter().skip(1).map(|a| a.address).collect();
            (funders, chain.accounts().deployer().address)
        };
        info!(funders = funders.len(), rounds, "Running random funders");

        let mut handles = Vec::with_capacity(funders.len());
        for funder in funders {
            let amounts: Vec<Wei> = (0..rounds)
                .map(|_| Wei::new(self.rng.gen_range(RANDOM_MIN_WEI..=RANDOM_MAX_WEI)))
                .collect();
            let chain = self.chain.clone();
            let metrics = self.metrics.clone();

            handles.push(tokio::spawn(async move {
                for amount in amounts {
                    let result = chain.lock().await.fund(&funder, amount);
                    match result {
                        Ok(_) => metrics.write().await.record_accepted(amount),
                        Err(e) => metrics.write().await.record_rejected(e.error_code()),
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }

        for handle in handles {
            handle.await?;
        }

        let held = {
            let chain = self.chain.lock().await;
            chain.balance_of(&chain.deployment().fund_me)
        };
        self.withdraw(&deployer).await;

        let metrics = self.metrics.read().await.clone();
        let contract = {
            let chain = self.chain.lock().await;
            chain.balance_of(&chain.deployment().fund_me)
        };
        let held_matches = held.value() == metrics.total_accepted;
        let drained = contract.is_zero() && metrics.total_withdrawn == metrics.total_accepted;
        if !held_matches || !drained {
            warn!(
                held = %held,
                accepted = metrics.total_accepted,
                withdrawn = metrics.total_withdrawn,
                "Ledger balance does not match accepted contributions"
            );
        }
        self.metrics
            .write()
            .await
            .record_expectation(held_matches && drained);

        Ok(())
    }

    /// Execute a single scenario step.
    async fn execute_step(&mut self, step: &ScenarioStep) -> anyhow::Result<()> {
        match step {
            ScenarioStep::Fund { account, ether } => {
                let from = self.account(*account).await?;
                let value = Wei::parse_ether(ether)?;
                info!("Account {} funds {}", account, value);
                let result = self.chain.lock().await.fund(&from, value);
                self.record_contribution(value, result).await;
            }
            ScenarioStep::Send { account, ether } => {
                let from = self.account(*account).await?;
                let value = Wei::parse_ether(ether)?;
                info!("Account {} sends {}", account, value);
                let result = self.chain.lock().await.send(&from, value);
                self.record_contribution(value, result).await;
            }
            ScenarioStep::SetPrice { usd } => {
                let price = Usd::parse(usd)?;
                self.chain.lock().await.set_eth_usd(price)?;
            }
            ScenarioStep::AdvanceTime { seconds } => {
                info!("Advancing block time by {}s", seconds);
                self.chain.lock().await.advance_time(*seconds)?;
            }
            ScenarioStep::Withdraw { account } => {
                let from = self.account(*account).await?;
                info!("Account {} withdraws", account);
                self.withdraw(&from).await;
            }
            ScenarioStep::Expect { condition } => {
                let held = self.check(condition).await?;
                if held {
                    info!("Expectation held: {:?}", condition);
                } else {
                    warn!("Expectation failed: {:?}", condition);
                }
                self.metrics.write().await.record_expectation(held);
            }
        }

        Ok(())
    }

    async fn withdraw(&mut self, from: &Address) {
        let result = self.chain.lock().await.withdraw(from);
        match result {
            Ok(receipt) => {
                let amount = receipt.withdrawn.unwrap_or(Wei::ZERO);
                self.metrics.write().await.record_withdrawal(amount);
                self.last_error = None;
            }
            Err(e) => self.record_failure(&e).await,
        }
    }

    async fn record_contribution(&mut self, value: Wei, result: Result<Receipt, ChainError>) {
        match result {
            Ok(_) => {
                self.metrics.write().await.record_accepted(value);
                self.last_error = None;
            }
            Err(e) => self.record_failure(&e).await,
        }
    }

    async fn record_failure(&mut self, error: &ChainError) {
        info!(code = error.error_code(), "Transaction rejected: {}", error);
        self.metrics.write().await.record_rejected(error.error_code());
        self.last_error = Some(error.error_code().to_string());
    }

    async fn check(&self, condition: &Expectation) -> anyhow::Result<bool> {
        let chain = self.chain.lock().await;
        let fund_me = chain.fund_me();

        let held = match condition {
            Expectation::ContractBalance { ether } => {
                chain.balance_of(&chain.deployment().fund_me) == Wei::parse_ether(ether)?
            }
            Expectation::AmountFunded { account, ether } => {
                let funder = chain
                    .accounts()
                    .get(*account)
                    .ok_or_else(|| anyhow::anyhow!("Unknown account index {}", account))?;
                fund_me.address_to_amount_funded(&funder.address) == Wei::parse_ether(ether)?
            }
            Expectation::FunderCount { count } => fund_me.funders_len() == *count,
            Expectation::Rejected { code } => self.last_error.as_deref() == Some(code.as_str()),
            Expectation::Accepted => self.last_error.is_none(),
        };

        Ok(held)
    }

    async fn account(&self, index: usize) -> anyhow::Result<Address> {
        self.chain
            .lock()
            .await
            .accounts()
            .get(index)
            .map(|a| a.address)
            .ok_or_else(|| anyhow::anyhow!("Unknown account index {}", index))
    }

    /// Get simulation metrics.
    pub async fn metrics(&self) -> SimulationMetrics {
        self.metrics.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::SCENARIOS;

    fn controller(seed: u64) -> SimulationController {
        SimulationController::new(ChainConfig::default(), Some(seed))
    }

    #[tokio::test]
    async fn test_scripted_scenarios_hold() {
        for name in SCENARIOS.iter().filter(|n| **n != "random") {
            let mut controller = controller(7);
            controller
                .run_scenario(Scenario::load(name).unwrap())
                .await
                .unwrap();

            let metrics = controller.metrics().await;
            assert_eq!(metrics.expectations_failed, 0, "scenario {}", name);
            assert!(metrics.expectations_passed > 0);
        }
    }

    #[tokio::test]
    async fn test_below_minimum_counts_rejections() {
        let mut controller = controller(1);
        controller
            .run_scenario(Scenario::load("below-minimum").unwrap())
            .await
            .unwrap();

        let metrics = controller.metrics().await;
        assert_eq!(metrics.rejected["INSUFFICIENT_CONTRIBUTION"], 3);
        assert_eq!(metrics.accepted, 1);
    }

    #[tokio::test]
    async fn test_failed_expectation_is_reported() {
        let mut controller = controller(1);
        let scenario = Scenario {
            name: "wrong".to_string(),
            description: "Expects a balance that is not there".to_string(),
            steps: vec![ScenarioStep::Expect {
                condition: Expectation::ContractBalance {
                    ether: "1".to_string(),
                },
            }],
        };

        controller.run_scenario(scenario).await.unwrap();
        assert_eq!(controller.metrics().await.expectations_failed, 1);
    }

    #[tokio::test]
    async fn test_scenario_needs_enough_accounts() {
        let config = ChainConfig {
            accounts: 2,
            ..ChainConfig::default()
        };
        let mut controller = SimulationController::new(config, Some(1));

        let result = controller
            .run_scenario(Scenario::load("multiple-funders").unwrap())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_random_funders_drain_to_owner() {
        let mut controller = controller(42);
        controller.run_random(4).await.unwrap();

        let metrics = controller.metrics().await;
        assert_eq!(metrics.accepted + metrics.total_rejected(), 9 * 4);
        assert_eq!(metrics.withdrawals, 1);
        assert_eq!(metrics.total_withdrawn, metrics.total_accepted);
        assert_eq!(metrics.expectations_failed, 0);
    }

    #[tokio::test]
    async fn test_random_is_reproducible() {
        let mut a = controller(99);
        let mut b = controller(99);
        a.run_random(3).await.unwrap();
        b.run_random(3).await.unwrap();

        assert_eq!(a.metrics().await.total_accepted, b.metrics().await.total_accepted);
    }
}
