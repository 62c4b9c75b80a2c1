//! FundMe Simulator
//!
//! Runs contribution and withdrawal scenarios against a local development
//! chain and reports what the ledger accepted and rejected.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod controller;
mod metrics;
mod scenario;

use config::SimulatorConfig;
use controller::SimulationController;
use fundme_common::Usd;
use scenario::{Scenario, RANDOM_SCENARIO};

/// FundMe Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "FundMe development chain scenario runner")]
struct Args {
    /// Number of development accounts, deployer included
    #[arg(short, long)]
    accounts: Option<usize>,

    /// Scenario to run
    #[arg(short, long)]
    scenario: Option<String>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Initial ETH/USD price in dollars
    #[arg(long)]
    eth_usd: Option<String>,

    /// Contributions per funder in the random scenario
    #[arg(long)]
    rounds: Option<usize>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn apply(&self, config: &mut SimulatorConfig) -> anyhow::Result<()> {
        if let Some(accounts) = self.accounts {
            config.chain.accounts = accounts;
        }
        if let Some(scenario) = &self.scenario {
            config.scenario = scenario.clone();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(price) = &self.eth_usd {
            config.chain.set_eth_usd(Usd::parse(price)?);
        }
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        config.json_logs |= self.json_logs;
        Ok(())
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = SimulatorConfig::from_env();
    args.apply(&mut config)?;
    init_tracing(config.json_logs);

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    info!("Starting FundMe Simulator");
    info!("Accounts: {}", config.chain.accounts);
    info!("Scenario: {}", config.scenario);

    let mut controller = SimulationController::new(config.chain.clone(), config.seed);

    if config.scenario == RANDOM_SCENARIO {
        controller.run_random(config.rounds).await?;
    } else {
        let scenario = Scenario::load(&config.scenario)?;
        controller.run_scenario(scenario).await?;
    }

    let metrics = controller.metrics().await;
    info!("Simulation complete");
    info!("Accepted: {}", metrics.accepted);
    info!("Rejected: {} {:?}", metrics.total_rejected(), metrics.rejected);
    info!("Withdrawals: {}", metrics.withdrawals);
    info!("Total withdrawn: {} wei", metrics.total_withdrawn);
    info!("Acceptance rate: {:.2}", metrics.acceptance_rate());
    if config.json_logs {
        info!(summary = %serde_json::to_string(&metrics)?, "Metrics");
    }

    if metrics.expectations_failed > 0 {
        error!(
            failed = metrics.expectations_failed,
            passed = metrics.expectations_passed,
            "Expectations failed"
        );
        anyhow::bail!("{} expectation(s) failed", metrics.expectations_failed);
    }

    Ok(())
}
