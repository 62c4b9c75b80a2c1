//! Simulation metrics.

use std::collections::BTreeMap;

use fundme_common::Wei;
use serde::Serialize;

/// Simulation metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationMetrics {
    /// Contributions the ledger accepted.
    pub accepted: u64,
    /// Sum of accepted contributions in wei.
    pub total_accepted: u128,
    /// Rejected transactions by error code.
    pub rejected: BTreeMap<String, u64>,
    /// Successful withdrawals.
    pub withdrawals: u64,
    /// Sum of withdrawn value in wei.
    pub total_withdrawn: u128,
    /// `Expect` steps that held.
    pub expectations_passed: u64,
    /// `Expect` steps that did not hold.
    pub expectations_failed: u64,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted contribution.
    pub fn record_accepted(&mut self, amount: Wei) {
        self.accepted += 1;
        self.total_accepted += amount.value();
    }

    /// Record a rejected transaction.
    pub fn record_rejected(&mut self, code: &str) {
        *self.rejected.entry(code.to_string()).or_insert(0) += 1;
    }

    /// Record a completed withdrawal.
    pub fn record_withdrawal(&mut self, amount: Wei) {
        self.withdrawals += 1;
        self.total_withdrawn += amount.value();
    }

    /// Record the result of an `Expect` step.
    pub fn record_expectation(&mut self, held: bool) {
        if held {
            self.expectations_passed += 1;
        } else {
            self.expectations_failed += 1;
        }
    }

    /// Total rejected transactions.
    pub fn total_rejected(&self) -> u64 {
        self.rejected.values().sum()
    }

    /// Share of contribution attempts that were accepted.
    pub fn acceptance_rate(&self) -> f64 {
        let attempts = self.accepted + self.total_rejected();
        if attempts == 0 {
            return 0.0;
        }

        self.accepted as f64 / attempts as f64
    }
}
